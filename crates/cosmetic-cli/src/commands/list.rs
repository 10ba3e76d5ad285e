use anyhow::Result;
use cosmetic_core::ConfigDocument;
use std::io::Write;

use super::Session;

pub fn handle(session: &Session<'_>, out: &mut impl Write) -> Result<()> {
    let doc = session.store.load();
    print_filters(&doc, out)?;
    Ok(())
}

/// Hosts in order, each followed by its 1-based rule list
fn print_filters(doc: &ConfigDocument, out: &mut impl Write) -> std::io::Result<()> {
    if doc.is_empty() {
        writeln!(out, "No cosmetic filters saved")?;
        return Ok(());
    }

    for (host, rules) in doc.list_filters() {
        writeln!(out, "{}", host)?;
        for (idx, rule) in rules.iter().enumerate() {
            writeln!(out, "  [{}] {}", idx + 1, rule)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{FakeBrowser, TestEnv};
    use cosmetic_core::RuleCandidate;

    fn render(doc: &ConfigDocument) -> String {
        let mut out = Vec::new();
        print_filters(doc, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_store() {
        assert_eq!(render(&ConfigDocument::default()), "No cosmetic filters saved\n");
    }

    #[test]
    fn test_listing_format() {
        let mut doc = ConfigDocument::default();
        doc.append_rule("zeta.net", &RuleCandidate::new("#z"));
        doc.append_rule("example.com", &RuleCandidate::new(".ad-banner"));
        doc.append_rule("example.com", &RuleCandidate::new("li").with_text("Promoted"));

        assert_eq!(
            render(&doc),
            "example.com\n  [1] .ad-banner\n  [2] li (text contains 'Promoted')\nzeta.net\n  [1] #z\n"
        );
    }

    #[test]
    fn test_list_never_persists_or_calls_browser() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new();
        let mut out = Vec::new();

        handle(&env.session(&browser), &mut out).unwrap();

        assert!(browser.calls().is_empty());
        assert!(!env.store.path().exists());
    }
}

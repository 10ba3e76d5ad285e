use anyhow::{Context, Result};
use cosmetic_browser::{spawn_detached, Script};
use cosmetic_core::{AppendOutcome, RuleCandidate};
use serde_json::Value;
use std::ffi::OsString;
use std::path::Path;
use tracing::{error, info, warn};

use super::Session;

pub async fn handle(session: &Session<'_>, host_override: Option<String>) -> Result<()> {
    let mut doc = session.store.load();

    let Some(host) = resolve_host(session, host_override.as_deref()).await else {
        return Ok(());
    };

    info!("Launching picker UI...");
    let Some(candidate) = run_picker(session).await else {
        info!("Picker cancelled");
        return Ok(());
    };

    match doc.append_rule(&host, &candidate) {
        AppendOutcome::Appended(_) => {}
        AppendOutcome::Duplicate => {
            info!("An identical filter already exists; nothing to do");
            return Ok(());
        }
        AppendOutcome::EmptySelector => {
            warn!("Picker did not provide a selector; aborting");
            return Ok(());
        }
        AppendOutcome::EmptyHost => {
            warn!("No host to attach the filter to; aborting");
            return Ok(());
        }
    }

    let rule = doc
        .rules_for(&host)
        .and_then(|rules| rules.last())
        .context("appended rule missing")?;
    info!("Selected rule for {}: {}", host, rule);

    if !session.register_host(&doc, &host).await {
        warn!("Filter for {} was not saved", host);
        return Ok(());
    }

    session.store.save(&doc)?;
    info!("Saved filter for {}: {}", host, rule.selector);
    session
        .notify(&format!("Cosmetic filter saved for {}", host))
        .await;

    info!("Reloading active tab to apply filter...");
    session.reload_active_tab().await;
    Ok(())
}

/// Re-run `add` as a detached child and return at once.
pub fn detach(host: Option<&str>, quiet: bool, config_dir: Option<&Path>) -> Result<()> {
    let exe = std::env::current_exe().context("Unable to locate the running executable")?;
    let args = detached_args(host, quiet, config_dir);
    if let Err(e) = spawn_detached(&exe, &args) {
        error!("Failed to start background picker: {}", e);
    }
    Ok(())
}

fn detached_args(host: Option<&str>, quiet: bool, config_dir: Option<&Path>) -> Vec<OsString> {
    let mut args = Vec::new();
    if quiet {
        args.push(OsString::from("--quiet"));
    }
    if let Some(dir) = config_dir {
        args.push(OsString::from("--config-dir"));
        args.push(dir.as_os_str().to_owned());
    }
    args.push(OsString::from("add"));
    if let Some(host) = host {
        args.push(OsString::from("--host"));
        args.push(OsString::from(host));
    }
    args
}

async fn resolve_host(session: &Session<'_>, host_override: Option<&str>) -> Option<String> {
    if let Some(host) = host_override {
        let host = host.trim();
        if host.is_empty() {
            warn!("Host override is empty");
            return None;
        }
        info!("Using host override: {}", host);
        return Some(host.to_string());
    }

    info!("Detecting active tab...");
    let Some(tab) = session.active_tab().await else {
        warn!("Unable to detect active tab - is the browser running?");
        return None;
    };
    let Some(host) = tab.host() else {
        warn!("Active tab URL is not filterable: {:?}", tab.url);
        return None;
    };
    info!("Active tab host: {}", host);
    Some(host)
}

async fn run_picker(session: &Session<'_>) -> Option<RuleCandidate> {
    let script = match session.load_picker() {
        Ok(script) => script,
        Err(e) => {
            error!("{:#}", e);
            return None;
        }
    };

    let stdout = match session.browser.eval(Script::Stdin(&script)).await {
        Ok(stdout) => stdout,
        Err(e) => {
            error!("Picker failed: {}", e);
            return None;
        }
    };

    match decode_selection(&stdout) {
        Ok(selection) => selection,
        Err(e) => {
            error!("{:#}", e);
            None
        }
    }
}

/// Read `{selector, hasText}` out of the picker's output.
///
/// Empty output or `null` means the user cancelled. The control binary
/// JSON-encodes eval results, so a string holding an object is decoded once
/// more. Fields other than the two strings are ignored.
fn decode_selection(stdout: &str) -> Result<Option<RuleCandidate>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }

    let mut value: Value =
        serde_json::from_str(trimmed).context("Picker returned invalid JSON")?;
    if let Value::String(inner) = &value {
        let inner = inner.trim();
        if inner.is_empty() || inner == "null" {
            return Ok(None);
        }
        value = serde_json::from_str(inner).context("Picker returned invalid JSON")?;
    }

    match value {
        Value::Null => Ok(None),
        Value::Object(fields) => {
            let selector = fields
                .get("selector")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let mut candidate = RuleCandidate::new(selector);
            if let Some(text) = fields.get("hasText").and_then(Value::as_str) {
                candidate = candidate.with_text(text);
            }
            Ok(Some(candidate))
        }
        other => anyhow::bail!("Picker returned unexpected payload: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{Call, FakeBrowser, TestEnv};

    #[test]
    fn test_decode_selection() {
        assert_eq!(decode_selection("").unwrap(), None);
        assert_eq!(decode_selection("null\n").unwrap(), None);
        assert_eq!(decode_selection("\"null\"").unwrap(), None);

        let plain = decode_selection(r#"{"selector": ".ad-banner"}"#).unwrap();
        assert_eq!(plain, Some(RuleCandidate::new(".ad-banner")));

        let nested =
            decode_selection(r#""{\"selector\":\"li\",\"hasText\":\"Ad\",\"extra\":3}""#).unwrap();
        assert_eq!(nested, Some(RuleCandidate::new("li").with_text("Ad")));

        let odd_text = decode_selection(r#"{"selector": "li", "hasText": 5}"#).unwrap();
        assert_eq!(odd_text, Some(RuleCandidate::new("li")));

        assert!(decode_selection("{oops").is_err());
        assert!(decode_selection("[1, 2]").is_err());
    }

    #[test]
    fn test_detached_args() {
        let args = detached_args(Some("example.com"), true, Some(Path::new("/cfg")));
        assert_eq!(
            args,
            vec!["--quiet", "--config-dir", "/cfg", "add", "--host", "example.com"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(detached_args(None, false, None), vec![OsString::from("add")]);
    }

    #[tokio::test]
    async fn test_add_with_host_override() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new().with_picker(r#"{"selector": ".ad-banner"}"#);

        handle(&env.session(&browser), Some("example.com".to_string()))
            .await
            .unwrap();

        let doc = env.store.load();
        let rules = doc.rules_for("example.com").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".ad-banner");
        assert_eq!(rules[0].has_text, None);
        assert!(rules[0].created_at.parse::<i64>().is_ok());

        let calls = browser.calls();
        assert!(!calls.contains(&Call::ListTabs));
        assert_eq!(calls[0], Call::EvalStdin("/* picker */".to_string()));
        assert!(matches!(&calls[1], Call::Register { id, .. } if id == "cosmetic-filter-example.com"));
        assert_eq!(
            calls[2],
            Call::Message("Cosmetic filter saved for example.com".to_string())
        );
        assert_eq!(
            calls[3],
            Call::EvalInline("window.location.reload()".to_string())
        );
    }

    #[tokio::test]
    async fn test_add_uses_active_tab_host() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new()
            .with_active_tab("https://news.example.org/story")
            .with_picker(r#"{"selector": "aside", "hasText": " Sponsored "}"#);

        handle(&env.session(&browser), None).await.unwrap();

        let doc = env.store.load();
        let rules = doc.rules_for("news.example.org").unwrap();
        assert_eq!(rules[0].has_text.as_deref(), Some("Sponsored"));
    }

    #[tokio::test]
    async fn test_add_without_browser_does_nothing() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new();

        handle(&env.session(&browser), None).await.unwrap();

        assert_eq!(browser.calls(), vec![Call::ListTabs]);
        assert!(!env.store.path().exists());
    }

    #[tokio::test]
    async fn test_add_unfilterable_tab() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new()
            .with_active_tab("about:blank")
            .with_picker(r#"{"selector": ".x"}"#);

        handle(&env.session(&browser), None).await.unwrap();

        assert_eq!(browser.calls(), vec![Call::ListTabs]);
        assert!(!env.store.path().exists());
    }

    #[tokio::test]
    async fn test_cancelled_picker_persists_nothing() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new().with_picker("null\n");

        handle(&env.session(&browser), Some("example.com".to_string()))
            .await
            .unwrap();

        assert!(browser.registrations().is_empty());
        assert!(!env.store.path().exists());
    }

    #[tokio::test]
    async fn test_duplicate_is_a_no_op() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new().with_picker(r#"{"selector": ".ad"}"#);
        let session = env.session(&browser);

        handle(&session, Some("example.com".to_string())).await.unwrap();
        let saved = std::fs::read(env.store.path()).unwrap();

        handle(&session, Some("example.com".to_string())).await.unwrap();
        assert_eq!(std::fs::read(env.store.path()).unwrap(), saved);
        assert_eq!(browser.registrations().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_registration_is_not_persisted() {
        let env = TestEnv::new();
        let browser = FakeBrowser::new()
            .with_picker(r#"{"selector": ".ad"}"#)
            .rejecting_scripts();

        handle(&env.session(&browser), Some("example.com".to_string()))
            .await
            .unwrap();

        assert_eq!(browser.registrations().len(), 1);
        assert!(!env.store.path().exists());
        assert!(!browser
            .calls()
            .contains(&Call::EvalInline("window.location.reload()".to_string())));
    }

    #[tokio::test]
    async fn test_fresh_install_uses_builtin_picker() {
        let env = TestEnv::new();
        std::fs::remove_file(env.dir.path().join(cosmetic_config::PICKER_FILENAME)).unwrap();
        let browser = FakeBrowser::new().with_picker(r#"{"selector": ".ad"}"#);

        handle(&env.session(&browser), Some("example.com".to_string()))
            .await
            .unwrap();

        let calls = browser.calls();
        assert_eq!(
            calls[0],
            Call::EvalStdin(cosmetic_core::BUILTIN_PICKER.to_string())
        );
        let doc = env.store.load();
        assert_eq!(doc.rules_for("example.com").unwrap()[0].selector, ".ad");
    }

    #[tokio::test]
    async fn test_configured_picker_must_exist() {
        let mut env = TestEnv::new();
        env.settings.picker_path = Some(env.dir.path().join("nowhere.js"));
        let browser = FakeBrowser::new().with_picker(r#"{"selector": ".ad"}"#);

        handle(&env.session(&browser), Some("example.com".to_string()))
            .await
            .unwrap();

        assert!(browser.calls().is_empty());
        assert!(!env.store.path().exists());
    }
}

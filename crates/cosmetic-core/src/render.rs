//! Userscript rendering
//!
//! A template is plain text carrying two anchors. Rendering replaces the
//! first occurrence of each: the match anchor with `*://<host>/*` and the
//! config anchor with the host's rules as indented JSON. The output must be
//! byte-identical for identical inputs.

use regex::Regex;
use std::sync::LazyLock;

use crate::{CoreError, Result, Rule};

/// Replaced by the URL match pattern
pub const MATCH_ANCHOR: &str = "__RETHREAD_PICKER_MATCH__";

/// Replaced by the JSON rule list
pub const CONFIG_ANCHOR: &str = "__RETHREAD_PICKER_CONFIG__";

const SCRIPT_ID_PREFIX: &str = "cosmetic-filter-";

const BUILTIN_TEMPLATE: &str = include_str!("../assets/cosmetic-filter.user.js");

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("static regex"));

/// Deterministic userscript id for a host
pub fn script_id(host: &str) -> String {
    format!("{}{}", SCRIPT_ID_PREFIX, SLUG_RE.replace_all(host, "-"))
}

/// URL match pattern covering every page of a host
pub fn match_pattern(host: &str) -> String {
    format!("*://{}/*", host)
}

/// A template whose anchors have been checked
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    text: String,
}

impl ScriptTemplate {
    /// Validate that both anchors are present.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for anchor in [MATCH_ANCHOR, CONFIG_ANCHOR] {
            if !text.contains(anchor) {
                return Err(CoreError::TemplateMalformed { anchor });
            }
        }
        Ok(Self { text })
    }

    /// The template shipped with the binary
    pub fn builtin() -> Self {
        Self {
            text: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Render the script body for `host`.
    pub fn render(&self, host: &str, rules: &[Rule]) -> Result<String> {
        // Through `Value` so extra rule keys land in sorted order too
        let config_blob = serde_json::to_string_pretty(&serde_json::to_value(rules)?)?;
        let body = self.text.replacen(MATCH_ANCHOR, &match_pattern(host), 1);
        Ok(body.replacen(CONFIG_ANCHOR, &config_blob, 1))
    }
}

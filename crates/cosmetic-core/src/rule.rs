//! Cosmetic filter rule model

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// A stored cosmetic filter: hide elements matching `selector`, optionally
/// only those whose text contains `has_text`.
///
/// Fields are declared in key order so the serialized form matches the
/// sorted layout of the on-disk database. Keys this tool does not know are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unix timestamp (seconds) as a string, set once at creation.
    /// Hand-edited entries may omit it or store a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: String,
    #[serde(rename = "hasText", default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,
    pub selector: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Rule {
    pub fn new(selector: String, has_text: Option<String>, created_at: String) -> Self {
        Self {
            created_at,
            has_text,
            selector,
            extra: BTreeMap::new(),
        }
    }

    /// True when this rule has the same `(selector, hasText)` identity.
    pub fn same_target(&self, selector: &str, has_text: Option<&str>) -> bool {
        self.selector == selector && self.has_text.as_deref() == has_text
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(text) = &self.has_text {
            write!(f, " (text contains '{}')", text)?;
        }
        Ok(())
    }
}

/// A rule proposed by the picker or the user, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCandidate {
    pub selector: String,
    pub has_text: Option<String>,
}

impl RuleCandidate {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    /// Trimmed selector and text; blank text collapses to `None`.
    pub(crate) fn normalized(&self) -> (String, Option<String>) {
        let selector = self.selector.trim().to_string();
        let has_text = self
            .has_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        (selector, has_text)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected a timestamp string or number, found {}",
            other
        ))),
    }
}

/// Current time as a Unix-seconds string
pub(crate) fn timestamp_now() -> String {
    OffsetDateTime::now_utc().unix_timestamp().to_string()
}

//! Tab model as reported by `tabs list`

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{BrowserError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

impl Tab {
    /// Hostname of the tab's URL, if it has one
    pub fn host(&self) -> Option<String> {
        host_of(&self.url)
    }
}

#[derive(Debug, Deserialize)]
struct TabsResponse {
    #[serde(default)]
    tabs: Vec<Tab>,
}

/// Hostname portion of a URL; `None` for hostless URLs like `about:blank`
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(String::from)
}

/// Decode `{"tabs": [...]}`
pub(crate) fn parse_tabs(stdout: &str) -> Result<Vec<Tab>> {
    let response: TabsResponse = serde_json::from_str(stdout)
        .map_err(|e| BrowserError::InvalidResponse(format!("tabs list: {}", e)))?;
    Ok(response.tabs)
}

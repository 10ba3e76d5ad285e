pub mod add;
pub mod list;
pub mod preview;
pub mod rm;
pub mod sync;

use anyhow::{Context, Result};
use cosmetic_browser::{BrowserControl, Script, Tab};
use cosmetic_config::Settings;
use cosmetic_core::{match_pattern, script_id, ConfigDocument, ScriptTemplate, BUILTIN_PICKER};
use cosmetic_storage::FilterStore;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Everything a command needs for one invocation
pub struct Session<'a> {
    pub browser: &'a dyn BrowserControl,
    pub settings: &'a Settings,
    pub store: &'a FilterStore,
    pub config_dir: &'a Path,
}

impl Session<'_> {
    /// Configured template file, or the built-in one
    pub fn load_template(&self) -> Result<ScriptTemplate> {
        match &self.settings.template_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).with_context(|| {
                    format!("Unable to read cosmetic filter template {}", path.display())
                })?;
                Ok(ScriptTemplate::parse(text)?)
            }
            None => Ok(ScriptTemplate::builtin()),
        }
    }

    /// Installed or configured picker script, or the built-in one
    pub fn load_picker(&self) -> Result<String> {
        match self.settings.picker_path(self.config_dir) {
            Some(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("Unable to read picker script {}", path.display())),
            None => Ok(BUILTIN_PICKER.to_string()),
        }
    }

    /// Script body for a host's stored rules, `None` if it has none
    pub fn render_host(&self, doc: &ConfigDocument, host: &str) -> Result<Option<String>> {
        let Some(rules) = doc.rules_for(host) else {
            return Ok(None);
        };
        let template = self.load_template()?;
        Ok(Some(template.render(host, rules)?))
    }

    /// Render and register the host's userscript, replacing any previous one.
    ///
    /// Returns false when nothing was registered.
    pub async fn register_host(&self, doc: &ConfigDocument, host: &str) -> bool {
        let body = match self.render_host(doc, host) {
            Ok(Some(body)) => body,
            Ok(None) => return false,
            Err(e) => {
                error!("{:#}", e);
                return false;
            }
        };

        let id = script_id(host);
        info!("Registering userscript {} ({})...", id, match_pattern(host));
        match self.browser.register_script(&id, &body).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to register userscript for {}: {}", host, e);
                false
            }
        }
    }

    /// Best-effort removal of the host's userscript
    pub async fn unregister_host(&self, host: &str) {
        let id = script_id(host);
        info!("Removing userscript {} for {}...", id, host);
        if let Err(e) = self.browser.unregister_script(&id).await {
            warn!("Failed to remove userscript {}: {}", id, e);
        }
    }

    /// The active tab, or `None` when the browser cannot tell us
    pub async fn active_tab(&self) -> Option<Tab> {
        match self.browser.list_tabs().await {
            Ok(tabs) => tabs.into_iter().find(|t| t.active),
            Err(e) => {
                warn!("Failed to list tabs: {}", e);
                None
            }
        }
    }

    pub async fn reload_active_tab(&self) {
        debug!("Triggering location.reload() in active tab");
        if let Err(e) = self
            .browser
            .eval(Script::Inline("window.location.reload()"))
            .await
        {
            warn!("Failed to reload active tab: {}", e);
        }
    }

    /// Tab strip message; failures are ignored
    pub async fn notify(&self, text: &str) {
        if !self.settings.notify {
            return;
        }
        if let Err(e) = self
            .browser
            .tabstrip_message(text, self.settings.notify_duration_ms)
            .await
        {
            debug!("Tab strip message failed: {}", e);
        }
    }
}

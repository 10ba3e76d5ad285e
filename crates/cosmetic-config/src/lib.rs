use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory name under the XDG config root
pub const APP_DIR: &str = "rethread";

/// Rule database file name
pub const FILTERS_FILENAME: &str = "cosmetic-filters.json";

/// Tool settings file name
pub const SETTINGS_FILENAME: &str = "cosmetic-filters.toml";

/// Picker script looked up in the config directory when not configured;
/// the built-in picker is used when this file is absent
pub const PICKER_FILENAME: &str = "cosmetic-filtering-picker.js";

// ============================================================================
// Paths
// ============================================================================

/// Resolve `$XDG_CONFIG_HOME/rethread`, falling back to `~/.config/rethread`.
///
/// Returns `None` when neither variable gives a location.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_from(std::env::var_os("XDG_CONFIG_HOME"), dirs::home_dir())
}

/// Path resolution with the environment passed in
pub fn config_dir_from(
    xdg_config_home: Option<OsString>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    let root = match xdg_config_home {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => home.filter(|h| !h.as_os_str().is_empty())?.join(".config"),
    };
    Some(root.join(APP_DIR))
}

// ============================================================================
// Settings (cosmetic-filters.toml)
// ============================================================================

/// Optional tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Browser control program
    #[serde(default = "default_control_binary")]
    pub control_binary: String,

    /// Forwarded as `--profile=NAME`
    #[serde(default)]
    pub profile: Option<String>,

    /// Forwarded as `--user-data-dir=PATH`
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,

    /// Userscript template; the built-in one is used when unset
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    /// Element picker script; overrides the config directory copy and the
    /// built-in picker
    #[serde(default)]
    pub picker_path: Option<PathBuf>,

    #[serde(default = "default_notify")]
    pub notify: bool,

    #[serde(default = "default_notify_duration")]
    pub notify_duration_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            control_binary: default_control_binary(),
            profile: None,
            user_data_dir: None,
            template_path: None,
            picker_path: None,
            notify: default_notify(),
            notify_duration_ms: default_notify_duration(),
        }
    }
}

fn default_control_binary() -> String {
    "rethread".to_string()
}

fn default_notify() -> bool {
    true
}

fn default_notify_duration() -> u64 {
    1500
}

impl Settings {
    /// Load settings from `config_dir`.
    ///
    /// A missing file gives defaults; an unreadable or malformed one gives
    /// defaults plus a warning. The file is never created here.
    pub fn load(config_dir: &Path) -> Self {
        let path = Self::settings_path(config_dir);
        if !path.exists() {
            return Settings::default();
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| toml::from_str::<Settings>(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Settings::default()
            }
        }
    }

    /// Get settings file path
    pub fn settings_path(config_dir: &Path) -> PathBuf {
        config_dir.join(SETTINGS_FILENAME)
    }

    /// Picker script file to use: the configured path, else the copy in
    /// `config_dir` if one is installed. `None` means the built-in picker.
    pub fn picker_path(&self, config_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = &self.picker_path {
            return Some(path.clone());
        }
        let path = config_dir.join(PICKER_FILENAME);
        path.is_file().then_some(path)
    }
}

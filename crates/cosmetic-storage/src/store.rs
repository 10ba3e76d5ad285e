//! On-disk rule database

use cosmetic_core::{ConfigDocument, Rule, CONFIG_VERSION};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Result, StorageError};

/// What gets written; the version is always the current one.
#[derive(Serialize)]
struct OnDisk<'a> {
    filters: &'a BTreeMap<String, Vec<Rule>>,
    version: u32,
}

/// JSON rule database at a fixed path
#[derive(Debug, Clone)]
pub struct FilterStore {
    path: PathBuf,
}

impl FilterStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at `<config_dir>/cosmetic-filters.json`
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(cosmetic_config::FILTERS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the database, `None` if the file does not exist.
    ///
    /// The file is unreadable when it is not a JSON object or its `filters`
    /// is not an object. A single rule that does not decode is dropped with
    /// a warning and the rest of the file is kept.
    pub fn read(&self) -> Result<Option<ConfigDocument>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.unreadable(e)),
        };

        let value: Value = serde_json::from_str(&content).map_err(|e| self.unreadable(e))?;
        let mut doc = self.decode(value)?;

        let pruned = doc.prune_empty_hosts();
        if pruned > 0 {
            debug!("Dropped {} host(s) without rules from {}", pruned, self.path.display());
        }
        Ok(Some(doc))
    }

    /// Load the database; a missing or corrupt file yields an empty one.
    pub fn load(&self) -> ConfigDocument {
        match self.read() {
            Ok(Some(doc)) => doc,
            Ok(None) => ConfigDocument::default(),
            Err(e) => {
                warn!("{}", e);
                ConfigDocument::default()
            }
        }
    }

    /// Persist via a temp file in the same directory and an atomic rename.
    pub fn save(&self, doc: &ConfigDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Through `Value` so extra rule keys are written in sorted order
        let value = serde_json::to_value(OnDisk {
            filters: &doc.filters,
            version: CONFIG_VERSION,
        })?;
        let mut content = serde_json::to_string_pretty(&value)?;
        content.push('\n');

        let tmp_path = self.tmp_path();
        if let Err(e) = write_synced(&tmp_path, content.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("Wrote {}", self.path.display());
        Ok(())
    }

    fn decode(&self, value: Value) -> Result<ConfigDocument> {
        let Value::Object(mut root) = value else {
            return Err(self.unreadable("top level is not a JSON object"));
        };

        let mut doc = ConfigDocument::default();
        match root.remove("version") {
            None => {}
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(version) => doc.version = version,
                None => warn!("Ignoring unexpected version {} in {}", v, self.path.display()),
            },
        }

        let hosts = match root.remove("filters") {
            None | Some(Value::Null) => return Ok(doc),
            Some(Value::Object(hosts)) => hosts,
            Some(_) => return Err(self.unreadable("\"filters\" is not a JSON object")),
        };

        for (host, rules) in hosts {
            let Value::Array(rules) = rules else {
                warn!("Skipping {}: rules are not a list", host);
                continue;
            };
            let mut kept = Vec::with_capacity(rules.len());
            for (i, rule) in rules.into_iter().enumerate() {
                match serde_json::from_value::<Rule>(rule) {
                    Ok(rule) => kept.push(rule),
                    Err(e) => warn!("Dropping unreadable rule #{} for {}: {}", i + 1, host, e),
                }
            }
            doc.filters.insert(host, kept);
        }
        Ok(doc)
    }

    fn unreadable(&self, reason: impl ToString) -> StorageError {
        StorageError::Unreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cosmetic-filters.json");
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

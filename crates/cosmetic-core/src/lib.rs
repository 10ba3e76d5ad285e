//! Core domain model and logic for cosmetic filters
//!
//! This crate contains:
//! - The rule database model (ConfigDocument, Rule)
//! - The rule engine (append with dedup, remove, list)
//! - The userscript template renderer
//! - The built-in element picker

pub mod document;
pub mod error;
pub mod render;
pub mod rule;

pub use document::{AppendOutcome, ConfigDocument, Removal, CONFIG_VERSION};
pub use error::{CoreError, Result};
pub use render::{match_pattern, script_id, ScriptTemplate, CONFIG_ANCHOR, MATCH_ANCHOR};
pub use rule::{Rule, RuleCandidate};

/// Element picker evaluated in the active tab when no picker file is
/// installed. Resolves to a JSON `{selector, hasText}` string, or null when
/// the user cancels.
pub const BUILTIN_PICKER: &str = include_str!("../assets/cosmetic-filtering-picker.js");

//! Storage layer for cosmetic filters
//!
//! This crate provides:
//! - Loading the rule database, recovering from missing or corrupt files
//! - Atomic write-then-rename persistence

pub mod error;
pub mod store;

pub use error::{Result, StorageError};
pub use store::FilterStore;

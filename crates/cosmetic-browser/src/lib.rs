//! Browser control for cosmetic filters
//!
//! Every operation is a blocking request/response exchange with the
//! external control binary. Failures are returned, never retried.

pub mod client;
pub mod detach;
pub mod error;
pub mod tab;

pub use client::{BrowserControl, RethreadClient, Script};
pub use detach::spawn_detached;
pub use error::{BrowserError, Result};
pub use tab::{host_of, Tab};

//! Common utilities and types shared across the L4 failover crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};

// Re-exported for `narrate!` expansions in crates without their own dependency
pub use tracing;

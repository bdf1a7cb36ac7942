//! Logging utilities for the L4 failover crates.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize tracing with human-readable output.
///
/// RUST_LOG takes precedence over `default_level` when set.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter(default_level))
        .init();
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(filter(default_level))
        .init();
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Emit an event at INFO when `$loud` is true and at DEBUG otherwise.
///
/// Dry-run mode uses this to narrate every decision on the console while
/// production mode keeps the same events out of the default log level.
#[macro_export]
macro_rules! narrate {
    ($loud:expr, $($arg:tt)+) => {
        if $loud {
            $crate::tracing::info!($($arg)+)
        } else {
            $crate::tracing::debug!($($arg)+)
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_narrate_expands_through_crate_path() {
        // Both arms must resolve without a subscriber installed
        crate::narrate!(true, value = 1, "loud");
        crate::narrate!(false, value = 2, "quiet {}", "debug");
    }
}

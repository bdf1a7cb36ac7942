//! TCP reachability probing for the L4 failover monitor.
//!
//! This crate answers one question per service and cycle: is the endpoint
//! reachable right now?
//!
//! - [`TcpProber`] makes a single connect attempt bounded by a timeout
//! - [`RetryingProbe`] repeats that attempt with a delay and reduces the
//!   attempts to a single boolean verdict
//!
//! Network failures never surface as errors. They are reported as an
//! unreachable [`ProbeResult`] carrying a [`ProbeError`] for diagnostics.
//!
//! # Example
//!
//! ```no_run
//! use healthcheck::{Endpoint, RetryPolicy, RetryingProbe, TcpProber};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> common::Result<()> {
//! let policy = RetryPolicy::new(Duration::from_secs(5), 3, Duration::from_secs(5))?;
//! let probe = RetryingProbe::new(Arc::new(TcpProber::new()), policy);
//!
//! let up = probe.check(&Endpoint::new("1.1.1.1", 53)).await;
//! # Ok(())
//! # }
//! ```

pub mod prober;
pub mod retry;
pub mod types;

pub use prober::{Prober, TcpProber};
pub use retry::{RetryPolicy, RetryingProbe};
pub use types::{Endpoint, ProbeError, ProbeResult, Reachability};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reachability_display() {
        assert_eq!(Reachability::Reachable.to_string(), "REACHABLE");
        assert_eq!(
            Reachability::Unreachable(ProbeError::Timeout).to_string(),
            "UNREACHABLE"
        );
    }

    #[test]
    fn test_probe_result() {
        let result = ProbeResult::reachable(Duration::from_millis(3));
        assert!(result.is_reachable());
        assert!(result.error().is_none());

        let result = ProbeResult::unreachable(Duration::from_secs(5), ProbeError::Timeout);
        assert!(!result.is_reachable());
        assert_eq!(result.error(), Some(&ProbeError::Timeout));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("www.example.com", 80).to_string(), "www.example.com:80");
        assert_eq!(Endpoint::new("::1", 53).to_string(), "[::1]:53");
    }
}

//! Probe types and structures.

use std::fmt;
use std::time::Duration;

/// A TCP endpoint to probe.
///
/// Two services with the same endpoint are the same service for state tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or literal IP address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals need brackets to stay unambiguous
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Why a connect attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("connect timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("name resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("network error: {0}")]
    OtherNetworkError(String),
}

impl ProbeError {
    /// Classify an I/O error returned by a connect call.
    pub fn from_connect(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => ProbeError::ConnectionRefused,
            std::io::ErrorKind::TimedOut => ProbeError::Timeout,
            _ => ProbeError::OtherNetworkError(err.to_string()),
        }
    }
}

/// Outcome of a single connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable(ProbeError),
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reachability::Reachable => write!(f, "REACHABLE"),
            Reachability::Unreachable(_) => write!(f, "UNREACHABLE"),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Whether the connection completed
    pub reachability: Reachability,

    /// Time spent on the attempt
    pub duration: Duration,
}

impl ProbeResult {
    /// Create a reachable result
    pub fn reachable(duration: Duration) -> Self {
        Self {
            reachability: Reachability::Reachable,
            duration,
        }
    }

    /// Create an unreachable result
    pub fn unreachable(duration: Duration, error: ProbeError) -> Self {
        Self {
            reachability: Reachability::Unreachable(error),
            duration,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachability == Reachability::Reachable
    }

    /// The failure reason, if any
    pub fn error(&self) -> Option<&ProbeError> {
        match &self.reachability {
            Reachability::Reachable => None,
            Reachability::Unreachable(e) => Some(e),
        }
    }
}

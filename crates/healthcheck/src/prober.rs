//! Single-attempt TCP reachability probes.

use crate::types::{Endpoint, ProbeError, ProbeResult};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::debug;

/// Prober trait
///
/// Implementations never fail: every network-layer problem is reported as an
/// unreachable [`ProbeResult`].
#[async_trait]
pub trait Prober: Send + Sync {
    /// Make one bounded attempt to reach `endpoint`
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> ProbeResult;

    /// Get the name of this prober
    fn name(&self) -> &str;
}

/// TCP connect prober
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }

    async fn connect(endpoint: &Endpoint) -> Result<TcpStream, ProbeError> {
        let addrs = lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| ProbeError::ResolutionFailure(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%endpoint, %addr, error = %e, "Connect attempt failed");
                    last_error = Some(ProbeError::from_connect(&e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProbeError::ResolutionFailure("no addresses returned".to_string())
        }))
    }

    /// Run `connect` within `timeout_duration` and classify the outcome
    async fn bounded<F>(endpoint: &Endpoint, timeout_duration: Duration, connect: F) -> ProbeResult
    where
        F: Future<Output = Result<TcpStream, ProbeError>>,
    {
        let start = Instant::now();

        match timeout(timeout_duration, connect).await {
            Ok(Ok(mut stream)) => {
                // The stream is dropped (and the socket closed) at the end of this arm
                let _ = stream.shutdown().await;
                let duration = start.elapsed();
                debug!(%endpoint, duration_ms = duration.as_millis(), "TCP probe succeeded");
                ProbeResult::reachable(duration)
            }
            Ok(Err(e)) => {
                let duration = start.elapsed();
                debug!(%endpoint, error = %e, "TCP probe failed");
                ProbeResult::unreachable(duration, e)
            }
            Err(_) => {
                let duration = start.elapsed();
                debug!(%endpoint, "TCP probe timed out");
                ProbeResult::unreachable(duration, ProbeError::Timeout)
            }
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, endpoint: &Endpoint, timeout_duration: Duration) -> ProbeResult {
        Self::bounded(endpoint, timeout_duration, Self::connect(endpoint)).await
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

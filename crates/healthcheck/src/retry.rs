//! Bounded retries around a single-attempt prober.

use crate::prober::Prober;
use crate::types::Endpoint;
use common::narrate;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy for one reachability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Arguments
    /// * `timeout` - Bound on each connect attempt
    /// * `retries` - Number of attempts per check, at least 1
    /// * `delay` - Wait between a failed attempt and the next one
    pub fn new(timeout: Duration, retries: u32, delay: Duration) -> common::Result<Self> {
        if retries == 0 {
            return Err(common::Error::config("retries must be at least 1"));
        }
        if timeout.is_zero() {
            return Err(common::Error::config("probe timeout must be non-zero"));
        }

        Ok(Self {
            timeout,
            retries,
            delay,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Longest time a single check can block its caller, saturating at `Duration::MAX`
    pub fn worst_case(&self) -> Duration {
        self.timeout
            .saturating_mul(self.retries)
            .saturating_add(self.delay.saturating_mul(self.retries - 1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Turns up to `retries` probe attempts into one reachability verdict
pub struct RetryingProbe {
    prober: Arc<dyn Prober>,
    policy: RetryPolicy,
    narrate: bool,
}

impl RetryingProbe {
    pub fn new(prober: Arc<dyn Prober>, policy: RetryPolicy) -> Self {
        Self {
            prober,
            policy,
            narrate: false,
        }
    }

    /// Log every attempt at INFO instead of DEBUG
    pub fn with_narration(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check whether `endpoint` is currently reachable.
    ///
    /// Returns `true` on the first successful attempt. Returns `false` only
    /// after every attempt failed, having waited `delay` between attempts.
    pub async fn check(&self, endpoint: &Endpoint) -> bool {
        let retries = self.policy.retries;
        narrate!(
            self.narrate,
            %endpoint,
            prober = self.prober.name(),
            "Starting reachability check"
        );

        for attempt in 1..=retries {
            narrate!(self.narrate, %endpoint, attempt, retries, "Probe attempt");

            let result = self.prober.probe(endpoint, self.policy.timeout).await;
            if result.is_reachable() {
                narrate!(
                    self.narrate,
                    %endpoint,
                    attempt,
                    duration_ms = result.duration.as_millis(),
                    "Host appears to be up"
                );
                return true;
            }

            let reason = result.error().map(|e| e.to_string()).unwrap_or_default();
            narrate!(
                self.narrate,
                %endpoint,
                attempt,
                error = %reason,
                "Host is not responding yet"
            );

            if attempt < retries {
                sleep(self.policy.delay).await;
            }
        }

        false
    }
}

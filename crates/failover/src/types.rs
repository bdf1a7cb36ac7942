//! Types for the failover engine.

use healthcheck::Endpoint;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, SystemTime};

/// A monitored service, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Display name, used in logs and audit records only
    pub name: String,

    /// Identity of the service for state tracking
    pub endpoint: Endpoint,

    /// Command reference run when the service becomes unreachable
    pub on_failure: String,

    /// Command reference run when the service becomes reachable again
    pub on_recovery: String,
}

impl ServiceSpec {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        on_failure: impl Into<String>,
        on_recovery: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: Endpoint::new(host, port),
            on_failure: on_failure.into(),
            on_recovery: on_recovery.into(),
        }
    }

    /// Command reference for a transition
    pub fn action(&self, kind: TransitionKind) -> &str {
        match kind {
            TransitionKind::Failure => &self.on_failure,
            TransitionKind::Recovery => &self.on_recovery,
        }
    }
}

/// Returns the first endpoint that appears more than once.
pub fn find_duplicate(services: &[ServiceSpec]) -> Option<&Endpoint> {
    let mut seen = HashSet::new();
    services
        .iter()
        .map(|s| &s.endpoint)
        .find(|endpoint| !seen.insert(*endpoint))
}

/// Memoized health of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Reachable, or never seen unreachable
    Ok,
    /// Unreachable and the failure action has fired
    Down,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::Ok => write!(f, "OK"),
            Health::Down => write!(f, "DOWN"),
        }
    }
}

/// Direction of a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// OK -> DOWN
    Failure,
    /// DOWN -> OK
    Recovery,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Failure => write!(f, "failure"),
            TransitionKind::Recovery => write!(f, "recovery"),
        }
    }
}

/// A state change handed from a service state to the actuator
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub spec: ServiceSpec,
    pub kind: TransitionKind,
    pub timestamp: SystemTime,
}

impl TransitionEvent {
    pub fn new(spec: ServiceSpec, kind: TransitionKind) -> Self {
        Self {
            spec,
            kind,
            timestamp: SystemTime::now(),
        }
    }
}

/// Where audit records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditTarget {
    /// The system log
    #[default]
    Syslog,
    /// The process log, under the `audit` target
    Log,
}

/// Runtime settings of the monitor
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Bound on each connect attempt
    pub probe_timeout: Duration,

    /// Attempts per check
    pub retries: u32,

    /// Wait between failed attempts
    pub retry_delay: Duration,

    /// Sleep between the end of one cycle and the start of the next
    pub loop_interval: Duration,

    /// Probe all services of a cycle concurrently
    pub concurrent: bool,

    /// Narrate instead of acting
    pub dry_run: bool,

    /// Shell template for actions, `{}` is replaced by the command reference
    pub command_template: String,

    /// Bound on each action command
    pub action_timeout: Duration,

    /// Audit sink selection
    pub audit_target: AuditTarget,

    /// Syslog identity
    pub audit_ident: String,

    /// Prefix of every audit record
    pub audit_tag: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            retries: 3,
            retry_delay: Duration::from_secs(5),
            loop_interval: Duration::from_secs(5),
            concurrent: false,
            dry_run: true,
            command_template: DEFAULT_COMMAND_TEMPLATE.to_string(),
            action_timeout: Duration::from_secs(30),
            audit_target: AuditTarget::Syslog,
            audit_ident: "IP SLA".to_string(),
            audit_tag: "IP-SLA-9-CHANGE".to_string(),
        }
    }
}

/// Runs an EOS CLI alias in the default network namespace
pub const DEFAULT_COMMAND_TEMPLATE: &str = "sudo ip netns exec default FastCli -p 15 -c {}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_selection() {
        let spec = ServiceSpec::new("DNS", "1.1.1.1", 53, "DNS-failure", "DNS-failback");
        assert_eq!(spec.action(TransitionKind::Failure), "DNS-failure");
        assert_eq!(spec.action(TransitionKind::Recovery), "DNS-failback");
    }

    #[test]
    fn test_find_duplicate() {
        let services = vec![
            ServiceSpec::new("A", "10.0.0.1", 80, "a-fail", "a-back"),
            ServiceSpec::new("B", "10.0.0.1", 443, "b-fail", "b-back"),
        ];
        assert!(find_duplicate(&services).is_none());

        let services = vec![
            ServiceSpec::new("A", "10.0.0.1", 80, "a-fail", "a-back"),
            ServiceSpec::new("B", "10.0.0.2", 80, "b-fail", "b-back"),
            ServiceSpec::new("C", "10.0.0.1", 80, "c-fail", "c-back"),
        ];
        assert_eq!(
            find_duplicate(&services),
            Some(&Endpoint::new("10.0.0.1", 80))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Health::Ok.to_string(), "OK");
        assert_eq!(Health::Down.to_string(), "DOWN");
        assert_eq!(TransitionKind::Failure.to_string(), "failure");
        assert_eq!(TransitionKind::Recovery.to_string(), "recovery");
    }
}

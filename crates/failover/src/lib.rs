//! L4 failover monitor
//!
//! Watches a fixed list of TCP services and runs a configuration change
//! exactly once when a service becomes unreachable, and the reverse change
//! exactly once when it comes back.
//!
//! # Components
//!
//! - **ServiceState**: edge-triggered OK/DOWN memory per service
//! - **FailoverActuator**: runs the failover or failback command and writes
//!   the audit record, or narrates both in dry-run mode
//! - **Scheduler**: probes every service each cycle and sleeps between cycles
//!
//! Probing itself lives in the `healthcheck` crate.

pub mod actuator;
pub mod audit;
pub mod config;
pub mod executor;
pub mod scheduler;
pub mod state;
pub mod types;

pub use actuator::{FailoverActuator, FireOutcome};
pub use audit::{AuditError, AuditSink, LogSink, SyslogSink};
pub use config::{Config, ConfigError};
pub use executor::{ActionError, CommandExecutor, ShellExecutor};
pub use scheduler::{CycleReport, MonitorContext, Scheduler};
pub use state::ServiceState;
pub use types::{Health, MonitorSettings, ServiceSpec, TransitionEvent, TransitionKind};

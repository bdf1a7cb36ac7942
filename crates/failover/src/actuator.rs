//! Applies failover and failback actions for state transitions.

use crate::audit::{AuditError, AuditSink, LogSink, SyslogSink, audit_message};
use crate::executor::{ActionError, CommandExecutor, ShellExecutor};
use crate::types::{AuditTarget, MonitorSettings, TransitionEvent, TransitionKind};
use std::sync::Arc;
use tracing::{info, warn};

/// What `fire` did for one event
#[derive(Debug)]
pub enum FireOutcome {
    /// Dry run: the change was described, nothing was executed or audited
    Narrated(String),

    /// The action ran and an audit record was attempted
    Applied {
        action: Result<(), ActionError>,
        audit: Result<(), AuditError>,
    },
}

impl FireOutcome {
    /// True when every side effect succeeded
    pub fn is_clean(&self) -> bool {
        match self {
            FireOutcome::Narrated(_) => true,
            FireOutcome::Applied { action, audit } => action.is_ok() && audit.is_ok(),
        }
    }
}

/// Runs the configured command for a transition and records it
pub struct FailoverActuator {
    executor: Arc<dyn CommandExecutor>,
    audit: Arc<dyn AuditSink>,
    audit_tag: String,
    dry_run: bool,
}

impl FailoverActuator {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        audit: Arc<dyn AuditSink>,
        audit_tag: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            executor,
            audit,
            audit_tag: audit_tag.into(),
            dry_run,
        }
    }

    /// Build the production actuator from settings
    pub fn from_settings(settings: &MonitorSettings) -> common::Result<Self> {
        let executor = Arc::new(ShellExecutor::new(
            settings.command_template.clone(),
            settings.action_timeout,
        ));

        let audit: Arc<dyn AuditSink> = match settings.audit_target {
            AuditTarget::Syslog => {
                let sink = SyslogSink::new(&settings.audit_ident).map_err(common::Error::audit)?;
                info!(ident = sink.ident(), "Audit records go to syslog");
                Arc::new(sink)
            }
            AuditTarget::Log => Arc::new(LogSink),
        };

        Ok(Self::new(
            executor,
            audit,
            settings.audit_tag.clone(),
            settings.dry_run,
        ))
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply the action for `event`.
    ///
    /// Command execution and the audit record are independent: a failed
    /// command is logged and the audit record is still written.
    pub async fn fire(&self, event: &TransitionEvent) -> FireOutcome {
        let spec = &event.spec;

        if self.dry_run {
            let message = match event.kind {
                TransitionKind::Failure => format!(
                    "The host at {} for {} has FAILED. Executing config change.",
                    spec.endpoint.host, spec.name
                ),
                TransitionKind::Recovery => format!(
                    "The host at {} for {} is REACHABLE again and will be executing config change.",
                    spec.endpoint.host, spec.name
                ),
            };
            info!(
                service = %spec.name,
                command = spec.action(event.kind),
                "{}",
                message
            );
            return FireOutcome::Narrated(message);
        }

        let command = spec.action(event.kind);
        let action = self.executor.execute(command).await;
        match &action {
            Ok(()) => info!(
                service = %spec.name,
                endpoint = %spec.endpoint,
                kind = %event.kind,
                command,
                "Action applied"
            ),
            Err(e) => warn!(
                service = %spec.name,
                endpoint = %spec.endpoint,
                kind = %event.kind,
                error = %e,
                "Action invocation failed"
            ),
        }

        let audit = self.audit.log(&audit_message(&self.audit_tag, event));
        if let Err(e) = &audit {
            warn!(service = %spec.name, error = %e, "Failed to write audit record");
        }

        FireOutcome::Applied { action, audit }
    }
}

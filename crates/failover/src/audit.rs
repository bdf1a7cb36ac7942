//! Audit records for applied failover changes.

use crate::types::{TransitionEvent, TransitionKind};
use std::ffi::CString;
use thiserror::Error;
use tracing::info;

/// Audit sink error types
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit message contains a NUL byte")]
    InvalidMessage,

    #[error("syslog ident contains a NUL byte")]
    InvalidIdent,
}

/// Destination for one-line audit records.
///
/// Writes are best-effort and must not block indefinitely.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    fn log(&self, message: &str) -> Result<(), AuditError>;
}

/// Render the audit record for a transition.
pub fn audit_message(tag: &str, event: &TransitionEvent) -> String {
    let spec = &event.spec;
    match event.kind {
        TransitionKind::Failure => format!(
            "{}: {} host reachability failure. Removing PBR for {}.",
            tag, spec.endpoint, spec.name
        ),
        TransitionKind::Recovery => format!(
            "{}: {} host once again available. Adding PBR for {}.",
            tag, spec.endpoint, spec.name
        ),
    }
}

/// Writes audit records to the system log at facility LOCAL4.
///
/// `openlog` is process-wide state, so only one sink should exist at a time.
pub struct SyslogSink {
    // openlog keeps this pointer; it must live as long as the sink
    ident: CString,
}

impl SyslogSink {
    pub fn new(ident: &str) -> Result<Self, AuditError> {
        let ident = CString::new(ident).map_err(|_| AuditError::InvalidIdent)?;
        // SAFETY: `ident` is a valid C string owned by the returned sink, which
        // calls `closelog` before releasing it.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_LOCAL4) };
        Ok(Self { ident })
    }

    pub fn ident(&self) -> &str {
        self.ident.to_str().unwrap_or_default()
    }
}

impl AuditSink for SyslogSink {
    fn log(&self, message: &str) -> Result<(), AuditError> {
        let message = CString::new(message).map_err(|_| AuditError::InvalidMessage)?;
        // SAFETY: both pointers are valid C strings for the duration of the call
        // and the message is passed as an argument, never as the format.
        unsafe {
            libc::syslog(
                libc::LOG_LOCAL4 | libc::LOG_INFO,
                c"%s".as_ptr(),
                message.as_ptr(),
            )
        };
        Ok(())
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        // SAFETY: closelog has no preconditions
        unsafe { libc::closelog() };
    }
}

/// Writes audit records to the process log under the `audit` target
#[derive(Debug, Default)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn log(&self, message: &str) -> Result<(), AuditError> {
        info!(target: "audit", "{}", message);
        Ok(())
    }
}

//! Execution of failover and failback commands.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tokio::process::Child;
use tracing::{debug, warn};

/// Why an action could not be applied
///
/// These describe the command machinery, not the monitored service.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` exited with {}", exit_code(.code))]
    Failed { command: String, code: Option<i32> },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Runs a command reference
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion; non-zero exit is an error
    async fn execute(&self, command: &str) -> Result<(), ActionError>;
}

/// Runs command references through `sh -c` using a template
pub struct ShellExecutor {
    template: String,
    timeout: Duration,
}

impl ShellExecutor {
    /// Create an executor.
    ///
    /// # Arguments
    /// * `template` - Shell command with a `{}` placeholder for the reference
    /// * `timeout` - Bound on each command; the child is killed when it expires
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            template: template.into(),
            timeout,
        }
    }

    /// The shell line run for `command`
    pub fn render(&self, command: &str) -> String {
        self.template.replace("{}", command)
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<(), ActionError> {
        let line = self.render(command);
        debug!(command = %line, "Running action");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ActionError::Spawn {
                command: line.clone(),
                source,
            })?;

        match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(ActionError::Failed {
                command: line,
                code: status.code(),
            }),
            Ok(Err(source)) => Err(ActionError::Wait {
                command: line,
                source,
            }),
            Err(_) => {
                terminate_group(&mut child).await;
                Err(ActionError::Timeout {
                    command: line,
                    timeout: self.timeout,
                })
            }
        }
    }
}

/// SIGKILL the child's process group, then reap the child.
///
/// The child leads its own group, so this also reaches anything the shell
/// started in the background.
async fn terminate_group(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: killpg only sends a signal; the group id is our own child's pid
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pid, error = %err, "SIGKILL to process group failed");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to reap timed-out action");
    }
}

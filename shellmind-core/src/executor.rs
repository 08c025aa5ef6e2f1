//! # Command Executor
//!
//! Runs one shell command on behalf of the model and reduces whatever
//! happened to a single output string:
//!
//! - stdout if non-empty, else stderr if non-empty, else [`NO_OUTPUT`]
//! - a timeout kills the child and yields [`timeout_message`]
//! - a spawn failure yields `"Error executing command: ..."`
//!
//! The optional metacharacter filter only refuses `;`, `|`, `&` and the
//! backtick. It does not stop `$()`, redirection or newlines and must not be
//! treated as a sandbox.

use crate::error::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Default wall-clock limit for one command
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Output recorded when a command printed nothing at all
pub const NO_OUTPUT: &str = "Command executed successfully (no output)";

/// Output recorded when the metacharacter filter refuses a command
pub const REJECTED_OUTPUT: &str = "Error: Command contains disallowed shell metacharacters";

/// Characters refused when `reject_metacharacters` is on
pub const DENIED_METACHARACTERS: [char; 4] = [';', '|', '&', '`'];

pub fn timeout_message(secs: u64) -> String {
    format!("Error: Command timed out after {} seconds", secs)
}

/// Executor settings
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub timeout: Duration,
    pub reject_metacharacters: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            reject_metacharacters: false,
        }
    }
}

/// How a command run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran to completion (any exit status)
    Completed { output: String, exit_code: Option<i32> },
    /// Refused by the metacharacter filter, never spawned
    Rejected,
    /// Killed after exceeding the timeout
    TimedOut,
    /// The shell could not be started
    Failed { reason: String },
}

impl CommandOutcome {
    /// The text recorded as the turn's output
    pub fn output(&self, timeout: Duration) -> String {
        match self {
            CommandOutcome::Completed { output, .. } => output.clone(),
            CommandOutcome::Rejected => REJECTED_OUTPUT.to_string(),
            CommandOutcome::TimedOut => timeout_message(timeout.as_secs()),
            CommandOutcome::Failed { reason } => format!("Error executing command: {}", reason),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, CommandOutcome::Completed { .. })
    }
}

/// Runs shell commands under the configured limits
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Check the command against the metacharacter filter, if enabled
    pub fn check(&self, command: &str) -> Result<()> {
        if !self.config.reject_metacharacters {
            return Ok(());
        }
        match command.chars().find(|c| DENIED_METACHARACTERS.contains(c)) {
            Some(c) => Err(Error::command_rejected(
                command,
                format!("disallowed metacharacter '{}'", c),
            )
            .with_operation("executor::check")),
            None => Ok(()),
        }
    }

    /// Run `command` and return how it ended
    pub async fn run(&self, command: &str) -> CommandOutcome {
        if let Err(e) = self.check(command) {
            warn!(error = %e, "command rejected");
            return CommandOutcome::Rejected;
        }

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = Error::command_failed(command, e.to_string())
                    .with_operation("executor::run")
                    .set_source(e);
                warn!(error = %err, "failed to spawn shell");
                return CommandOutcome::Failed { reason: err.message().to_string() };
            }
        };

        info!(command, "running command");
        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let exit_code = output.status.code();
                debug!(?exit_code, stdout_len = stdout.len(), stderr_len = stderr.len(), "command finished");

                let output = if !stdout.is_empty() {
                    stdout.into_owned()
                } else if !stderr.is_empty() {
                    stderr.into_owned()
                } else {
                    NO_OUTPUT.to_string()
                };
                CommandOutcome::Completed { output, exit_code }
            }
            Ok(Err(e)) => {
                warn!(command, error = %e, "failed waiting for command");
                CommandOutcome::Failed { reason: e.to_string() }
            }
            Err(_) => {
                let err = Error::command_timeout(command, self.config.timeout.as_secs())
                    .with_operation("executor::run");
                warn!(error = %err, "command timed out");
                CommandOutcome::TimedOut
            }
        }
    }

    /// Run `command` and reduce the outcome to its output string
    pub async fn execute(&self, command: &str) -> String {
        self.run(command).await.output(self.config.timeout)
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn executor(timeout_secs: u64, reject: bool) -> CommandExecutor {
        CommandExecutor::new(ExecutorConfig {
            timeout: Duration::from_secs(timeout_secs),
            reject_metacharacters: reject,
        })
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let output = CommandExecutor::default().execute("echo hi").await;
        assert_eq!(output, "hi\n");
    }

    #[tokio::test]
    async fn test_stderr_used_when_stdout_empty() {
        let output = CommandExecutor::default().execute("echo oops >&2").await;
        assert_eq!(output, "oops\n");
    }

    #[tokio::test]
    async fn test_stdout_preferred_over_stderr() {
        let output = CommandExecutor::default().execute("echo out; echo err >&2").await;
        assert_eq!(output, "out\n");
    }

    #[tokio::test]
    async fn test_no_output_yields_success_string() {
        let outcome = CommandExecutor::default().run("true").await;
        assert_eq!(
            outcome,
            CommandOutcome::Completed { output: NO_OUTPUT.to_string(), exit_code: Some(0) }
        );
    }

    #[tokio::test]
    async fn test_failing_command_still_completes() {
        let outcome = CommandExecutor::default().run("exit 3").await;
        assert_eq!(
            outcome,
            CommandOutcome::Completed { output: NO_OUTPUT.to_string(), exit_code: Some(3) }
        );
        assert!(!outcome.is_error());
    }

    #[tokio::test]
    async fn test_timeout_does_not_hang() {
        let exec = executor(1, false);
        let start = Instant::now();
        let outcome = exec.run("sleep 10").await;

        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.output(exec.config().timeout), timeout_message(1));
    }

    #[tokio::test]
    async fn test_metacharacters_rejected_only_when_enabled() {
        let strict = executor(5, true);
        for command in ["ls; id", "ls | wc", "sleep 1 &", "echo `id`"] {
            assert_eq!(strict.run(command).await, CommandOutcome::Rejected, "{}", command);
        }
        assert_eq!(strict.execute("echo fine").await, "fine\n");

        let lenient = executor(5, false);
        assert_eq!(lenient.execute("echo a; echo b").await, "a\nb\n");
    }

    #[test]
    fn test_check_reports_offending_character() {
        let err = executor(5, true).check("cat x | grep y").unwrap_err();
        assert!(err.message().contains('|'));
        assert!(executor(5, false).check("cat x | grep y").is_ok());
    }

    #[test]
    fn test_outcome_messages() {
        let timeout = Duration::from_secs(30);
        assert_eq!(CommandOutcome::Rejected.output(timeout), REJECTED_OUTPUT);
        assert_eq!(
            CommandOutcome::TimedOut.output(timeout),
            "Error: Command timed out after 30 seconds"
        );
        assert_eq!(
            CommandOutcome::Failed { reason: "no shell".into() }.output(timeout),
            "Error executing command: no shell"
        );
    }
}

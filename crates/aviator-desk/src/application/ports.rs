//! Ports: the traits the use cases depend on.
//!
//! Infrastructure provides the real implementations (`SystemRunner`,
//! `ConfigStore`); tests provide recording doubles.  Keeping the traits here
//! lets the application layer stay free of process and file-system code.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use aviator_core::{AppMappings, ConfigSection, Settings};
use thiserror::Error;

/// Default timeout for a single external command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for `fcli aviator ssc audit`, which runs a full scan.
pub const AUDIT_TIMEOUT: Duration = Duration::from_secs(300);

const REDACTED: &str = "********";

// ── Command execution ─────────────────────────────────────────────────────────

/// A fully described external command.
///
/// Built with a small builder API:
///
/// ```rust
/// use aviator_desk::application::ports::CommandSpec;
///
/// let spec = CommandSpec::new("fcli")
///     .args(["ssc", "session", "login", "-p"])
///     .sensitive_arg("hunter2");
/// assert_eq!(spec.display_line(), "fcli ssc session login -p ********");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Indices into `args` that must never be logged.
    sensitive: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            sensitive: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument that is replaced by `********` in logs.
    pub fn sensitive_arg(mut self, arg: impl Into<String>) -> Self {
        self.sensitive.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_sensitive(&self, index: usize) -> bool {
        self.sensitive.contains(&index)
    }

    /// The command line with sensitive arguments redacted, for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for (index, arg) in self.args.iter().enumerate() {
            line.push(' ');
            line.push_str(if self.is_sensitive(index) { REDACTED } else { arg });
        }
        line
    }

    /// `true` when `program` followed by `prefix` starts this command.
    ///
    /// Used by test doubles to pick a canned reply.
    pub fn starts_with(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && prefix.len() <= self.args.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run printing `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A run that exited with `code` and printed `stderr`.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit code 0 is the only success signal.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// The process could not be run to completion.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable is not on `PATH`.
    #[error("Command not found: {program}")]
    NotFound { program: String },

    /// The process exceeded its timeout and was killed.
    #[error("Command timed out")]
    TimedOut { program: String, timeout: Duration },

    /// Spawning or talking to the process failed for another reason.
    #[error("{source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external commands.
///
/// The system implementation spawns real processes; test implementations
/// return canned output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the process cannot be started, or does
    /// not finish within `spec.timeout`.  A non-zero exit is *not* an error at
    /// this level; inspect [`CommandOutput::success`].
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError>;
}

// ── Settings persistence ──────────────────────────────────────────────────────

/// Persisting a settings change failed.
#[derive(Debug, Error)]
#[error("failed to save configuration: {0}")]
pub struct StoreError(pub String);

/// Read/write access to the persisted settings.
///
/// Every mutating call must be durable when it returns.
pub trait SettingsStore: Send {
    /// Snapshot of all settings.
    fn settings(&self) -> Settings;

    /// Sets one key and persists the change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change could not be written.
    fn set(&mut self, section: ConfigSection, key: &str, value: &str) -> Result<(), StoreError>;

    /// Adds or replaces a mapping and persists the change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change could not be written.
    fn add_mapping(&mut self, ssc_app: &str, aviator_app: &str) -> Result<(), StoreError>;

    /// Removes a mapping, returning its target if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change could not be written.
    fn remove_mapping(&mut self, ssc_app: &str) -> Result<Option<String>, StoreError>;

    fn mappings(&self) -> AppMappings {
        self.settings().mappings
    }
}

// ── Progress reporting ────────────────────────────────────────────────────────

/// Receives progress updates from long-running operations.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_defaults_to_thirty_second_timeout() {
        let spec = CommandSpec::new("openssl").arg("version");
        assert_eq!(spec.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_display_line_redacts_sensitive_arguments_only() {
        // Arrange
        let spec = CommandSpec::new("fcli")
            .args(["ssc", "session", "login", "-u", "admin", "-p"])
            .sensitive_arg("s3cret");

        // Act
        let line = spec.display_line();

        // Assert
        assert_eq!(line, "fcli ssc session login -u admin -p ********");
        assert!(!line.contains("s3cret"));
        assert_eq!(spec.args.last().map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn test_starts_with_matches_program_and_argument_prefix() {
        let spec = CommandSpec::new("fcli").args(["aviator", "app", "list"]);

        assert!(spec.starts_with("fcli", &["aviator", "app"]));
        assert!(spec.starts_with("fcli", &[]));
        assert!(!spec.starts_with("openssl", &["aviator"]));
        assert!(!spec.starts_with("fcli", &["aviator", "app", "list", "--output"]));
    }

    #[test]
    fn test_command_output_success_requires_exit_code_zero() {
        assert!(CommandOutput::ok("").success());
        assert!(!CommandOutput::failed(1, "boom").success());
        assert!(!CommandOutput::default().success());
    }

    #[test]
    fn test_process_error_messages() {
        let not_found = ProcessError::NotFound {
            program: "fcli".to_string(),
        };
        let timed_out = ProcessError::TimedOut {
            program: "fcli".to_string(),
            timeout: AUDIT_TIMEOUT,
        };
        assert_eq!(not_found.to_string(), "Command not found: fcli");
        assert_eq!(timed_out.to_string(), "Command timed out");
    }
}

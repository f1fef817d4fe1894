//! Scripted command runner for tests.
//!
//! [`ScriptedRunner`] answers each command with the reply of the first rule
//! whose program and argument prefix match, and records every command it
//! receives.  Commands no rule matches fail with "Command not found", exactly
//! like a missing executable.
//!
//! ```rust
//! use aviator_desk::infrastructure::process::{Reply, ScriptedRunner};
//!
//! let runner = ScriptedRunner::new()
//!     .on("fcli", &["--version"], Reply::stdout("3.6.0"))
//!     .on("openssl", &["version"], Reply::not_found());
//! assert!(runner.calls().is_empty());
//! ```

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

/// What a matched rule answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    kind: ReplyKind,
    delay: Duration,
}

#[derive(Debug, Clone)]
enum ReplyKind {
    Output(CommandOutput),
    NotFound,
    TimedOut,
}

impl Reply {
    /// Exit code 0 with `stdout`.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self::output(CommandOutput::ok(stdout))
    }

    /// Non-zero exit with `stderr`.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self::output(CommandOutput::failed(code, stderr))
    }

    pub fn output(output: CommandOutput) -> Self {
        Self {
            kind: ReplyKind::Output(output),
            delay: Duration::ZERO,
        }
    }

    pub fn not_found() -> Self {
        Self {
            kind: ReplyKind::NotFound,
            delay: Duration::ZERO,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            kind: ReplyKind::TimedOut,
            delay: Duration::ZERO,
        }
    }

    /// Sleeps for `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct Rule {
    program: String,
    prefix: Vec<String>,
    reply: Reply,
}

/// A [`CommandRunner`] that replays canned replies and records calls.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; earlier rules win when several match.
    pub fn on(mut self, program: &str, prefix: &[&str], reply: Reply) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|p| p.to_string()).collect(),
            reply,
        });
        self
    }

    /// Every command received so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Redacted command lines received so far.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display_line).collect()
    }

    fn reply_for(&self, spec: &CommandSpec) -> Option<Reply> {
        self.rules
            .iter()
            .find(|rule| {
                let prefix: Vec<&str> = rule.prefix.iter().map(String::as_str).collect();
                spec.starts_with(&rule.program, &prefix)
            })
            .map(|rule| rule.reply.clone())
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }

        let Some(reply) = self.reply_for(&spec) else {
            return Err(ProcessError::NotFound {
                program: spec.program,
            });
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.kind {
            ReplyKind::Output(output) => Ok(output),
            ReplyKind::NotFound => Err(ProcessError::NotFound {
                program: spec.program,
            }),
            ReplyKind::TimedOut => Err(ProcessError::TimedOut {
                program: spec.program,
                timeout: spec.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        // Arrange
        let runner = ScriptedRunner::new()
            .on("fcli", &["aviator", "app", "list"], Reply::stdout("[]"))
            .on("fcli", &["aviator"], Reply::failure(1, "generic"));

        // Act
        let list = runner
            .run(CommandSpec::new("fcli").args(["aviator", "app", "list", "--output", "json"]))
            .await
            .expect("scripted");
        let other = runner
            .run(CommandSpec::new("fcli").args(["aviator", "session", "login"]))
            .await
            .expect("scripted");

        // Assert
        assert_eq!(list.stdout, "[]");
        assert_eq!(other.stderr, "generic");
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_command_is_not_found() {
        let runner = ScriptedRunner::new();

        let result = runner.run(CommandSpec::new("openssl").arg("version")).await;

        assert!(matches!(result, Err(ProcessError::NotFound { program }) if program == "openssl"));
        assert_eq!(runner.call_lines(), vec!["openssl version".to_string()]);
    }

    #[tokio::test]
    async fn test_timed_out_reply_reports_spec_timeout() {
        let runner = ScriptedRunner::new().on("fcli", &[], Reply::timed_out());
        let spec = CommandSpec::new("fcli").timeout(Duration::from_secs(300));

        let result = runner.run(spec).await;

        assert!(matches!(
            result,
            Err(ProcessError::TimedOut { timeout, .. }) if timeout == Duration::from_secs(300)
        ));
    }
}

//! Process infrastructure: spawning `fcli` and `openssl`.
//!
//! [`SystemRunner`] is the production [`CommandRunner`].  Each call:
//!
//! 1. Logs the command line with sensitive arguments redacted.
//! 2. Spawns the program with stdin closed, piped stdout/stderr and, on
//!    Windows, without a console window.
//! 3. Waits for exit under the command's timeout.  On timeout the child is
//!    killed when its handle is dropped.
//! 4. Logs the outcome: stdout (truncated) on success, stderr on failure.
//!
//! `mock` holds [`ScriptedRunner`], a canned-reply runner used by the
//! integration tests.  It is always compiled so `tests/` can reach it.

pub mod mock;

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::application::ports::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

pub use mock::{Reply, ScriptedRunner};

/// Longest stdout excerpt written to the log.
const LOGGED_STDOUT_CHARS: usize = 500;

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ProcessError> {
        let line = spec.display_line();
        debug!("Executing command: {line}");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        hide_console_window(&mut command);

        let child = command.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                error!("Command not found: {}", spec.program);
                ProcessError::NotFound {
                    program: spec.program.clone(),
                }
            } else {
                error!("Failed to start {}: {source}", spec.program);
                ProcessError::Io {
                    program: spec.program.clone(),
                    source,
                }
            }
        })?;

        let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                error!("Command failed to complete: {line}: {source}");
                return Err(ProcessError::Io {
                    program: spec.program,
                    source,
                });
            }
            Err(_) => {
                error!("Command timed out after {:?}: {line}", spec.timeout);
                return Err(ProcessError::TimedOut {
                    program: spec.program,
                    timeout: spec.timeout,
                });
            }
        };

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success() {
            debug!(
                "Command succeeded: {line}\nstdout: {}",
                excerpt(&result.stdout, LOGGED_STDOUT_CHARS)
            );
        } else {
            error!(
                "Command failed ({}): {line}\nstderr: {}",
                result
                    .code
                    .map_or_else(|| "signal".to_string(), |c| format!("exit {c}")),
                result.stderr.trim_end()
            );
        }
        Ok(result)
    }
}

/// First `limit` characters of `text`, marked when cut.
fn excerpt(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}

//! Service façades over the external programs.
//!
//! Each service turns one user intent into an exact `fcli` or `openssl`
//! argument list, runs it through the injected [`CommandRunner`] and maps the
//! outcome to a user-facing message or a [`ServiceError`].
//!
//! - **`toolchain`** – prerequisite checks and RSA key generation (`openssl`).
//! - **`aviator`**   – `fcli aviator ...`: server admin config, tokens,
//!   sessions, applications and audits.
//! - **`ssc`**       – `fcli ssc ...`: session login and application versions.

pub mod aviator;
pub mod ssc;
pub mod toolchain;

use aviator_core::ParseError;
use thiserror::Error;

use crate::application::ports::{CommandRunner, CommandSpec, ProcessError};

pub use aviator::AviatorService;
pub use ssc::SscService;
pub use toolchain::{KeyPair, ToolCheck, ToolchainService};

/// Executable names (or paths) of the external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub fcli: String,
    pub openssl: String,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            fcli: "fcli".to_string(),
            openssl: "openssl".to_string(),
        }
    }
}

/// A service call that did not succeed.
///
/// `Display` is the message shown to the user, e.g.
/// `SSC login failed: Command not found: fcli`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The process could not be run to completion.
    #[error("{context}: {source}")]
    Process {
        context: &'static str,
        #[source]
        source: ProcessError,
    },

    /// The process exited non-zero.
    #[error("{context}: {stderr}")]
    Exit {
        context: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// The process succeeded but its JSON output was unusable.
    #[error("{context}")]
    Parse {
        context: &'static str,
        #[source]
        source: ParseError,
    },

    /// A local file operation around the process failed.
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// The failure text without the leading context.
    pub fn detail(&self) -> String {
        match self {
            ServiceError::Process { source, .. } => source.to_string(),
            ServiceError::Exit { stderr, .. } => stderr.clone(),
            ServiceError::Parse { source, .. } => source.to_string(),
            ServiceError::Io { source, .. } => source.to_string(),
        }
    }
}

/// Runs `spec` and returns its stdout, or the failure tagged with `context`.
pub(crate) async fn run_checked(
    runner: &dyn CommandRunner,
    spec: CommandSpec,
    context: &'static str,
) -> Result<String, ServiceError> {
    let output = runner
        .run(spec)
        .await
        .map_err(|source| ServiceError::Process { context, source })?;

    if output.success() {
        Ok(output.stdout)
    } else {
        Err(ServiceError::Exit {
            context,
            code: output.code,
            stderr: output.stderr,
        })
    }
}

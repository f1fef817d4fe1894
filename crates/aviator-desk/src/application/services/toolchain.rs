//! Prerequisite checks and RSA key generation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aviator_core::toolchain::public_key_path;
use aviator_core::FcliSupport;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{run_checked, Programs, ServiceError};
use crate::application::ports::{CommandRunner, CommandSpec};

const FCLI_MISSING: &str =
    "FCLI not found. Please install FCLI 3.5.1 or later and add to PATH variable.";
const OPENSSL_MISSING: &str =
    "OpenSSL not found. Please install OpenSSL and add to PATH variable.";

/// Outcome of probing one external program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCheck {
    pub available: bool,
    pub message: String,
}

/// Paths of a freshly generated key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPair {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyPair {
    pub fn message(&self) -> String {
        format!(
            "Key pair generated successfully! Private: {}, Public: {}",
            self.private_key.display(),
            self.public_key.display()
        )
    }
}

#[derive(Clone)]
pub struct ToolchainService {
    runner: Arc<dyn CommandRunner>,
    programs: Programs,
}

impl ToolchainService {
    pub fn new(runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self { runner, programs }
    }

    /// Runs `fcli --version` and checks it against the minimum version.
    pub async fn check_fcli(&self) -> ToolCheck {
        info!("Checking FCLI version");
        let spec = CommandSpec::new(&self.programs.fcli).arg("--version");

        let stdout = match run_checked(self.runner.as_ref(), spec, "FCLI check failed").await {
            Ok(stdout) => stdout,
            Err(_) => {
                error!("{FCLI_MISSING}");
                return ToolCheck {
                    available: false,
                    message: FCLI_MISSING.to_string(),
                };
            }
        };

        let support = FcliSupport::from_version_output(&stdout);
        let message = support.message();
        match support {
            FcliSupport::Supported(_) => info!("{message}"),
            FcliSupport::Outdated(_) => warn!("{message}"),
            FcliSupport::Unrecognized => error!("{message}"),
        }
        ToolCheck {
            available: support.is_supported(),
            message,
        }
    }

    /// Runs `openssl version`.
    pub async fn check_openssl(&self) -> ToolCheck {
        info!("Checking OpenSSL installation");
        let spec = CommandSpec::new(&self.programs.openssl).arg("version");

        match run_checked(self.runner.as_ref(), spec, "OpenSSL check failed").await {
            Ok(stdout) => {
                let message = format!("OpenSSL found: {} ✓", stdout.trim());
                info!("{message}");
                ToolCheck {
                    available: true,
                    message,
                }
            }
            Err(_) => {
                error!("{OPENSSL_MISSING}");
                ToolCheck {
                    available: false,
                    message: OPENSSL_MISSING.to_string(),
                }
            }
        }
    }

    /// Generates an RSA-4096 private key at `private_key` and extracts its
    /// public key next to it (`<stem>_public.pem`).
    ///
    /// # Errors
    ///
    /// Fails when the parent directory cannot be created or either `openssl`
    /// call fails.
    pub async fn generate_key_pair(&self, private_key: &Path) -> Result<KeyPair, ServiceError> {
        let private_key = absolute(private_key).map_err(|source| ServiceError::Io {
            context: "Key generation failed",
            source,
        })?;
        if let Some(dir) = private_key.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ServiceError::Io {
                    context: "Key generation failed",
                    source,
                })?;
        }
        let public_key = public_key_path(&private_key);
        let private_arg = private_key.to_string_lossy().into_owned();
        let public_arg = public_key.to_string_lossy().into_owned();
        info!("Generating RSA key pair: {private_arg}, {public_arg}");

        let genpkey = CommandSpec::new(&self.programs.openssl).args([
            "genpkey",
            "-algorithm",
            "RSA",
            "-pkeyopt",
            "rsa_keygen_bits:4096",
            "-out",
            private_arg.as_str(),
        ]);
        run_checked(
            self.runner.as_ref(),
            genpkey,
            "Failed to generate private key",
        )
        .await?;

        let pubout = CommandSpec::new(&self.programs.openssl).args([
            "rsa",
            "-in",
            private_arg.as_str(),
            "-pubout",
            "-out",
            public_arg.as_str(),
        ]);
        run_checked(self.runner.as_ref(), pubout, "Failed to generate public key").await?;

        let pair = KeyPair {
            private_key,
            public_key,
        };
        info!("{}", pair.message());
        Ok(pair)
    }

    /// Reads a PEM file as text.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] when the file cannot be read.
    pub async fn read_public_key(&self, path: &Path) -> Result<String, ServiceError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ServiceError::Io {
                context: "Failed to read public key",
                source,
            })
    }
}

/// Resolves a relative path against the working directory.
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

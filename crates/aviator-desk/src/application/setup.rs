//! SetupUseCase: the one-time preparation steps.
//!
//! 1. Check that `fcli` (3.5.1+) and `openssl` are installed.
//! 2. Generate an RSA key pair and remember the private key path.
//! 3. Register the Aviator server with `fcli` and remember URL and tenant.
//! 4. Mint a token file and remember where it was saved.
//!
//! Settings are only written after the corresponding `fcli`/`openssl` call
//! succeeded.

use std::path::Path;
use std::sync::Arc;

use aviator_core::validate::{is_valid_email, is_valid_file_path, is_valid_url};
use aviator_core::{ConfigSection, Severity, ValidationError};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::ports::{CommandRunner, SettingsStore};
use super::services::{AviatorService, KeyPair, Programs, ToolCheck, ToolchainService};
use super::OperationError;

/// Result of probing both external programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteReport {
    pub fcli: ToolCheck,
    pub openssl: ToolCheck,
}

impl PrerequisiteReport {
    /// Success when both programs are usable, warning for one, error for none.
    pub fn severity(&self) -> Severity {
        match (self.fcli.available, self.openssl.available) {
            (true, true) => Severity::Success,
            (false, false) => Severity::Error,
            _ => Severity::Warning,
        }
    }

    /// One `✓`/`✗` line per program.
    pub fn message(&self) -> String {
        let mark = |ok: bool| if ok { '✓' } else { '✗' };
        format!(
            "{} FCLI: {}\n{} OpenSSL: {}",
            mark(self.fcli.available),
            self.fcli.message,
            mark(self.openssl.available),
            self.openssl.message
        )
    }
}

/// A generated key pair plus the public key text, when readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedKeys {
    pub pair: KeyPair,
    pub public_key_pem: Option<String>,
}

pub struct SetupUseCase<S> {
    store: Arc<Mutex<S>>,
    toolchain: ToolchainService,
    aviator: AviatorService,
}

impl<S: SettingsStore> SetupUseCase<S> {
    pub fn new(store: Arc<Mutex<S>>, runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self {
            store,
            toolchain: ToolchainService::new(Arc::clone(&runner), programs.clone()),
            aviator: AviatorService::new(runner, programs),
        }
    }

    /// Probes `fcli` and `openssl`.  Never fails; missing tools are reported.
    pub async fn check_prerequisites(&self) -> PrerequisiteReport {
        let fcli = self.toolchain.check_fcli().await;
        let openssl = self.toolchain.check_openssl().await;
        PrerequisiteReport { fcli, openssl }
    }

    /// Generates the key pair and persists `server.private_key_path`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::FilePath`] for an unusable path, otherwise the
    /// failing `openssl` step or the settings write.
    pub async fn generate_keys(&self, private_key_path: &str) -> Result<GeneratedKeys, OperationError> {
        if !is_valid_file_path(private_key_path) {
            return Err(ValidationError::FilePath.into());
        }

        let pair = self
            .toolchain
            .generate_key_pair(Path::new(private_key_path))
            .await?;

        let public_key_pem = match self.toolchain.read_public_key(&pair.public_key).await {
            Ok(pem) => Some(pem),
            Err(err) => {
                warn!("{err}");
                None
            }
        };

        self.store
            .lock()
            .await
            .set(ConfigSection::Server, "private_key_path", private_key_path)?;
        Ok(GeneratedKeys {
            pair,
            public_key_pem,
        })
    }

    /// Registers the Aviator server and persists `server.url` and
    /// `server.tenant`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ServerUrl`] before spawning anything when `url` is
    /// not a URL; otherwise the `fcli` failure or the settings write.
    pub async fn configure_server(
        &self,
        url: &str,
        tenant: &str,
        private_key_path: &str,
    ) -> Result<String, OperationError> {
        if !is_valid_url(url) {
            return Err(ValidationError::ServerUrl.into());
        }

        let message = self
            .aviator
            .configure_server(url, tenant, private_key_path)
            .await?;
        info!("{message} ({url}, tenant {tenant})");

        let mut store = self.store.lock().await;
        store.set(ConfigSection::Server, "url", url)?;
        store.set(ConfigSection::Server, "tenant", tenant)?;
        Ok(message)
    }

    /// Mints a token into `token_file` and persists the file and email.
    ///
    /// # Errors
    ///
    /// [`ValidationError::Email`] before spawning anything when `email` is
    /// malformed; otherwise the `fcli` failure or the settings write.
    pub async fn generate_token(
        &self,
        email: &str,
        name: &str,
        token_file: &str,
    ) -> Result<String, OperationError> {
        if !is_valid_email(email) {
            return Err(ValidationError::Email.into());
        }

        let message = self.aviator.generate_token(email, name, token_file).await?;
        info!("{message} ({token_file})");

        let mut store = self.store.lock().await;
        store.set(ConfigSection::Tokens, "current_token_file", token_file)?;
        store.set(ConfigSection::Tokens, "token_email", email)?;
        Ok(message)
    }
}

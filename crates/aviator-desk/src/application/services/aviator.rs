//! `fcli aviator ...` operations.

use std::sync::Arc;

use aviator_core::{parse_aviator_apps, AviatorApp};
use tracing::{error, info};

use super::{run_checked, Programs, ServiceError};
use crate::application::ports::{CommandRunner, CommandSpec, AUDIT_TIMEOUT};

#[derive(Clone)]
pub struct AviatorService {
    runner: Arc<dyn CommandRunner>,
    programs: Programs,
}

impl AviatorService {
    pub fn new(runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self { runner, programs }
    }

    fn fcli(&self) -> CommandSpec {
        CommandSpec::new(&self.programs.fcli).arg("aviator")
    }

    /// `fcli aviator admin-config create --url U --tenant T --private-key K`
    pub async fn configure_server(
        &self,
        url: &str,
        tenant: &str,
        private_key: &str,
    ) -> Result<String, ServiceError> {
        let spec = self.fcli().args([
            "admin-config",
            "create",
            "--url",
            url,
            "--tenant",
            tenant,
            "--private-key",
            private_key,
        ]);
        run_checked(self.runner.as_ref(), spec, "Server configuration failed").await?;
        Ok("Server configured successfully!".to_string())
    }

    /// `fcli aviator token create --email E --name N --save-token F`
    pub async fn generate_token(
        &self,
        email: &str,
        name: &str,
        token_file: &str,
    ) -> Result<String, ServiceError> {
        let spec = self.fcli().args([
            "token",
            "create",
            "--email",
            email,
            "--name",
            name,
            "--save-token",
            token_file,
        ]);
        run_checked(self.runner.as_ref(), spec, "Token generation failed").await?;
        Ok("Token generated successfully!".to_string())
    }

    /// `fcli aviator session login --url U --token F`
    pub async fn login(&self, server_url: &str, token_file: &str) -> Result<String, ServiceError> {
        let spec = self
            .fcli()
            .args(["session", "login", "--url", server_url, "--token", token_file]);
        run_checked(self.runner.as_ref(), spec, "Aviator login failed").await?;
        Ok("Aviator login successful!".to_string())
    }

    /// `fcli aviator app create NAME`
    pub async fn create_app(&self, name: &str) -> Result<String, ServiceError> {
        let spec = self.fcli().args(["app", "create", name]);
        run_checked(self.runner.as_ref(), spec, "App creation failed").await?;
        Ok(format!("Aviator app '{name}' created!"))
    }

    /// `fcli aviator app list --output json`
    pub async fn list_apps(&self) -> Result<Vec<AviatorApp>, ServiceError> {
        let spec = self.fcli().args(["app", "list", "--output", "json"]);
        let stdout =
            run_checked(self.runner.as_ref(), spec, "Failed to list Aviator apps").await?;
        parse_aviator_apps(&stdout).map_err(|source| {
            error!("Aviator app list is not usable JSON: {source}");
            ServiceError::Parse {
                context: "Failed to parse Aviator apps response",
                source,
            }
        })
    }

    /// `fcli aviator ssc audit --av SSC_APP --app AVIATOR_APP`, returning raw
    /// stdout.  Runs under the long audit timeout.
    pub async fn run_audit(
        &self,
        ssc_app: &str,
        aviator_app: &str,
    ) -> Result<String, ServiceError> {
        info!("Starting audit: {ssc_app} -> {aviator_app}");
        let spec = self
            .fcli()
            .args(["ssc", "audit", "--av", ssc_app, "--app", aviator_app])
            .timeout(AUDIT_TIMEOUT);
        run_checked(self.runner.as_ref(), spec, "Audit failed").await
    }
}

//! `fcli ssc ...` operations.

use std::sync::Arc;

use aviator_core::{parse_ssc_app_versions, SscAppVersion};
use tracing::error;

use super::{run_checked, Programs, ServiceError};
use crate::application::ports::{CommandRunner, CommandSpec};

#[derive(Clone)]
pub struct SscService {
    runner: Arc<dyn CommandRunner>,
    programs: Programs,
}

impl SscService {
    pub fn new(runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self { runner, programs }
    }

    /// `fcli ssc session login --url U -u USER -p PASS`; the password never
    /// reaches the log.
    pub async fn login(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, ServiceError> {
        let spec = CommandSpec::new(&self.programs.fcli)
            .args(["ssc", "session", "login", "--url", url, "-u", username, "-p"])
            .sensitive_arg(password);
        run_checked(self.runner.as_ref(), spec, "SSC login failed").await?;
        Ok("SSC login successful!".to_string())
    }

    /// `fcli ssc appversion ls --output json`
    pub async fn list_app_versions(&self) -> Result<Vec<SscAppVersion>, ServiceError> {
        let spec = CommandSpec::new(&self.programs.fcli)
            .args(["ssc", "appversion", "ls", "--output", "json"]);
        let stdout = run_checked(self.runner.as_ref(), spec, "Failed to list SSC apps").await?;
        parse_ssc_app_versions(&stdout).map_err(|source| {
            error!("SSC app version list is not usable JSON: {source}");
            ServiceError::Parse {
                context: "Failed to parse SSC apps response",
                source,
            }
        })
    }
}

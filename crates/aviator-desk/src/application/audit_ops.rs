//! AuditOperations: sessions, application lists, mappings and audits.
//!
//! This use case backs everything after setup:
//!
//! - Logging into SSC (and remembering URL, user and session time) and into
//!   Aviator with a token file.
//! - Listing SSC application versions and Aviator applications, and creating
//!   new Aviator applications.
//! - Maintaining the `SSC app version -> Aviator app` mapping table, one pair
//!   at a time or in bulk from two selections.
//! - Running `fcli aviator ssc audit` for one mapping while a simulated
//!   progress ticker keeps the user informed.
//!
//! # Audit progress (for beginners)
//!
//! `fcli` gives no progress feedback while an audit runs, so the ticker simply
//! advances 10 % per interval.  It stops at 90 % and waits there; only the
//! real process exit moves the bar to 100 %.  A fast audit jumps straight to
//! 100 % without waiting for the ticker.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aviator_core::audit::{progress_message, progress_percent, PROGRESS_STEPS};
use aviator_core::validate::{is_valid_app_name, is_valid_url};
use aviator_core::{
    clean_audit_output, plan_bulk_mappings, AppMappings, AuditOutcome, AuditReport, AuditTarget,
    AviatorApp, ConfigSection, Selection, SscAppVersion, ValidationError,
};
use chrono::Local;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::ports::{CommandRunner, ProgressSink, SettingsStore};
use super::services::{AviatorService, Programs, ServiceError, SscService};
use super::OperationError;

/// Default pause between simulated progress steps.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A successful SSC login plus the automatic listing that follows it.
#[derive(Debug)]
pub struct SscSession {
    pub message: String,
    pub listing: Result<Vec<SscAppVersion>, ServiceError>,
}

/// A created Aviator application plus the refreshed list.
#[derive(Debug)]
pub struct CreatedApp {
    pub message: String,
    pub listing: Result<Vec<AviatorApp>, ServiceError>,
}

/// Mappings written by a bulk add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkMappingResult {
    pub added: Vec<(String, String)>,
}

impl BulkMappingResult {
    pub fn message(&self) -> String {
        if self.added.is_empty() {
            "No mappings were added".to_string()
        } else {
            format!("Added {} mappings", self.added.len())
        }
    }
}

/// `Loaded N SSC applications`
pub fn ssc_loaded_message(count: usize) -> String {
    format!("Loaded {count} SSC applications")
}

/// `Loaded N Aviator applications`
pub fn aviator_loaded_message(count: usize) -> String {
    format!("Loaded {count} Aviator applications")
}

pub struct AuditOperations<S> {
    store: Arc<Mutex<S>>,
    aviator: AviatorService,
    ssc: SscService,
    progress_interval: Duration,
}

impl<S: SettingsStore> AuditOperations<S> {
    pub fn new(store: Arc<Mutex<S>>, runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self {
            store,
            aviator: AviatorService::new(Arc::clone(&runner), programs.clone()),
            ssc: SscService::new(runner, programs),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Overrides the pause between simulated progress steps.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    /// Logs into SSC, persists the connection details and lists the
    /// application versions.
    ///
    /// A failed listing does not undo the login; it is returned alongside.
    ///
    /// # Errors
    ///
    /// [`ValidationError::SscUrl`] before spawning anything for a malformed
    /// URL, the login failure, or the settings write.
    pub async fn login_ssc(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<SscSession, OperationError> {
        if !is_valid_url(url) {
            return Err(ValidationError::SscUrl.into());
        }

        let message = self.ssc.login(url, username, password).await?;
        info!("{message} ({username}@{url})");
        {
            let mut store = self.store.lock().await;
            store.set(ConfigSection::Ssc, "url", url)?;
            store.set(ConfigSection::Ssc, "username", username)?;
            let now = Local::now().naive_local().format(SESSION_TIMESTAMP_FORMAT);
            store.set(ConfigSection::Ssc, "last_session", &now.to_string())?;
        }

        info!("Auto-listing SSC applications after successful login");
        let listing = self.ssc.list_app_versions().await;
        if let Err(err) = &listing {
            warn!("{err}");
        }
        Ok(SscSession { message, listing })
    }

    /// Logs into Aviator with `token_file`, or with the configured token file
    /// when `None`.  The server URL comes from the settings.
    ///
    /// # Errors
    ///
    /// [`ValidationError::TokenFile`] when the file does not exist, the login
    /// failure, or the settings write.
    pub async fn login_aviator(&self, token_file: Option<&str>) -> Result<String, OperationError> {
        let settings = self.store.lock().await.settings();
        let token_file = token_file
            .map(str::to_string)
            .unwrap_or(settings.tokens.current_token_file);

        if token_file.is_empty() || !Path::new(&token_file).exists() {
            return Err(ValidationError::TokenFile.into());
        }

        let message = self.aviator.login(&settings.server.url, &token_file).await?;
        info!("{message} ({})", settings.server.url);
        self.store
            .lock()
            .await
            .set(ConfigSection::Tokens, "current_token_file", &token_file)?;
        Ok(message)
    }

    // ── Applications ─────────────────────────────────────────────────────────

    /// Creates an Aviator application, then refreshes the Aviator list.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyAppName`] / [`ValidationError::AppName`]
    /// before spawning anything, or the creation failure.
    pub async fn create_aviator_app(&self, name: &str) -> Result<CreatedApp, OperationError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyAppName.into());
        }
        if !is_valid_app_name(name) {
            return Err(ValidationError::AppName.into());
        }

        let message = self.aviator.create_app(name).await?;
        info!("{message}");
        let listing = self.aviator.list_apps().await;
        Ok(CreatedApp { message, listing })
    }

    /// # Errors
    ///
    /// The listing or JSON parsing failure.
    pub async fn list_ssc_apps(&self) -> Result<Vec<SscAppVersion>, OperationError> {
        let apps = self.ssc.list_app_versions().await?;
        info!("{}", ssc_loaded_message(apps.len()));
        Ok(apps)
    }

    /// # Errors
    ///
    /// The listing or JSON parsing failure.
    pub async fn list_aviator_apps(&self) -> Result<Vec<AviatorApp>, OperationError> {
        let apps = self.aviator.list_apps().await?;
        info!("{}", aviator_loaded_message(apps.len()));
        Ok(apps)
    }

    // ── Mappings ─────────────────────────────────────────────────────────────

    /// Adds (or replaces) one mapping.
    ///
    /// # Errors
    ///
    /// [`ValidationError::IncompleteMapping`] when either side is blank, or
    /// the settings write.
    pub async fn add_mapping(&self, ssc_app: &str, aviator_app: &str) -> Result<String, OperationError> {
        let (ssc_app, aviator_app) = (ssc_app.trim(), aviator_app.trim());
        if ssc_app.is_empty() || aviator_app.is_empty() {
            return Err(ValidationError::IncompleteMapping.into());
        }

        self.store.lock().await.add_mapping(ssc_app, aviator_app)?;
        let message = format!("Mapping added: {ssc_app} → {aviator_app}");
        info!("{message}");
        Ok(message)
    }

    /// Adds the mappings planned from two selections.
    ///
    /// One Aviator application maps every SSC selection onto it; several are
    /// paired 1:1 in sorted order up to the shorter selection.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoSscSelection`] / [`ValidationError::NoAviatorSelection`]
    /// for empty selections, or the settings write.
    pub async fn add_bulk_mappings(
        &self,
        ssc: &Selection,
        aviator: &Selection,
    ) -> Result<BulkMappingResult, OperationError> {
        if ssc.is_empty() {
            return Err(ValidationError::NoSscSelection.into());
        }
        if aviator.is_empty() {
            return Err(ValidationError::NoAviatorSelection.into());
        }

        let planned = plan_bulk_mappings(ssc, aviator);
        let mut store = self.store.lock().await;
        for (source, target) in &planned {
            store.add_mapping(source, target)?;
        }
        drop(store);

        let result = BulkMappingResult { added: planned };
        info!("{}: {:?}", result.message(), result.added);
        Ok(result)
    }

    /// Removes the mapping for `ssc_app`; absent mappings are not an error.
    ///
    /// # Errors
    ///
    /// The settings write.
    pub async fn remove_mapping(&self, ssc_app: &str) -> Result<String, OperationError> {
        self.store.lock().await.remove_mapping(ssc_app)?;
        let message = format!("Mapping removed: {ssc_app}");
        info!("{message}");
        Ok(message)
    }

    /// All mappings in insertion order.
    pub async fn mappings(&self) -> AppMappings {
        self.store.lock().await.mappings()
    }

    // ── Audit ────────────────────────────────────────────────────────────────

    /// Resolves a picker selection to a stored mapping.
    ///
    /// `selection` is either the SSC side of a mapping or the table key
    /// `SSC|AVIATOR`.  An exact SSC match wins, so stored names containing
    /// `|` still resolve.  The table key form only resolves when SSC is
    /// stored and maps to AVIATOR.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoAuditMapping`] when no stored mapping matches.
    pub async fn resolve_target(&self, selection: &str) -> Result<AuditTarget, OperationError> {
        let mappings = self.mappings().await;
        if let Some(aviator_app) = mappings.get(selection) {
            return Ok(AuditTarget::new(selection, aviator_app));
        }
        let target: AuditTarget = selection.parse()?;
        if mappings.get(&target.ssc_app) == Some(target.aviator_app.as_str()) {
            Ok(target)
        } else {
            debug!("Audit selection {selection:?} does not match a stored mapping");
            Err(ValidationError::NoAuditMapping.into())
        }
    }

    /// Runs the audit for `target` and builds the report.
    ///
    /// A failed audit is a normal outcome recorded in the report, not an
    /// error.
    pub async fn run_audit(&self, target: AuditTarget, progress: &dyn ProgressSink) -> AuditReport {
        let started_at = Local::now().naive_local();
        info!("Audit started: {target}");

        let result = {
            let audit = self.aviator.run_audit(&target.ssc_app, &target.aviator_app);
            tokio::pin!(audit);
            let ticker = simulate_progress(progress, self.progress_interval);
            tokio::select! {
                result = &mut audit => result,
                () = ticker => audit.await,
            }
        };

        let outcome = match result {
            Ok(stdout) => {
                info!("Audit completed successfully: {target}");
                AuditOutcome::Completed(clean_audit_output(&stdout))
            }
            Err(err) => {
                error!("Audit failed: {target}: {err}");
                AuditOutcome::Failed(err.detail())
            }
        };
        progress.report(100, &progress_message(100));

        AuditReport {
            target,
            started_at,
            ended_at: Local::now().naive_local(),
            outcome,
        }
    }
}

/// Reports 0 % … 90 % one step per `interval`, then never completes.
async fn simulate_progress(progress: &dyn ProgressSink, interval: Duration) {
    for step in 0..PROGRESS_STEPS {
        let percent = progress_percent(step);
        progress.report(percent, &progress_message(percent));
        tokio::time::sleep(interval).await;
    }
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CommandOutput, MockCommandRunner, NoProgress};
    use crate::application::setup::tests::MemoryStore;
    use std::sync::Mutex as StdMutex;

    /// Records every progress report.
    #[derive(Default)]
    struct RecordingProgress {
        reports: StdMutex<Vec<(u8, String)>>,
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, percent: u8, message: &str) {
            if let Ok(mut reports) = self.reports.lock() {
                reports.push((percent, message.to_string()));
            }
        }
    }

    fn ops(mock: MockCommandRunner) -> (AuditOperations<MemoryStore>, Arc<Mutex<MemoryStore>>) {
        let store = Arc::new(Mutex::new(MemoryStore::new()));
        let ops = AuditOperations::new(Arc::clone(&store), Arc::new(mock), Programs::default())
            .with_progress_interval(Duration::from_millis(1));
        (ops, store)
    }

    #[tokio::test]
    async fn test_login_ssc_rejects_invalid_url() {
        let (ops, _store) = ops(MockCommandRunner::new());

        let err = ops.login_ssc("ssc.local", "admin", "pw").await.expect_err("must reject");

        assert_eq!(err.to_string(), "Please enter a valid SSC URL");
    }

    #[tokio::test]
    async fn test_login_ssc_persists_session_and_lists_versions() {
        // Arrange
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|spec| spec.args.starts_with(&["ssc".to_string(), "session".to_string()]))
            .times(1)
            .returning(|_| Ok(CommandOutput::ok("")));
        mock.expect_run()
            .withf(|spec| spec.args.starts_with(&["ssc".to_string(), "appversion".to_string()]))
            .times(1)
            .returning(|_| {
                Ok(CommandOutput::ok(
                    r#"[{"id":1,"name":"1.0","application":{"name":"Bank"}}]"#,
                ))
            });
        let (ops, store) = ops(mock);

        // Act
        let session = ops
            .login_ssc("https://ssc.example.com", "admin", "pw")
            .await
            .expect("logged in");

        // Assert
        assert_eq!(session.message, "SSC login successful!");
        assert_eq!(session.listing.expect("listed")[0].key(), "Bank:1.0");
        let settings = store.lock().await.settings();
        assert_eq!(settings.ssc.url, "https://ssc.example.com");
        assert_eq!(settings.ssc.username, "admin");
        assert!(chrono::NaiveDateTime::parse_from_str(
            &settings.ssc.last_session,
            SESSION_TIMESTAMP_FORMAT
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_login_aviator_requires_existing_token_file() {
        let (ops, _store) = ops(MockCommandRunner::new());

        let err = ops
            .login_aviator(Some("/definitely/missing/token.json"))
            .await
            .expect_err("must reject");

        assert_eq!(err.to_string(), "Please select a valid token file");
    }

    #[tokio::test]
    async fn test_login_aviator_uses_configured_server_url() {
        // Arrange
        let token = tempfile::NamedTempFile::new().expect("token file");
        let token_path = token.path().to_string_lossy().into_owned();
        let expected_token = token_path.clone();
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(move |spec| {
                spec.args
                    == [
                        "aviator",
                        "session",
                        "login",
                        "--url",
                        "https://aviator.example.com",
                        "--token",
                        expected_token.as_str(),
                    ]
            })
            .returning(|_| Ok(CommandOutput::ok("")));
        let (ops, store) = ops(mock);
        store
            .lock()
            .await
            .set(ConfigSection::Server, "url", "https://aviator.example.com")
            .expect("set");

        // Act
        let message = ops.login_aviator(Some(&token_path)).await.expect("login");

        // Assert
        assert_eq!(message, "Aviator login successful!");
        assert_eq!(
            store.lock().await.settings().tokens.current_token_file,
            token_path
        );
    }

    #[tokio::test]
    async fn test_create_app_validates_name_before_spawning() {
        let (ops, _store) = ops(MockCommandRunner::new());

        let empty = ops.create_aviator_app("").await.expect_err("empty");
        let invalid = ops.create_aviator_app("web/goat").await.expect_err("invalid");

        assert_eq!(empty.to_string(), "Please enter an app name");
        assert_eq!(invalid.to_string(), "Invalid app name format");
    }

    #[tokio::test]
    async fn test_create_app_refreshes_listing() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|spec| spec.args.get(2).map(String::as_str) == Some("create"))
            .returning(|_| Ok(CommandOutput::ok("")));
        mock.expect_run()
            .withf(|spec| spec.args.get(2).map(String::as_str) == Some("list"))
            .returning(|_| Ok(CommandOutput::ok(r#"[{"name":"new app","id":"a1"}]"#)));
        let (ops, _store) = ops(mock);

        let created = ops.create_aviator_app("new app").await.expect("created");

        assert_eq!(created.message, "Aviator app 'new app' created!");
        assert_eq!(created.listing.expect("listed").len(), 1);
    }

    #[tokio::test]
    async fn test_add_mapping_requires_both_sides() {
        let (ops, _store) = ops(MockCommandRunner::new());

        let err = ops.add_mapping("App:1", "  ").await.expect_err("must reject");

        assert_eq!(err.to_string(), "Please select both SSC and Aviator applications");
    }

    #[tokio::test]
    async fn test_add_bulk_mappings_maps_everything_onto_single_target() {
        // Arrange
        let (ops, _store) = ops(MockCommandRunner::new());
        let ssc: Selection = ["B:1", "A:1", "C:1"].into_iter().collect();
        let aviator: Selection = ["shared"].into_iter().collect();

        // Act
        let result = ops.add_bulk_mappings(&ssc, &aviator).await.expect("added");

        // Assert
        assert_eq!(result.message(), "Added 3 mappings");
        let mappings = ops.mappings().await;
        assert_eq!(mappings.get("A:1"), Some("shared"));
        assert_eq!(mappings.get("C:1"), Some("shared"));
    }

    #[tokio::test]
    async fn test_add_bulk_mappings_rejects_empty_selection() {
        let (ops, _store) = ops(MockCommandRunner::new());
        let some: Selection = ["x"].into_iter().collect();

        let no_ssc = ops
            .add_bulk_mappings(&Selection::new(), &some)
            .await
            .expect_err("no ssc");
        let no_aviator = ops
            .add_bulk_mappings(&some, &Selection::new())
            .await
            .expect_err("no aviator");

        assert_eq!(no_ssc.to_string(), "Please select at least one SSC application");
        assert_eq!(
            no_aviator.to_string(),
            "Please select at least one Aviator application"
        );
    }

    #[tokio::test]
    async fn test_remove_mapping_reports_even_when_absent() {
        let (ops, _store) = ops(MockCommandRunner::new());

        let message = ops.remove_mapping("Ghost:1").await.expect("removed");

        assert_eq!(message, "Mapping removed: Ghost:1");
    }

    #[tokio::test]
    async fn test_resolve_target_requires_stored_mapping() {
        let (ops, _store) = ops(MockCommandRunner::new());
        ops.add_mapping("App:1", "app").await.expect("added");

        let target = ops.resolve_target("App:1").await.expect("resolved");
        let missing = ops.resolve_target("Other:1").await.expect_err("missing");

        assert_eq!(target, AuditTarget::new("App:1", "app"));
        assert_eq!(missing.to_string(), "Please select a mapping for audit");
    }

    #[tokio::test]
    async fn test_resolve_target_checks_table_key_against_store() {
        // Arrange
        let (ops, _store) = ops(MockCommandRunner::new());
        ops.add_mapping("App:1", "app").await.expect("added");

        // Act
        let stored = ops.resolve_target("App:1|app").await.expect("resolved");
        let unstored = ops.resolve_target("Other:1|other").await.expect_err("unstored");
        let mismatched = ops.resolve_target("App:1|elsewhere").await.expect_err("mismatched");

        // Assert
        assert_eq!(stored, AuditTarget::new("App:1", "app"));
        assert_eq!(unstored.to_string(), "Please select a mapping for audit");
        assert_eq!(mismatched.to_string(), "Please select a mapping for audit");
    }

    #[tokio::test]
    async fn test_resolve_target_handles_stored_name_with_pipe() {
        let (ops, _store) = ops(MockCommandRunner::new());
        ops.add_mapping("Tools|Legacy:1", "legacy").await.expect("added");

        let bare = ops.resolve_target("Tools|Legacy:1").await.expect("bare name");
        let keyed = ops.resolve_target("Tools|Legacy:1|legacy").await.expect("table key");

        assert_eq!(bare, AuditTarget::new("Tools|Legacy:1", "legacy"));
        assert_eq!(keyed, bare);
    }

    #[tokio::test]
    async fn test_run_audit_cleans_output_and_ends_at_full_progress() {
        // Arrange
        let mut mock = MockCommandRunner::new();
        mock.expect_run().returning(|_| {
            Ok(CommandOutput::ok(
                "[DEBUG] connecting\n42%\nTotal findings: 3\nCritical: 1\n",
            ))
        });
        let (ops, _store) = ops(mock);
        let progress = RecordingProgress::default();

        // Act
        let report = ops
            .run_audit(AuditTarget::new("App:1", "app"), &progress)
            .await;

        // Assert
        assert_eq!(
            report.outcome,
            AuditOutcome::Completed("Total findings: 3\nCritical: 1".to_string())
        );
        let reports = progress.reports.lock().expect("lock");
        assert_eq!(
            reports.last(),
            Some(&(100, "Finalizing report...".to_string()))
        );
        assert!(reports.iter().all(|(p, _)| *p == 100 || *p <= 90));
    }

    #[tokio::test]
    async fn test_run_audit_failure_keeps_raw_stderr() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .returning(|_| Ok(CommandOutput::failed(1, "[ERROR] not logged in\n")));
        let (ops, _store) = ops(mock);

        let report = ops
            .run_audit(AuditTarget::new("App:1", "app"), &NoProgress)
            .await;

        assert_eq!(
            report.outcome,
            AuditOutcome::Failed("[ERROR] not logged in\n".to_string())
        );
        assert!(report.render().contains("=== ERROR DETAILS ==="));
    }
}

//! Presentation bridge: exposes the use cases to a front end.
//!
//! Every user action is an `async fn` taking the shared [`AppState`] and
//! returning a [`CommandResult`].  The terminal front end in `cli` is the
//! current consumer; a native window could call the same functions.  This
//! module must NOT be imported by the application or domain layers.
//!
//! # `CommandResult<T>` wrapper
//!
//! All actions return `CommandResult<T>` rather than `Result<T, E>`.  Every
//! response has the same shape:
//! `{ success: bool, data: T | null, error: string | null, status: {...} }`.
//! `status` is the timestamped line the front end shows next to the action,
//! with a severity that picks its colour.
//!
//! # Data Transfer Objects (DTOs)
//!
//! The DTOs below are flat, serialisable views of the domain records: SSC
//! versions carry their `name:version` key, mappings become named pairs and
//! paths become strings.
//!
//! # Background actions (for beginners)
//!
//! A front end must never freeze while `fcli` runs.  [`spawn_action`] runs an
//! action future on its own Tokio task and sends the result through an `mpsc`
//! channel; the front end keeps reading user input and prints results as they
//! arrive.  Actions can overlap freely; there is no cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aviator_core::{
    AppMappings, AuditReport, AviatorApp, Selection, Settings, Severity,
    SscAppVersion, StatusLine,
};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::application::audit_ops::{
    aviator_loaded_message, ssc_loaded_message, AuditOperations, DEFAULT_PROGRESS_INTERVAL,
};
use crate::application::ports::{CommandRunner, ProgressSink, SettingsStore};
use crate::application::services::Programs;
use crate::application::setup::{PrerequisiteReport, SetupUseCase};
use crate::application::OperationError;
use crate::infrastructure::storage::config::ConfigStore;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared by every action.
///
/// The config store sits behind an async Tokio mutex: actions run on
/// separate tasks and their settings writes must not interleave.
pub struct AppState {
    pub config: Arc<Mutex<ConfigStore>>,
    runner: Arc<dyn CommandRunner>,
    programs: Programs,
    progress_interval: Duration,
}

impl AppState {
    pub fn new(config: ConfigStore, runner: Arc<dyn CommandRunner>, programs: Programs) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            runner,
            programs,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Overrides the pause between simulated audit progress steps.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn setup(&self) -> SetupUseCase<ConfigStore> {
        SetupUseCase::new(
            Arc::clone(&self.config),
            Arc::clone(&self.runner),
            self.programs.clone(),
        )
    }

    pub fn audit_ops(&self) -> AuditOperations<ConfigStore> {
        AuditOperations::new(
            Arc::clone(&self.config),
            Arc::clone(&self.runner),
            self.programs.clone(),
        )
        .with_progress_interval(self.progress_interval)
    }
}

// ── Data Transfer Objects (Presentation layer) ────────────────────────────────

/// One SSC application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SscAppDto {
    /// `application:version`, the mapping key.
    pub key: String,
    pub application: String,
    pub version: String,
    pub id: String,
}

impl From<&SscAppVersion> for SscAppDto {
    fn from(v: &SscAppVersion) -> Self {
        Self {
            key: v.key(),
            application: v.application.clone(),
            version: v.version.clone(),
            id: v.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AviatorAppDto {
    pub name: String,
    pub id: String,
}

impl From<&AviatorApp> for AviatorAppDto {
    fn from(a: &AviatorApp) -> Self {
        Self {
            name: a.name.clone(),
            id: a.id.clone(),
        }
    }
}

/// One row of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingDto {
    pub ssc_app: String,
    pub aviator_app: String,
}

impl MappingDto {
    fn table(mappings: &AppMappings) -> Vec<Self> {
        mappings
            .iter()
            .map(|(s, a)| Self {
                ssc_app: s.to_string(),
                aviator_app: a.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPairDto {
    pub private_key: String,
    pub public_key: String,
    /// PEM text of the public key; `None` when it could not be read back.
    pub public_key_pem: Option<String>,
}

/// SSC login result with the automatic listing that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SscLoginDto {
    pub apps: Vec<SscAppDto>,
    /// Set when the login worked but the listing did not.
    pub listing_error: Option<String>,
}

/// Aviator app creation result with the refreshed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedAppDto {
    pub apps: Vec<AviatorAppDto>,
    pub listing_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReportDto {
    pub success: bool,
    pub ssc_app: String,
    pub aviator_app: String,
    /// The report exactly as shown in the results pane.
    pub text: String,
}

impl From<&AuditReport> for AuditReportDto {
    fn from(r: &AuditReport) -> Self {
        Self {
            success: r.outcome.is_success(),
            ssc_app: r.target.ssc_app.clone(),
            aviator_app: r.target.aviator_app.clone(),
            text: r.render(),
        }
    }
}

/// The settings snapshot plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsDto {
    pub path: String,
    pub settings: Settings,
}

/// Unified response wrapper used by every action.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub status: StatusLine,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: StatusLine::success(message),
        }
    }

    /// Success that deserves the user's attention.
    pub fn warning(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: StatusLine::warning(message),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            success: false,
            data: None,
            status: StatusLine::error(msg.clone()),
            error: Some(msg),
        }
    }

    /// A failure that still carries data, e.g. a failed audit report.
    pub fn failed_with(data: T, msg: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            ..Self::err(msg)
        }
    }
}

impl<T: Serialize> From<OperationError> for CommandResult<T> {
    fn from(err: OperationError) -> Self {
        Self::err(err.to_string())
    }
}

// ── Background execution ──────────────────────────────────────────────────────

/// Runs `action` on a Tokio task and sends its output to `results`.
///
/// A closed receiver is not an error: the front end has gone away.
pub fn spawn_action<T, F>(action: F, results: mpsc::UnboundedSender<T>) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    tokio::spawn(async move {
        let output = action.await;
        if results.send(output).is_err() {
            debug!("action finished after the front end closed its channel");
        }
    })
}

// ── Setup actions ─────────────────────────────────────────────────────────────

/// Probes `fcli` and `openssl`.  Fails only when neither is usable.
pub async fn check_prerequisites(state: Arc<AppState>) -> CommandResult<PrerequisiteReport> {
    let report = state.setup().check_prerequisites().await;
    let message = report.message();
    match report.severity() {
        Severity::Success => CommandResult::ok(report, message),
        Severity::Error => CommandResult::failed_with(report, message),
        _ => CommandResult::warning(report, message),
    }
}

pub async fn generate_keys(state: Arc<AppState>, private_key_path: String) -> CommandResult<KeyPairDto> {
    match state.setup().generate_keys(&private_key_path).await {
        Ok(keys) => {
            let message = keys.pair.message();
            CommandResult::ok(
                KeyPairDto {
                    private_key: keys.pair.private_key.to_string_lossy().into_owned(),
                    public_key: keys.pair.public_key.to_string_lossy().into_owned(),
                    public_key_pem: keys.public_key_pem,
                },
                message,
            )
        }
        Err(e) => e.into(),
    }
}

pub async fn configure_server(
    state: Arc<AppState>,
    url: String,
    tenant: String,
    private_key_path: String,
) -> CommandResult<()> {
    match state
        .setup()
        .configure_server(&url, &tenant, &private_key_path)
        .await
    {
        Ok(message) => CommandResult::ok((), message),
        Err(e) => e.into(),
    }
}

pub async fn generate_token(
    state: Arc<AppState>,
    email: String,
    name: String,
    token_file: String,
) -> CommandResult<()> {
    match state.setup().generate_token(&email, &name, &token_file).await {
        Ok(message) => CommandResult::ok((), message),
        Err(e) => e.into(),
    }
}

// ── Session actions ───────────────────────────────────────────────────────────

pub async fn login_ssc(
    state: Arc<AppState>,
    url: String,
    username: String,
    password: String,
) -> CommandResult<SscLoginDto> {
    match state.audit_ops().login_ssc(&url, &username, &password).await {
        Ok(session) => match session.listing {
            Ok(apps) => CommandResult::ok(
                SscLoginDto {
                    apps: apps.iter().map(SscAppDto::from).collect(),
                    listing_error: None,
                },
                format!("{} {}", session.message, ssc_loaded_message(apps.len())),
            ),
            Err(e) => CommandResult::warning(
                SscLoginDto {
                    apps: Vec::new(),
                    listing_error: Some(e.to_string()),
                },
                format!("{} {e}", session.message),
            ),
        },
        Err(e) => e.into(),
    }
}

/// Logs into Aviator; `None` uses the configured token file.
pub async fn login_aviator(state: Arc<AppState>, token_file: Option<String>) -> CommandResult<()> {
    match state.audit_ops().login_aviator(token_file.as_deref()).await {
        Ok(message) => CommandResult::ok((), message),
        Err(e) => e.into(),
    }
}

// ── Application actions ───────────────────────────────────────────────────────

/// Lists SSC application versions, optionally filtered by `search`.
///
/// The status counts every loaded version, not just the filtered ones.
pub async fn list_ssc_apps(state: Arc<AppState>, search: Option<String>) -> CommandResult<Vec<SscAppDto>> {
    match state.audit_ops().list_ssc_apps().await {
        Ok(apps) => {
            let term = search.unwrap_or_default();
            let shown = apps
                .iter()
                .filter(|a| a.matches(&term))
                .map(SscAppDto::from)
                .collect();
            CommandResult::ok(shown, ssc_loaded_message(apps.len()))
        }
        Err(e) => e.into(),
    }
}

/// Lists Aviator applications, optionally filtered by `search`.
pub async fn list_aviator_apps(
    state: Arc<AppState>,
    search: Option<String>,
) -> CommandResult<Vec<AviatorAppDto>> {
    match state.audit_ops().list_aviator_apps().await {
        Ok(apps) => {
            let term = search.unwrap_or_default();
            let shown = apps
                .iter()
                .filter(|a| a.matches(&term))
                .map(AviatorAppDto::from)
                .collect();
            CommandResult::ok(shown, aviator_loaded_message(apps.len()))
        }
        Err(e) => e.into(),
    }
}

pub async fn create_aviator_app(state: Arc<AppState>, name: String) -> CommandResult<CreatedAppDto> {
    match state.audit_ops().create_aviator_app(&name).await {
        Ok(created) => match created.listing {
            Ok(apps) => CommandResult::ok(
                CreatedAppDto {
                    apps: apps.iter().map(AviatorAppDto::from).collect(),
                    listing_error: None,
                },
                created.message,
            ),
            Err(e) => CommandResult::warning(
                CreatedAppDto {
                    apps: Vec::new(),
                    listing_error: Some(e.to_string()),
                },
                format!("{} {e}", created.message),
            ),
        },
        Err(e) => e.into(),
    }
}

// ── Mapping actions ───────────────────────────────────────────────────────────

/// Returns the whole mapping table after adding one pair.
pub async fn add_mapping(
    state: Arc<AppState>,
    ssc_app: String,
    aviator_app: String,
) -> CommandResult<Vec<MappingDto>> {
    let ops = state.audit_ops();
    match ops.add_mapping(&ssc_app, &aviator_app).await {
        Ok(message) => CommandResult::ok(MappingDto::table(&ops.mappings().await), message),
        Err(e) => e.into(),
    }
}

/// Adds the mappings planned from two selections.
pub async fn add_bulk_mappings(
    state: Arc<AppState>,
    ssc_apps: Vec<String>,
    aviator_apps: Vec<String>,
) -> CommandResult<Vec<MappingDto>> {
    let ssc: Selection = ssc_apps.into_iter().collect();
    let aviator: Selection = aviator_apps.into_iter().collect();
    let ops = state.audit_ops();
    match ops.add_bulk_mappings(&ssc, &aviator).await {
        Ok(result) => {
            let table = MappingDto::table(&ops.mappings().await);
            if result.added.is_empty() {
                CommandResult::warning(table, result.message())
            } else {
                CommandResult::ok(table, result.message())
            }
        }
        Err(e) => e.into(),
    }
}

pub async fn remove_mapping(state: Arc<AppState>, ssc_app: String) -> CommandResult<Vec<MappingDto>> {
    let ops = state.audit_ops();
    match ops.remove_mapping(&ssc_app).await {
        Ok(message) => CommandResult::ok(MappingDto::table(&ops.mappings().await), message),
        Err(e) => e.into(),
    }
}

pub async fn get_mappings(state: Arc<AppState>) -> CommandResult<Vec<MappingDto>> {
    let mappings = state.audit_ops().mappings().await;
    let message = format!("{} mappings", mappings.len());
    CommandResult::ok(MappingDto::table(&mappings), message)
}

// ── Audit actions ─────────────────────────────────────────────────────────────

/// Runs an audit.
///
/// `mapping` is either a table key `SSC|AVIATOR` or the SSC side of a stored
/// mapping; both must match a stored mapping.
pub async fn run_audit(
    state: Arc<AppState>,
    mapping: String,
    progress: Arc<dyn ProgressSink>,
) -> CommandResult<AuditReportDto> {
    let ops = state.audit_ops();
    let target = match ops.resolve_target(&mapping).await {
        Ok(target) => target,
        Err(e) => return e.into(),
    };

    let report = ops.run_audit(target, progress.as_ref()).await;
    let dto = AuditReportDto::from(&report);
    if dto.success {
        CommandResult::ok(dto, "Audit completed successfully!")
    } else {
        CommandResult::failed_with(dto, "Audit failed")
    }
}

// ── Settings actions ──────────────────────────────────────────────────────────

pub async fn get_settings(state: Arc<AppState>) -> CommandResult<SettingsDto> {
    let config = state.config.lock().await;
    let dto = SettingsDto {
        path: config.path().display().to_string(),
        settings: config.settings(),
    };
    CommandResult::ok(dto, format!("Configuration at {}", config.path().display()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NoProgress;
    use crate::infrastructure::process::{Reply, ScriptedRunner};
    use tempfile::TempDir;

    /// Creates an AppState backed by a temporary config file.
    fn make_state(runner: ScriptedRunner) -> (Arc<AppState>, TempDir) {
        make_state_with(Arc::new(runner))
    }

    fn make_state_with(runner: Arc<ScriptedRunner>) -> (Arc<AppState>, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = ConfigStore::open(dir.path().join("config.ini")).expect("config");
        let state = AppState::new(store, runner, Programs::default())
            .with_progress_interval(Duration::from_millis(1));
        (Arc::new(state), dir)
    }

    #[tokio::test]
    async fn test_command_result_error_shape() {
        let result: CommandResult<()> = CommandResult::err("boom");

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.status.severity, Severity::Error);
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["status"]["severity"], "error");
    }

    #[tokio::test]
    async fn test_check_prerequisites_fails_when_nothing_installed() {
        let (state, _dir) = make_state(ScriptedRunner::new());

        let result = check_prerequisites(state).await;

        assert!(!result.success);
        assert!(result.status.message.starts_with("✗ FCLI: FCLI not found."));
    }

    #[tokio::test]
    async fn test_list_ssc_apps_filters_but_counts_all() {
        // Arrange
        let runner = ScriptedRunner::new().on(
            "fcli",
            &["ssc", "appversion", "ls"],
            Reply::stdout(
                r#"[{"id":1,"name":"1.0","application":{"name":"Bank"}},
                    {"id":2,"name":"2.0","application":{"name":"Shop"}}]"#,
            ),
        );
        let (state, _dir) = make_state(runner);

        // Act
        let result = list_ssc_apps(state, Some("bank".to_string())).await;

        // Assert
        assert!(result.success);
        assert_eq!(result.status.message, "Loaded 2 SSC applications");
        let apps = result.data.expect("data");
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].key, "Bank:1.0");
    }

    #[tokio::test]
    async fn test_bulk_mapping_returns_updated_table() {
        let (state, _dir) = make_state(ScriptedRunner::new());

        let result = add_bulk_mappings(
            state,
            vec!["B:1".to_string(), "A:1".to_string()],
            vec!["y".to_string(), "x".to_string(), "z".to_string()],
        )
        .await;

        assert_eq!(result.status.message, "Added 2 mappings");
        assert_eq!(
            result.data.expect("table"),
            vec![
                MappingDto {
                    ssc_app: "A:1".to_string(),
                    aviator_app: "x".to_string()
                },
                MappingDto {
                    ssc_app: "B:1".to_string(),
                    aviator_app: "y".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_run_audit_accepts_table_key() {
        // Arrange
        let runner = ScriptedRunner::new().on(
            "fcli",
            &["aviator", "ssc", "audit"],
            Reply::stdout("Summary: 0 issues\n"),
        );
        let (state, _dir) = make_state(runner);
        add_mapping(Arc::clone(&state), "App:1".to_string(), "app".to_string()).await;

        // Act
        let result = run_audit(state, "App:1|app".to_string(), Arc::new(NoProgress)).await;

        // Assert
        assert!(result.success);
        let report = result.data.expect("report");
        assert!(report.text.contains("=== AUDIT OUTPUT ===\nSummary: 0 issues"));
        assert_eq!(report.aviator_app, "app");
    }

    #[tokio::test]
    async fn test_run_audit_unknown_mapping_is_rejected() {
        let (state, _dir) = make_state(ScriptedRunner::new());

        let result = run_audit(state, "Nope:1".to_string(), Arc::new(NoProgress)).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Please select a mapping for audit"));
    }

    #[tokio::test]
    async fn test_run_audit_rejects_table_key_not_in_store() {
        // Arrange
        let runner = Arc::new(ScriptedRunner::new());
        let (state, _dir) = make_state_with(Arc::clone(&runner));
        add_mapping(Arc::clone(&state), "App:1".to_string(), "app".to_string()).await;

        // Act
        let unstored = run_audit(
            Arc::clone(&state),
            "Other:1|other".to_string(),
            Arc::new(NoProgress),
        )
        .await;
        let mismatched =
            run_audit(state, "App:1|elsewhere".to_string(), Arc::new(NoProgress)).await;

        // Assert
        assert_eq!(unstored.error.as_deref(), Some("Please select a mapping for audit"));
        assert_eq!(mismatched.error.as_deref(), Some("Please select a mapping for audit"));
        assert!(runner.calls().is_empty(), "no audit may be started");
    }

    #[tokio::test]
    async fn test_spawn_action_delivers_result() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_action(async { 41 + 1 }, tx);

        assert_eq!(rx.recv().await, Some(42));
    }
}

//! Integration tests for the full user workflow.
//!
//! These tests drive the presentation bridge end-to-end: `AppState` + the
//! use cases + a real `ConfigStore` on disk, with `fcli`/`openssl` replaced by
//! a `ScriptedRunner`.

use std::sync::Arc;
use std::time::Duration;

use aviator_desk::application::ports::{NoProgress, SettingsStore};
use aviator_desk::application::services::Programs;
use aviator_desk::infrastructure::process::{Reply, ScriptedRunner};
use aviator_desk::infrastructure::storage::config::ConfigStore;
use aviator_desk::infrastructure::ui_bridge::{self, AppState};
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn scripted_tools() -> ScriptedRunner {
    ScriptedRunner::new()
        .on("fcli", &["--version"], Reply::stdout("fcli version 3.6.0, built 2025-01-10\n"))
        .on("openssl", &["version"], Reply::stdout("OpenSSL 3.0.13 30 Jan 2024\n"))
        .on("fcli", &["aviator", "admin-config", "create"], Reply::stdout(""))
        .on("fcli", &["aviator", "token", "create"], Reply::stdout(""))
        .on("fcli", &["aviator", "session", "login"], Reply::stdout(""))
        .on("fcli", &["ssc", "session", "login"], Reply::stdout(""))
        .on(
            "fcli",
            &["ssc", "appversion", "ls"],
            Reply::stdout(
                r#"[{"id":10,"name":"main","application":{"name":"WebGoat"}},
                    {"id":11,"name":"2.0","application":{"name":"Juice Shop"}}]"#,
            ),
        )
        .on(
            "fcli",
            &["aviator", "app", "list"],
            Reply::stdout(r#"[{"name":"webgoat","id":"av-1"}]"#),
        )
        .on(
            "fcli",
            &["aviator", "ssc", "audit"],
            Reply::stdout("[DEBUG] fetching issues\nAudit complete\n\nIssues audited: 12\n"),
        )
}

fn make_state(dir: &TempDir, runner: Arc<ScriptedRunner>) -> Arc<AppState> {
    let store = ConfigStore::open(dir.path().join("config.ini")).expect("config must open");
    Arc::new(
        AppState::new(store, runner, Programs::default())
            .with_progress_interval(Duration::from_millis(1)),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_setup_login_map_and_audit_end_to_end() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let runner = Arc::new(scripted_tools());
    let state = make_state(&dir, Arc::clone(&runner));
    let token_file = dir.path().join("aviator.token");
    let token_file = token_file.to_string_lossy().into_owned();

    // Act / Assert: prerequisites
    let check = ui_bridge::check_prerequisites(Arc::clone(&state)).await;
    assert!(check.success, "prerequisites: {:?}", check.status);

    // Act / Assert: server and token
    let configured = ui_bridge::configure_server(
        Arc::clone(&state),
        "https://aviator.example.com".to_string(),
        "acme".to_string(),
        "./private_key.pem".to_string(),
    )
    .await;
    assert!(configured.success, "configure: {:?}", configured.error);

    let token = ui_bridge::generate_token(
        Arc::clone(&state),
        "dev@example.com".to_string(),
        "aviator_token".to_string(),
        token_file.clone(),
    )
    .await;
    assert!(token.success, "token: {:?}", token.error);
    // The scripted fcli does not write the token; the real one would.
    std::fs::write(&token_file, "token").expect("write token");

    // Act / Assert: sessions
    let ssc = ui_bridge::login_ssc(
        Arc::clone(&state),
        "https://ssc.example.com".to_string(),
        "admin".to_string(),
        "s3cret".to_string(),
    )
    .await;
    assert!(ssc.success, "ssc login: {:?}", ssc.error);
    let ssc_apps = ssc.data.expect("login data").apps;
    assert_eq!(ssc_apps.len(), 2);

    let aviator = ui_bridge::login_aviator(Arc::clone(&state), None).await;
    assert!(aviator.success, "aviator login: {:?}", aviator.error);

    // Act / Assert: mapping and audit
    let mapped = ui_bridge::add_mapping(
        Arc::clone(&state),
        "WebGoat:main".to_string(),
        "webgoat".to_string(),
    )
    .await;
    assert_eq!(mapped.status.message, "Mapping added: WebGoat:main → webgoat");

    let audit =
        ui_bridge::run_audit(Arc::clone(&state), "WebGoat:main".to_string(), Arc::new(NoProgress))
            .await;
    assert!(audit.success, "audit: {:?}", audit.error);
    let report = audit.data.expect("report");
    assert!(report.text.contains("Audit complete\nIssues audited: 12"));
    assert!(!report.text.contains("[DEBUG]"), "debug chatter must be filtered");

    // Assert: the Aviator login used the saved server URL and token file
    let lines = runner.call_lines();
    assert!(lines.contains(&format!(
        "fcli aviator session login --url https://aviator.example.com --token {token_file}"
    )));
}

#[tokio::test]
async fn test_settings_survive_a_restart() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let state = make_state(&dir, Arc::new(scripted_tools()));

    // Act
    let login = ui_bridge::login_ssc(
        Arc::clone(&state),
        "https://ssc.example.com".to_string(),
        "admin".to_string(),
        "s3cret".to_string(),
    )
    .await;
    let bulk = ui_bridge::add_bulk_mappings(
        Arc::clone(&state),
        vec!["WebGoat:main".to_string(), "Juice Shop:2.0".to_string()],
        vec!["webgoat".to_string()],
    )
    .await;
    drop(state);

    // Assert
    assert!(login.success);
    assert_eq!(bulk.status.message, "Added 2 mappings");
    let reopened = ConfigStore::open(dir.path().join("config.ini")).expect("reopen");
    let settings = reopened.settings();
    assert_eq!(settings.ssc.url, "https://ssc.example.com");
    assert_eq!(settings.ssc.username, "admin");
    assert!(!settings.ssc.last_session.is_empty());
    assert_eq!(settings.mappings.get("Juice Shop:2.0"), Some("webgoat"));
    assert_eq!(settings.mappings.get("WebGoat:main"), Some("webgoat"));
}

#[tokio::test]
async fn test_password_never_reaches_command_log() {
    let dir = TempDir::new().expect("tempdir");
    let runner = Arc::new(scripted_tools());
    let state = make_state(&dir, Arc::clone(&runner));

    let _ = ui_bridge::login_ssc(
        state,
        "https://ssc.example.com".to_string(),
        "admin".to_string(),
        "s3cret".to_string(),
    )
    .await;

    let lines = runner.call_lines();
    assert!(lines.iter().all(|line| !line.contains("s3cret")));
    assert!(lines
        .iter()
        .any(|line| line.ends_with("-u admin -p ********")));
    // The runner itself still receives the real password.
    assert!(runner
        .calls()
        .iter()
        .any(|spec| spec.args.iter().any(|a| a == "s3cret")));
}

#[tokio::test]
async fn test_audit_failure_is_reported_with_details() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let runner = ScriptedRunner::new().on(
        "fcli",
        &["aviator", "ssc", "audit"],
        Reply::failure(1, "Not logged in to Aviator\n"),
    );
    let state = make_state(&dir, Arc::new(runner));
    ui_bridge::add_mapping(
        Arc::clone(&state),
        "WebGoat:main".to_string(),
        "webgoat".to_string(),
    )
    .await;

    // Act
    let result =
        ui_bridge::run_audit(state, "WebGoat:main|webgoat".to_string(), Arc::new(NoProgress)).await;

    // Assert
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Audit failed"));
    let report = result.data.expect("failed audits still carry a report");
    assert!(report.text.contains("=== ERROR DETAILS ===\nNot logged in to Aviator"));
}

#[tokio::test]
async fn test_missing_fcli_blocks_nothing_but_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let runner = ScriptedRunner::new().on("openssl", &["version"], Reply::stdout("OpenSSL 3.0.13\n"));
    let state = make_state(&dir, Arc::new(runner));

    let check = ui_bridge::check_prerequisites(Arc::clone(&state)).await;
    let mappings = ui_bridge::get_mappings(state).await;

    assert!(check.success, "openssl alone is a warning, not an error");
    assert!(check.status.message.contains("✗ FCLI"));
    assert!(mappings.success);
}

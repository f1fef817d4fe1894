//! Application records parsed from `fcli` JSON output.
//!
//! `fcli ssc appversion ls --output json` returns one object per application
//! *version*:
//!
//! ```json
//! [{ "id": 10042, "name": "2023.1", "application": { "name": "WebGoat" } }]
//! ```
//!
//! `fcli aviator app list --output json` returns one object per application:
//!
//! ```json
//! [{ "id": "7f3c", "name": "webgoat" }]
//! ```
//!
//! Both payloads are parsed leniently: a missing field becomes `"Unknown"` and
//! numeric ids are rendered as strings.  Only a payload that is not valid JSON,
//! or not a JSON array, is rejected.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Placeholder for fields absent from the JSON payload.
pub const UNKNOWN: &str = "Unknown";

/// The list payload could not be interpreted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array, got {0}")]
    NotAnArray(&'static str),
}

/// One SSC application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SscAppVersion {
    /// Parent application name (`application.name`).
    pub application: String,
    /// Version name (`name`).
    pub version: String,
    pub id: String,
}

impl SscAppVersion {
    /// The `application:version` key used as the mapping source.
    pub fn key(&self) -> String {
        format!("{}:{}", self.application, self.version)
    }

    /// Case-insensitive substring match on application or version name.
    /// An empty term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        term.is_empty()
            || self.application.to_lowercase().contains(&term)
            || self.version.to_lowercase().contains(&term)
    }
}

/// One Aviator application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AviatorApp {
    pub name: String,
    pub id: String,
}

impl AviatorApp {
    /// Case-insensitive substring match on the application name.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        term.is_empty() || self.name.to_lowercase().contains(&term)
    }
}

/// Parses the output of `fcli ssc appversion ls --output json`.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is not a JSON array.
pub fn parse_ssc_app_versions(json: &str) -> Result<Vec<SscAppVersion>, ParseError> {
    let items = parse_array(json)?;
    Ok(items
        .iter()
        .map(|item| SscAppVersion {
            application: text_field(item.get("application").and_then(|a| a.get("name"))),
            version: text_field(item.get("name")),
            id: text_field(item.get("id")),
        })
        .collect())
}

/// Parses the output of `fcli aviator app list --output json`.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is not a JSON array.
pub fn parse_aviator_apps(json: &str) -> Result<Vec<AviatorApp>, ParseError> {
    let items = parse_array(json)?;
    Ok(items
        .iter()
        .map(|item| AviatorApp {
            name: text_field(item.get("name")),
            id: text_field(item.get("id")),
        })
        .collect())
}

fn parse_array(json: &str) -> Result<Vec<Value>, ParseError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => {
            debug!("parsed {} records from fcli JSON", items.len());
            Ok(items)
        }
        other => Err(ParseError::NotAnArray(json_kind(&other))),
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSC_JSON: &str = r#"[
        {"id": 10042, "name": "2023.1", "application": {"id": 7, "name": "WebGoat"}},
        {"id": "10043", "name": "main", "application": {"name": "Bank App"}},
        {"id": 10044}
    ]"#;

    const AVIATOR_JSON: &str = r#"[
        {"id": "7f3c", "name": "webgoat"},
        {"id": 12, "name": "banking"}
    ]"#;

    // ── SSC ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_ssc_app_versions_reads_nested_application_name() {
        // Act
        let versions = parse_ssc_app_versions(SSC_JSON).expect("parse");

        // Assert
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].application, "WebGoat");
        assert_eq!(versions[0].version, "2023.1");
        assert_eq!(versions[0].id, "10042");
        assert_eq!(versions[1].id, "10043");
    }

    #[test]
    fn test_parse_ssc_app_versions_fills_missing_fields_with_unknown() {
        let versions = parse_ssc_app_versions(SSC_JSON).expect("parse");
        assert_eq!(versions[2].application, UNKNOWN);
        assert_eq!(versions[2].version, UNKNOWN);
        assert_eq!(versions[2].key(), "Unknown:Unknown");
    }

    #[test]
    fn test_ssc_app_version_key_joins_application_and_version() {
        let versions = parse_ssc_app_versions(SSC_JSON).expect("parse");
        assert_eq!(versions[0].key(), "WebGoat:2023.1");
        assert_eq!(versions[1].key(), "Bank App:main");
    }

    #[test]
    fn test_ssc_app_version_matches_application_or_version_case_insensitively() {
        let versions = parse_ssc_app_versions(SSC_JSON).expect("parse");
        assert!(versions[0].matches("webg"));
        assert!(versions[0].matches("2023"));
        assert!(versions[1].matches("BANK"));
        assert!(!versions[1].matches("webgoat"));
        assert!(versions[1].matches(""));
    }

    #[test]
    fn test_parse_ssc_app_versions_accepts_empty_array() {
        assert!(parse_ssc_app_versions("[]").expect("parse").is_empty());
    }

    #[test]
    fn test_parse_ssc_app_versions_rejects_malformed_json() {
        let err = parse_ssc_app_versions("[{\"id\": ").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_parse_ssc_app_versions_rejects_object_payload() {
        let err = parse_ssc_app_versions(r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, ParseError::NotAnArray("an object")));
    }

    // ── Aviator ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_aviator_apps_reads_name_and_stringifies_id() {
        let apps = parse_aviator_apps(AVIATOR_JSON).expect("parse");
        assert_eq!(
            apps,
            vec![
                AviatorApp {
                    name: "webgoat".to_string(),
                    id: "7f3c".to_string()
                },
                AviatorApp {
                    name: "banking".to_string(),
                    id: "12".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_aviator_app_matches_name_only() {
        let apps = parse_aviator_apps(AVIATOR_JSON).expect("parse");
        assert!(apps[0].matches("GOAT"));
        assert!(!apps[0].matches("7f3c"));
    }

    #[test]
    fn test_parse_aviator_apps_rejects_plain_text() {
        assert!(parse_aviator_apps("No apps found").is_err());
    }
}

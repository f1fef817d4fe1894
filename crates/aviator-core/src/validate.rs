//! Input validators applied before any external process is spawned.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// User input rejected before an operation starts.
///
/// The display strings are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid server URL")]
    ServerUrl,
    #[error("Please enter a valid SSC URL")]
    SscUrl,
    #[error("Please enter a valid email address")]
    Email,
    #[error("Please enter a valid file path")]
    FilePath,
    #[error("Please enter an app name")]
    EmptyAppName,
    #[error("Invalid app name format")]
    AppName,
    #[error("Please select a valid token file")]
    TokenFile,
    #[error("Please select both SSC and Aviator applications")]
    IncompleteMapping,
    #[error("Please select at least one SSC application")]
    NoSscSelection,
    #[error("Please select at least one Aviator application")]
    NoAviatorSelection,
    #[error("Please select a mapping for audit")]
    NoAuditMapping,
}

/// `true` when `input` parses as a URL with both a scheme and a host.
pub fn is_valid_url(input: &str) -> bool {
    match Url::parse(input) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().map_or(false, |h| !h.is_empty()),
        Err(_) => false,
    }
}

/// `true` for `local@domain.tld` shaped addresses.
pub fn is_valid_email(input: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("email pattern is valid")
        })
        .is_match(input)
}

/// `true` for a non-empty path without leading or trailing spaces.
pub fn is_valid_file_path(input: &str) -> bool {
    !input.is_empty() && !input.starts_with(' ') && !input.ends_with(' ')
}

/// `true` for names made of letters, digits, whitespace, `-` and `_`.
pub fn is_valid_app_name(input: &str) -> bool {
    static APP_NAME: OnceLock<Regex> = OnceLock::new();
    APP_NAME
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-_]+$").expect("app name pattern is valid"))
        .is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_requires_scheme_and_host() {
        assert!(is_valid_url("https://aviator.example.com"));
        assert!(is_valid_url("http://localhost:8080/ssc"));
        assert!(!is_valid_url("aviator.example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("mailto:dev@example.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_email_accepts_common_addresses() {
        assert!(is_valid_email("dev@example.com"));
        assert!(is_valid_email("first.last+ci@sub.example.co"));
    }

    #[test]
    fn test_email_rejects_malformed_addresses() {
        assert!(!is_valid_email("dev@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dev example@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_file_path_rejects_surrounding_spaces() {
        assert!(is_valid_file_path("./keys/private_key.pem"));
        assert!(!is_valid_file_path(" ./key.pem"));
        assert!(!is_valid_file_path("./key.pem "));
        assert!(!is_valid_file_path(""));
    }

    #[test]
    fn test_app_name_allows_spaces_hyphens_and_underscores() {
        assert!(is_valid_app_name("Bank App_v2-prod"));
        assert!(!is_valid_app_name("bank/app"));
        assert!(!is_valid_app_name("app:1.0"));
        assert!(!is_valid_app_name(""));
    }

    #[test]
    fn test_validation_error_messages_are_user_facing() {
        assert_eq!(
            ValidationError::ServerUrl.to_string(),
            "Please enter a valid server URL"
        );
        assert_eq!(
            ValidationError::NoAuditMapping.to_string(),
            "Please select a mapping for audit"
        );
    }
}

//! Timestamped status lines.
//!
//! Every user action ends in a one-line status such as
//! `[09:30:12] Aviator login successful!`.  The [`Severity`] tells the front
//! end which colour to use: pending is yellow, success green, warning amber
//! and error red.

use std::fmt;

use chrono::{Local, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// An operation has started and is still running.
    Pending,
    Success,
    /// Partial success, e.g. only one of two prerequisites found.
    Warning,
    Error,
}

/// A status message stamped with the local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub severity: Severity,
    pub message: String,
    pub at: NaiveTime,
}

impl StatusLine {
    /// Creates a status line stamped with the current local time.
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self::at(severity, message, Local::now().time())
    }

    pub fn at(severity: Severity, message: impl Into<String>, at: NaiveTime) -> Self {
        Self {
            severity,
            message: message.into(),
            at,
        }
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self::now(Severity::Pending, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::now(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::now(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::now(Severity::Error, message)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_displays_time_prefix() {
        let time = NaiveTime::from_hms_opt(9, 5, 7).expect("valid time");
        let line = StatusLine::at(Severity::Success, "SSC login successful!", time);
        assert_eq!(line.to_string(), "[09:05:07] SSC login successful!");
    }

    #[test]
    fn test_status_constructors_set_severity() {
        assert_eq!(StatusLine::pending("x").severity, Severity::Pending);
        assert_eq!(StatusLine::warning("x").severity, Severity::Warning);
        assert_eq!(StatusLine::error("x").severity, Severity::Error);
    }
}

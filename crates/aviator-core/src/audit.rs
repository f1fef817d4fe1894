//! Audit output handling: target parsing, output cleaning, progress messages
//! and the final report text.
//!
//! The audit itself runs inside `fcli aviator ssc audit`; this module only
//! shapes what the user sees.
//!
//! # Report layout
//!
//! ```text
//! Audit started at: 2024-05-01 09:30:00
//! SSC Application: WebGoat:2023.1
//! Aviator Application: webgoat
//! --------------------------------------------------------------------------------
//!
//! Audit completed successfully!
//!
//! === AUDIT OUTPUT ===
//! <cleaned output>
//!
//! --------------------------------------------------------------------------------
//! Audit ended at: 2024-05-01 09:34:12
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::validate::ValidationError;

/// Output longer than this (in characters) is truncated.
pub const MAX_OUTPUT_CHARS: usize = 5000;
/// Number of characters kept when truncating.
pub const TRUNCATED_OUTPUT_CHARS: usize = 4500;
/// Lines at least this long are dropped unless they carry a keyword.
pub const MAX_LINE_CHARS: usize = 200;
/// Marker appended to truncated output.
pub const TRUNCATION_MARKER: &str = "\n\n... [Output truncated for readability] ...";
/// Number of simulated progress steps (10 % each).
pub const PROGRESS_STEPS: u8 = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Target ────────────────────────────────────────────────────────────────────

/// The mapping an audit runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditTarget {
    pub ssc_app: String,
    pub aviator_app: String,
}

impl AuditTarget {
    pub fn new(ssc_app: impl Into<String>, aviator_app: impl Into<String>) -> Self {
        Self {
            ssc_app: ssc_app.into(),
            aviator_app: aviator_app.into(),
        }
    }
}

impl fmt::Display for AuditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.ssc_app, self.aviator_app)
    }
}

/// Parses the `ssc_app|aviator_app` form used by mapping pickers.
///
/// The last `|` separates the halves; SSC names may contain `|`.
impl FromStr for AuditTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('|') {
            Some((ssc, aviator)) if !ssc.is_empty() && !aviator.is_empty() => {
                Ok(Self::new(ssc, aviator))
            }
            _ => Err(ValidationError::NoAuditMapping),
        }
    }
}

// ── Output cleaning ───────────────────────────────────────────────────────────

fn noise_pattern() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\s*$|\[DEBUG\]|\[TRACE\]|Processing\.\.\.|Connecting to|\d+%)")
            .expect("noise pattern is valid")
    })
}

fn keyword_pattern() -> &'static Regex {
    static KEYWORDS: OnceLock<Regex> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        Regex::new(
            r"(?i)vulnerability|issue|finding|critical|high|medium|low|recommendation|suggested|action|summary|total|count|error|warning|failed|completed|finished|done",
        )
        .expect("keyword pattern is valid")
    })
}

/// Strips progress chatter from raw audit output.
///
/// Blank, `[DEBUG]`, `[TRACE]`, `Processing...`, `Connecting to` and bare
/// percentage lines are dropped.  Lines mentioning findings, severities,
/// recommendations, totals, errors or completion are always kept; other lines
/// are kept when shorter than [`MAX_LINE_CHARS`].  The result is capped at
/// [`MAX_OUTPUT_CHARS`].
pub fn clean_audit_output(raw: &str) -> String {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| !noise_pattern().is_match(line))
        .filter(|line| {
            keyword_pattern().is_match(line)
                || (!line.trim().is_empty() && line.chars().count() < MAX_LINE_CHARS)
        })
        .collect();

    let cleaned = kept.join("\n");
    if cleaned.chars().count() > MAX_OUTPUT_CHARS {
        let mut truncated: String = cleaned.chars().take(TRUNCATED_OUTPUT_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        cleaned
    }
}

// ── Progress ──────────────────────────────────────────────────────────────────

/// Status message shown at `percent` of the simulated audit progress.
pub fn progress_message(percent: u8) -> String {
    match percent {
        0 => "Initializing audit...".to_string(),
        20 => "Connecting to services...".to_string(),
        40 => "Analyzing application...".to_string(),
        60 => "Processing vulnerabilities...".to_string(),
        80 => "Generating recommendations...".to_string(),
        100 => "Finalizing report...".to_string(),
        other => format!("Processing... {other}%"),
    }
}

/// Percentage reached after `step` of [`PROGRESS_STEPS`].
pub fn progress_percent(step: u8) -> u8 {
    let step = step.min(PROGRESS_STEPS);
    ((u16::from(step) * 100) / u16::from(PROGRESS_STEPS)) as u8
}

// ── Report ────────────────────────────────────────────────────────────────────

/// How the audit process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Exit code 0; holds the cleaned output.
    Completed(String),
    /// Any failure; holds the raw error text.
    Failed(String),
}

impl AuditOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuditOutcome::Completed(_))
    }
}

/// Everything needed to render the audit result pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub target: AuditTarget,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub outcome: AuditOutcome,
}

impl AuditReport {
    /// Renders the report as shown in the results pane.
    pub fn render(&self) -> String {
        let rule = "-".repeat(80);
        let mut out = String::new();
        out.push_str(&format!(
            "Audit started at: {}\n",
            self.started_at.format(TIMESTAMP_FORMAT)
        ));
        out.push_str(&format!("SSC Application: {}\n", self.target.ssc_app));
        out.push_str(&format!("Aviator Application: {}\n", self.target.aviator_app));
        out.push_str(&rule);
        out.push_str("\n\n");

        match &self.outcome {
            AuditOutcome::Completed(output) => {
                out.push_str("Audit completed successfully!\n\n");
                out.push_str("=== AUDIT OUTPUT ===\n");
                out.push_str(output);
            }
            AuditOutcome::Failed(details) => {
                out.push_str("Audit failed!\n\n");
                out.push_str("=== ERROR DETAILS ===\n");
                out.push_str(details);
            }
        }

        out.push_str("\n\n");
        out.push_str(&rule);
        out.push_str(&format!(
            "\nAudit ended at: {}",
            self.ended_at.format(TIMESTAMP_FORMAT)
        ));
        out
    }
}

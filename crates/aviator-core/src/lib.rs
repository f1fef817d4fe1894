//! # aviator-core
//!
//! Shared domain library for Aviator Desk: the settings model and its INI
//! file format, the application records returned by `fcli`, mapping planning,
//! input validators, audit output handling and status lines.
//!
//! This crate has zero dependencies on processes, the file system or UI
//! frameworks.  Everything here can be unit-tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! Aviator Desk drives two external programs: the `fcli` security CLI and
//! `openssl`.  A user generates an RSA key pair, registers an Aviator server,
//! mints a token, logs into Aviator and SSC, maps SSC application versions onto
//! Aviator applications and finally triggers audits.
//!
//! This crate is the pure foundation underneath that workflow:
//!
//! - **`config`** – The INI codec and the typed [`Settings`] view of the four
//!   configuration sections (`server`, `tokens`, `ssc`, `app_mappings`).
//!
//! - **`domain`** – Application records parsed from `fcli` JSON output and the
//!   rules for building mappings between the two systems.
//!
//! - **`validate`** – Input checks applied before any process is spawned.
//!
//! - **`audit`** – Cleaning raw audit output and assembling audit reports.
//!
//! - **`toolchain`** – Version requirements for the external programs and the
//!   key file naming convention.
//!
//! - **`status`** – Timestamped, severity-tagged status lines shown to the user.

pub mod audit;
pub mod config;
pub mod domain;
pub mod status;
pub mod toolchain;
pub mod validate;

// Re-export the most-used types at the crate root so callers can write
// `aviator_core::Settings` instead of `aviator_core::config::settings::Settings`.
pub use audit::{clean_audit_output, AuditOutcome, AuditReport, AuditTarget};
pub use config::ini::{IniDocument, IniError};
pub use config::settings::{default_document, AppMappings, ConfigSection, Settings};
pub use domain::apps::{
    parse_aviator_apps, parse_ssc_app_versions, AviatorApp, ParseError, SscAppVersion,
};
pub use domain::mapping::{plan_bulk_mappings, Selection};
pub use status::{Severity, StatusLine};
pub use toolchain::{FcliSupport, Version};
pub use validate::ValidationError;

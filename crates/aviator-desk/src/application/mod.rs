//! Application layer use cases.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `aviator_core`) and the infrastructure (processes, files,
//! terminal).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** validators, services and the settings store to fulfil a
//!   user goal (e.g., "log into SSC, remember the session, then list the
//!   application versions").
//! - **Depend on abstractions** ([`ports::CommandRunner`],
//!   [`ports::SettingsStore`]) rather than concrete implementations, so tests
//!   can swap in recording doubles.
//! - **Spawn nothing and touch no files directly**.  Every external effect
//!   goes through a port.
//!
//! # Sub-modules
//!
//! - **`ports`**     – The traits above plus the command description types.
//! - **`services`**  – Argument building and result mapping for each `fcli`
//!   and `openssl` call.
//! - **`setup`**     – Prerequisites, key generation, server registration and
//!   token minting.
//! - **`audit_ops`** – Logins, application listing, mappings and audits.

pub mod audit_ops;
pub mod ports;
pub mod services;
pub mod setup;

use aviator_core::ValidationError;
use thiserror::Error;

use self::ports::StoreError;
use self::services::ServiceError;

/// Why a use case did not complete.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Rejected before any process was spawned.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The external program failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The program succeeded but the settings could not be saved.
    #[error(transparent)]
    Store(#[from] StoreError),
}

//! Infrastructure layer for Aviator Desk.
//!
//! Contains OS-facing adapters: the child-process runner, the INI file store,
//! log file set-up, and the presentation bridge used by the terminal front end.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `aviator_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod logging;
pub mod process;
pub mod storage;
pub mod ui_bridge;

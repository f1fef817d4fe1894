//! Storage infrastructure: the INI configuration file.
//!
//! The `config` sub-module owns `config.ini`:
//!
//! - Creating it with defaults on first run.
//! - Backing up and replacing a file that can no longer be parsed.
//! - Writing every change back to disk before the call returns.

pub mod config;

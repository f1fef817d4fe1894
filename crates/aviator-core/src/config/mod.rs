//! Configuration model.
//!
//! - **`ini`** – A small INI reader/writer that keeps section and key order so
//!   the file stays diffable and mappings keep their insertion order.
//! - **`settings`** – The typed view over the four known sections and the
//!   defaults written on first run.

pub mod ini;
pub mod settings;

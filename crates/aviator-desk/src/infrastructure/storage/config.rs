//! INI-based configuration persistence.
//!
//! [`ConfigStore`] keeps the parsed [`IniDocument`] in memory and rewrites the
//! whole file after every change.  A change is applied to a copy of the
//! document first and only kept once the file is written, so a failed write
//! leaves both the file and the in-memory settings as they were.
//!
//! # File layout (for beginners)
//!
//! ```ini
//! [server]
//! url = https://aviator.example.com
//! tenant = acme
//! private_key_path = ./private_key.pem
//!
//! [tokens]
//! current_token_file = ./sast_aviator_token.json
//! token_email = dev@example.com
//!
//! [ssc]
//! url = https://ssc.example.com
//! username = admin
//! last_session = 2024-05-01T09:30:00.123456
//!
//! [app_mappings]
//! WebGoat:2023.1 = webgoat
//! ```
//!
//! Mapping keys are SSC `application:version` names and may contain any
//! character; the INI writer escapes the ones that would otherwise read back
//! as a header, a comment or a separator.
//!
//! # Recovery
//!
//! A file that fails to parse is renamed to `<name>.bak` and a fresh default
//! file is written in its place.  The user loses their settings but the
//! program keeps working and the old content can be recovered by hand.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use aviator_core::{default_document, AppMappings, ConfigSection, IniDocument, IniError, Settings};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::ports::{SettingsStore, StoreError};

/// Default file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be parsed.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: IniError,
    },
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        StoreError(err.to_string())
    }
}

/// The configuration file and its in-memory copy.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: IniDocument,
}

impl ConfigStore {
    /// Opens `path`, creating it with defaults if it does not exist.
    ///
    /// An unparseable file is moved to `<path>.bak` and replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read (for reasons
    /// other than "not found"), backed up, or written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let document = match std::fs::read_to_string(&path) {
            Ok(content) => match IniDocument::parse(&content) {
                Ok(doc) => {
                    info!("Configuration loaded from {}", path.display());
                    doc
                }
                Err(source) => {
                    let err = ConfigError::Parse {
                        path: path.clone(),
                        source,
                    };
                    error!("{err}");
                    let backup = backup_path(&path);
                    std::fs::rename(&path, &backup).map_err(|source| ConfigError::Io {
                        path: backup.clone(),
                        source,
                    })?;
                    warn!("Corrupt configuration moved to {}", backup.display());
                    default_document()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Creating default configuration at {}", path.display());
                default_document()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let store = Self { path, document };
        store.write(&store.document)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads one value, falling back to `""` for absent keys.
    pub fn get(&self, section: ConfigSection, key: &str) -> &str {
        match self.document.get(section.name(), key) {
            Some(value) => value,
            None => {
                debug!("Config key [{}][{key}] not set", section.name());
                ""
            }
        }
    }

    /// Sets one value and rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written.
    pub fn set_value(
        &mut self,
        section: ConfigSection,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut next = self.document.clone();
        let old = next.set(section.name(), key, value);
        self.write(&next)?;
        self.document = next;
        info!(
            "Config updated: [{}][{key}] = {value} (was {})",
            section.name(),
            old.as_deref().unwrap_or("<unset>")
        );
        Ok(())
    }

    /// Removes a mapping and rewrites the file.
    ///
    /// Removing an absent mapping is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written.
    pub fn remove_value(
        &mut self,
        section: ConfigSection,
        key: &str,
    ) -> Result<Option<String>, ConfigError> {
        let mut next = self.document.clone();
        let removed = next.remove(section.name(), key);
        self.write(&next)?;
        self.document = next;
        match &removed {
            Some(_) => info!("Config removed: [{}][{key}]", section.name()),
            None => warn!("Config key [{}][{key}] was not present", section.name()),
        }
        Ok(removed)
    }

    /// The document as it is written to disk.
    pub fn render(&self) -> String {
        self.document.to_string()
    }

    fn write(&self, document: &IniDocument) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, document.to_string()).map_err(|source| {
            ConfigError::Io {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

impl SettingsStore for ConfigStore {
    fn settings(&self) -> Settings {
        Settings::from_document(&self.document)
    }

    fn set(&mut self, section: ConfigSection, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.set_value(section, key, value)?)
    }

    fn add_mapping(&mut self, ssc_app: &str, aviator_app: &str) -> Result<(), StoreError> {
        Ok(self.set_value(ConfigSection::AppMappings, ssc_app, aviator_app)?)
    }

    fn remove_mapping(&mut self, ssc_app: &str) -> Result<Option<String>, StoreError> {
        Ok(self.remove_value(ConfigSection::AppMappings, ssc_app)?)
    }

    fn mappings(&self) -> AppMappings {
        self.document
            .section(ConfigSection::AppMappings.name())
            .map(|s| s.entries().collect())
            .unwrap_or_default()
    }
}

/// `config.ini` becomes `config.ini.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Typed view over the configuration file.
//!
//! The file has four sections:
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
//! last_session = 2024-05-01T09:30:00
//!
//! [app_mappings]
//! WebGoat:2023.1 = webgoat
//! ```
//!
//! [`Settings`] is a read-only snapshot.  Mutations go through the document
//! (see the file-backed store in `aviator-desk`) so that every change is
//! flushed to disk immediately.

use serde::Serialize;

use super::ini::IniDocument;

/// Default private key location, relative to the working directory.
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./private_key.pem";
/// Default token file location, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "./sast_aviator_token.json";

/// The four sections the application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Server,
    Tokens,
    Ssc,
    AppMappings,
}

impl ConfigSection {
    /// All sections, in the order they are written to a fresh file.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Server,
        ConfigSection::Tokens,
        ConfigSection::Ssc,
        ConfigSection::AppMappings,
    ];

    /// The `[header]` name used in the file.
    pub fn name(self) -> &'static str {
        match self {
            ConfigSection::Server => "server",
            ConfigSection::Tokens => "tokens",
            ConfigSection::Ssc => "ssc",
            ConfigSection::AppMappings => "app_mappings",
        }
    }
}

// ── Settings snapshot ─────────────────────────────────────────────────────────

/// Connection parameters for the Aviator backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerSettings {
    pub url: String,
    pub tenant: String,
    pub private_key_path: String,
}

/// The locally stored token file and the email it was minted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenSettings {
    pub current_token_file: String,
    pub token_email: String,
}

/// Connection parameters for SSC and the time of the last successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SscSettings {
    pub url: String,
    pub username: String,
    pub last_session: String,
}

/// Insertion-ordered `source app -> target app` mappings.
///
/// Keys are unique; values may repeat (many SSC versions can map onto one
/// Aviator application).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppMappings {
    entries: Vec<(String, String)>,
}

impl AppMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a mapping, keeping the position of an existing key.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) -> Option<String> {
        let source = source.into();
        let target = target.into();
        match self.entries.iter_mut().find(|(s, _)| *s == source) {
            Some((_, existing)) => Some(std::mem::replace(existing, target)),
            None => {
                self.entries.push((source, target));
                None
            }
        }
    }

    pub fn remove(&mut self, source: &str) -> Option<String> {
        let index = self.entries.iter().position(|(s, _)| s == source)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for AppMappings {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut mappings = AppMappings::new();
        for (source, target) in iter {
            mappings.insert(source, target);
        }
        mappings
    }
}

/// Snapshot of every known setting.  Absent keys read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub tokens: TokenSettings,
    pub ssc: SscSettings,
    pub mappings: AppMappings,
}

impl Settings {
    /// Builds the snapshot from a parsed document.
    pub fn from_document(doc: &IniDocument) -> Self {
        let get = |section: ConfigSection, key: &str| {
            doc.get(section.name(), key).unwrap_or_default().to_string()
        };

        Self {
            server: ServerSettings {
                url: get(ConfigSection::Server, "url"),
                tenant: get(ConfigSection::Server, "tenant"),
                private_key_path: get(ConfigSection::Server, "private_key_path"),
            },
            tokens: TokenSettings {
                current_token_file: get(ConfigSection::Tokens, "current_token_file"),
                token_email: get(ConfigSection::Tokens, "token_email"),
            },
            ssc: SscSettings {
                url: get(ConfigSection::Ssc, "url"),
                username: get(ConfigSection::Ssc, "username"),
                last_session: get(ConfigSection::Ssc, "last_session"),
            },
            mappings: doc
                .section(ConfigSection::AppMappings.name())
                .map(|s| s.entries().collect())
                .unwrap_or_default(),
        }
    }
}

/// Builds the document written on first run.
pub fn default_document() -> IniDocument {
    let mut doc = IniDocument::new();

    let server = ConfigSection::Server.name();
    doc.set(server, "url", "");
    doc.set(server, "tenant", "");
    doc.set(server, "private_key_path", DEFAULT_PRIVATE_KEY_PATH);

    let tokens = ConfigSection::Tokens.name();
    doc.set(tokens, "current_token_file", DEFAULT_TOKEN_FILE);
    doc.set(tokens, "token_email", "");

    let ssc = ConfigSection::Ssc.name();
    doc.set(ssc, "url", "");
    doc.set(ssc, "username", "");
    doc.set(ssc, "last_session", "");

    doc.ensure_section(ConfigSection::AppMappings.name());
    doc
}

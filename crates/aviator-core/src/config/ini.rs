//! Order-preserving INI reader and writer.
//!
//! Format:
//! ```text
//! ; comment
//! [section]
//! key = value
//! multi = first line
//! 	continuation line
//! ```
//!
//! # Why not split on `:` as well? (for beginners)
//!
//! Many INI dialects accept both `=` and `:` as the key/value delimiter.  Our
//! mapping keys look like `MyApp:1.0` (application name and version), so a
//! `:` delimiter would cut them in half.  Only the **first** `=` separates the
//! key from the value; everything before it (including colons) is the key.
//!
//! # Ordering
//!
//! Sections and entries are stored in `Vec`s rather than hash maps.  Setting an
//! existing key replaces the value in place; a new key is appended.  This keeps
//! the file stable across saves and gives `app_mappings` its insertion order.
//!
//! Keys are case-sensitive and stored exactly as written.
//!
//! # Escaping
//!
//! Mapping keys are SSC application names and may contain anything.  The
//! writer escapes what the reader would otherwise misread: `\\`, `\=` and
//! `\n` anywhere in a key, plus a leading `\[`, `\#` or `\;` so the line is not
//! taken for a header or a comment.  An unknown escape is kept verbatim.
//!
//! Inside a multi-line value an indented blank line is kept as an empty line
//! of the value; trailing blank lines are dropped.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing INI text.  Line numbers are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
    /// A `key = value` line appeared before the first `[section]` header.
    #[error("line {line}: entry outside of any section")]
    EntryOutsideSection { line: usize },

    /// A non-comment line that is neither a header nor contains `=`.
    #[error("line {line}: expected `key = value`, got {content:?}")]
    MissingSeparator { line: usize, content: String },

    /// An entry with nothing before the `=`.
    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    /// A `[` without the matching `]` at the end of the line.
    #[error("line {line}: unterminated section header")]
    UnterminatedHeader { line: usize },

    /// The same `[section]` header appears twice.
    #[error("line {line}: duplicate section [{name}]")]
    DuplicateSection { line: usize, name: String },

    /// The same key appears twice within one section.
    #[error("line {line}: duplicate key {key:?} in section [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },
}

// ── Section ───────────────────────────────────────────────────────────────────

/// One `[name]` block and its entries in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    /// Creates an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces `key`, returning the previous value.
    ///
    /// Replacement keeps the entry's position; new keys are appended.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates over `(key, value)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn value_mut(&mut self, key: &str) -> Option<&mut String> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

// ── Document ──────────────────────────────────────────────────────────────────

/// A parsed INI file.
///
/// Sections unknown to the application are kept so that a load/save cycle
/// never drops data written by another tool or a newer version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses INI text.
    ///
    /// # Errors
    ///
    /// Returns [`IniError`] with the offending 1-based line number.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use aviator_core::IniDocument;
    ///
    /// let doc = IniDocument::parse("[app_mappings]\nWebGoat:1.0 = webgoat\n").unwrap();
    /// assert_eq!(doc.get("app_mappings", "WebGoat:1.0"), Some("webgoat"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;
        let mut last_key: Option<String> = None;
        // Blank lines seen inside the current value, emitted only when another
        // continuation line follows.
        let mut pending_blanks = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                if last_key.is_some() {
                    pending_blanks += 1;
                }
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Indented line directly after an entry: continuation of its value.
            if raw.starts_with(char::is_whitespace) {
                if let (Some(section), Some(key)) = (current, last_key.as_deref()) {
                    if let Some(value) = doc.sections[section].value_mut(key) {
                        for _ in 0..=pending_blanks {
                            value.push('\n');
                        }
                        value.push_str(trimmed);
                        pending_blanks = 0;
                        continue;
                    }
                }
            }
            pending_blanks = 0;

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or(IniError::UnterminatedHeader { line })?
                    .trim();
                if doc.section(name).is_some() {
                    return Err(IniError::DuplicateSection {
                        line,
                        name: name.to_string(),
                    });
                }
                doc.sections.push(Section::new(name));
                current = Some(doc.sections.len() - 1);
                last_key = None;
                continue;
            }

            let section_index = current.ok_or(IniError::EntryOutsideSection { line })?;
            let (key, value) = split_entry(trimmed).ok_or_else(|| IniError::MissingSeparator {
                line,
                content: trimmed.to_string(),
            })?;
            let key = key.as_str();
            if key.is_empty() {
                return Err(IniError::EmptyKey { line });
            }

            let section = &mut doc.sections[section_index];
            if section.contains_key(key) {
                return Err(IniError::DuplicateKey {
                    line,
                    section: section.name.clone(),
                    key: key.to_string(),
                });
            }
            section
                .entries
                .push((key.to_string(), value.trim().to_string()));
            last_key = Some(key.to_string());
        }

        Ok(doc)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Returns the named section, appending an empty one if it does not exist.
    pub fn ensure_section(&mut self, name: &str) -> &mut Section {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    /// Section names in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// Sets `key` in `section`, creating the section if needed.
    /// Returns the previous value.
    pub fn set(
        &mut self,
        section: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.ensure_section(section).set(key, value)
    }

    /// Removes `key` from `section`, returning its value if present.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.section_mut(section)?.remove(key)
    }
}

impl FromStr for IniDocument {
    type Err = IniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                let mut lines = value.split('\n');
                let first = lines.next().unwrap_or_default();
                writeln!(f, "{} = {first}", escape_key(key))?;
                for continuation in lines {
                    writeln!(f, "\t{continuation}")?;
                }
            }
        }
        Ok(())
    }
}

/// Splits `key = value` at the first unescaped `=`, unescaping the key.
fn split_entry(line: &str) -> Option<(String, &str)> {
    let mut key = String::new();
    let mut chars = line.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => key.push('\n'),
                Some((_, escaped @ ('\\' | '=' | '[' | '#' | ';'))) => key.push(escaped),
                Some((_, other)) => {
                    key.push('\\');
                    key.push(other);
                }
                None => key.push('\\'),
            },
            '=' => return Some((key.trim_end().to_string(), &line[index + 1..])),
            other => key.push(other),
        }
    }
    None
}

/// Inverse of the key handling in [`split_entry`].
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    if key.starts_with(['[', '#', ';']) {
        out.push('\\');
    }
    for c in key.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

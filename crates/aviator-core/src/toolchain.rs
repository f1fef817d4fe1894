//! Requirements on the external toolchain (`fcli`, `openssl`) and the key
//! file naming convention.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Oldest `fcli` release that ships the `aviator` command group.
pub const MIN_FCLI_VERSION: Version = Version::new(3, 5, 1);

/// Suffix appended to the private key stem to name the public key file.
pub const PUBLIC_KEY_SUFFIX: &str = "_public.pem";

/// A `major.minor.patch` version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Finds the first `x.y.z` in `text`, e.g. in `fcli version 3.6.0, built ...`.
    pub fn find_in(text: &str) -> Option<Self> {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        let captures = VERSION
            .get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("version pattern is valid"))
            .captures(text)?;
        Some(Self::new(
            captures[1].parse().ok()?,
            captures[2].parse().ok()?,
            captures[3].parse().ok()?,
        ))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Verdict on the output of `fcli --version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcliSupport {
    Supported(Version),
    Outdated(Version),
    Unrecognized,
}

impl FcliSupport {
    /// Classifies the stdout of a successful `fcli --version` call.
    pub fn from_version_output(stdout: &str) -> Self {
        match Version::find_in(stdout) {
            Some(v) if v >= MIN_FCLI_VERSION => FcliSupport::Supported(v),
            Some(v) => FcliSupport::Outdated(v),
            None => FcliSupport::Unrecognized,
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, FcliSupport::Supported(_))
    }

    /// Message shown next to the prerequisite check.
    pub fn message(self) -> String {
        match self {
            FcliSupport::Supported(v) => format!("FCLI {v} found ✓"),
            FcliSupport::Outdated(v) => {
                format!("FCLI {v} found, but {MIN_FCLI_VERSION}+ required")
            }
            FcliSupport::Unrecognized => "Could not determine FCLI version".to_string(),
        }
    }
}

/// Derives the public key path from the private key path:
/// `keys/private_key.pem` becomes `keys/private_key_public.pem`.
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut name = private_key.with_extension("").into_os_string();
    name.push(PUBLIC_KEY_SUFFIX);
    PathBuf::from(name)
}

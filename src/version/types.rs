//! Version identifier types.
//!
//! Migration versions come in several historical encodings. They are parsed
//! once into a [`VersionIdentifier`] and compared on the typed form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Error types for version operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),

    #[error("Invalid timestamp in version {0}")]
    InvalidTimestamp(String),

    #[error("Version {version} is dated in the future (latest allowed: {latest_allowed})")]
    FutureTimestamp {
        version: String,
        latest_allowed: String,
    },
}

/// Versions released before any structured scheme existed, in release order.
pub const LEGACY_VERSIONS: &[&str] = &[
    "v3.0.8",
    "v3.0.9-beta.1",
    "v3.0.9-beta.3",
    "v3.1.0-alpha.2",
];

/// `x19_09_03_02`
static LEGACY_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^x(\d{2})_(\d{2})_(\d{2})_(\d{2})$").unwrap());

/// `x19.09.03.02`
static LEGACY_DOTTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^x(\d{2})\.(\d{2})\.(\d{2})\.(\d{2})$").unwrap());

/// `y3.10.202210010000`
static CURRENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^y(\d+)\.(\d+)\.(\d{12})$").unwrap());

/// A parsed migration version.
///
/// Variant order is significant: the derived `Ord` sorts every whitelisted
/// legacy version before every structured legacy version, and those before
/// every current-format version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionIdentifier {
    /// Index into [`LEGACY_VERSIONS`].
    LegacyWhitelisted(usize),
    /// Numeric fields of an `x..` version, compared left to right, shorter first.
    LegacyStructured(Vec<u32>),
    /// `y<major>.<minor>.<YYYYMMDDHHMM>`.
    Current {
        major: u32,
        minor: u32,
        timestamp: String,
    },
}

impl VersionIdentifier {
    /// Parse a version string that has already been through the correction table.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        if let Some(idx) = LEGACY_VERSIONS.iter().position(|v| *v == raw) {
            return Ok(Self::LegacyWhitelisted(idx));
        }

        let structured = LEGACY_DOTTED_RE
            .captures(raw)
            .or_else(|| LEGACY_UNDERSCORE_RE.captures(raw));
        if let Some(caps) = structured {
            let fields = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| VersionError::InvalidFormat(raw.to_string()))?;
            return Ok(Self::LegacyStructured(fields));
        }

        if let Some(caps) = CURRENT_RE.captures(raw) {
            let major = caps[1]
                .parse()
                .map_err(|_| VersionError::InvalidFormat(raw.to_string()))?;
            let minor = caps[2]
                .parse()
                .map_err(|_| VersionError::InvalidFormat(raw.to_string()))?;
            return Ok(Self::Current {
                major,
                minor,
                timestamp: caps[3].to_string(),
            });
        }

        Err(VersionError::InvalidFormat(raw.to_string()))
    }

    /// Whether this is a `y..` version.
    pub fn is_current_format(&self) -> bool {
        matches!(self, Self::Current { .. })
    }

    /// The embedded `YYYYMMDDHHMM` timestamp of a current-format version.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::Current { timestamp, .. } => Some(timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for VersionIdentifier {
    /// Writes the canonical form; underscore legacy versions come out dotted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyWhitelisted(idx) => {
                write!(f, "{}", LEGACY_VERSIONS.get(*idx).copied().unwrap_or("v?"))
            }
            Self::LegacyStructured(fields) => {
                let parts: Vec<String> = fields.iter().map(|n| format!("{:02}", n)).collect();
                write!(f, "x{}", parts.join("."))
            }
            Self::Current {
                major,
                minor,
                timestamp,
            } => write!(f, "y{}.{}.{}", major, minor, timestamp),
        }
    }
}

impl std::str::FromStr for VersionIdentifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! Where a stored object lives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved storage location of a document or version file.
///
/// Persisted and serialized as a single string; [`StorageLocation::parse`]
/// decides the variant once when a value is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum StorageLocation {
    /// Publicly reachable URL.
    Remote(String),
    /// Key relative to the storage provider root.
    Local(String),
}

impl StorageLocation {
    /// Classify a stored locator string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Remote(raw.to_string())
        } else {
            Self::Local(raw.to_string())
        }
    }

    /// The persisted form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Remote(s) | Self::Local(s) => s,
        }
    }

    /// True for [`StorageLocation::Remote`].
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<String> for StorageLocation {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StorageLocation> for String {
    fn from(location: StorageLocation) -> Self {
        match location {
            StorageLocation::Remote(s) | StorageLocation::Local(s) => s,
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

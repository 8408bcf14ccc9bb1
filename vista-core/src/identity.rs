//! Identity types for cached view artifacts

use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::{ValidationError, VistaResult};

/// Opaque fingerprint of a schema mapping.
///
/// Cache validity is decided by exact string equality between the stored
/// and the freshly computed fingerprint. Never empty or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> VistaResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "fingerprint".to_string(),
            }
            .into());
        }
        Ok(Self(value))
    }

    /// Lowercase hex SHA-256 over length-prefixed `parts`.
    ///
    /// Length prefixes keep `["ab", "c"]` and `["a", "bc"]` apart.
    pub fn compute<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let part = part.as_ref();
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two container names of a schema mapping, used as the composite key
/// of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityPair {
    primary: String,
    secondary: String,
}

impl IdentityPair {
    /// Both names must be non-empty and not just whitespace.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> VistaResult<Self> {
        let primary = primary.into();
        let secondary = secondary.into();
        if primary.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "primary_id".to_string(),
            }
            .into());
        }
        if secondary.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "secondary_id".to_string(),
            }
            .into());
        }
        Ok(Self { primary, secondary })
    }

    /// Conceptual (logical) container name.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Store (physical) container name.
    pub fn secondary(&self) -> &str {
        &self.secondary
    }
}

impl fmt::Display for IdentityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.primary, self.secondary)
    }
}

/// Handle identifying one artifact cache instance in the registry.
/// UUIDv7 so handles sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(Uuid);

impl FactoryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FactoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Builds the `"{container}.{set}"` name used to key extents.
pub fn qualified_extent_name(container: &str, set: &str) -> String {
    format!("{}.{}", container, set)
}

//! Artifact maps and cache entries

use std::collections::BTreeMap;

use crate::{Fingerprint, IdentityPair, ValidationError, VistaResult};

/// Generated artifact text keyed by extent name.
///
/// Artifact text is opaque: it is stored and returned verbatim, never
/// trimmed or normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMap {
    artifacts: BTreeMap<String, String>,
}

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact, returning the text previously stored under
    /// `extent`.
    pub fn insert(
        &mut self,
        extent: impl Into<String>,
        text: impl Into<String>,
    ) -> VistaResult<Option<String>> {
        let extent = extent.into();
        if extent.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "extent".to_string(),
            }
            .into());
        }
        Ok(self.artifacts.insert(extent, text.into()))
    }

    /// Builder-style insert.
    pub fn with_artifact(
        mut self,
        extent: impl Into<String>,
        text: impl Into<String>,
    ) -> VistaResult<Self> {
        self.insert(extent, text)?;
        Ok(self)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> VistaResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (extent, text) in pairs {
            map.insert(extent, text)?;
        }
        Ok(map)
    }

    pub fn get(&self, extent: &str) -> Option<&str> {
        self.artifacts.get(extent).map(String::as_str)
    }

    pub fn contains(&self, extent: &str) -> bool {
        self.artifacts.contains_key(extent)
    }

    /// Iterate `(extent, text)` pairs in extent order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.artifacts
            .iter()
            .map(|(extent, text)| (extent.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// One cached artifact set: identity, the fingerprint it was generated
/// for, and the artifacts themselves.
///
/// Immutable once built. A changed fingerprint means a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    identity: IdentityPair,
    fingerprint: Fingerprint,
    artifacts: ArtifactMap,
}

impl CacheEntry {
    pub fn new(identity: IdentityPair, fingerprint: Fingerprint, artifacts: ArtifactMap) -> Self {
        Self {
            identity,
            fingerprint,
            artifacts,
        }
    }

    pub fn identity(&self) -> &IdentityPair {
        &self.identity
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn artifacts(&self) -> &ArtifactMap {
        &self.artifacts
    }

    pub fn into_parts(self) -> (IdentityPair, Fingerprint, ArtifactMap) {
        (self.identity, self.fingerprint, self.artifacts)
    }
}

//! Read-only view of one resolved artifact set

use vista_core::{ArtifactMap, CacheEntry, Fingerprint};

/// Artifacts for one identity pair, bound to the fingerprint they were
/// generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLookup {
    fingerprint: Fingerprint,
    artifacts: ArtifactMap,
}

impl ArtifactLookup {
    pub fn new(fingerprint: Fingerprint, artifacts: ArtifactMap) -> Self {
        Self {
            fingerprint,
            artifacts,
        }
    }

    /// Artifact text for `extent`. `None` when no view was generated for it.
    pub fn get(&self, extent: &str) -> Option<&str> {
        self.artifacts.get(extent)
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn artifacts(&self) -> &ArtifactMap {
        &self.artifacts
    }

    pub fn extents(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|(extent, _)| extent)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl From<CacheEntry> for ArtifactLookup {
    fn from(entry: CacheEntry) -> Self {
        let (_, fingerprint, artifacts) = entry.into_parts();
        Self::new(fingerprint, artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::IdentityPair;

    #[test]
    fn test_lookup_from_entry() {
        let entry = CacheEntry::new(
            IdentityPair::new("SimpleModel", "CodeFirstDatabase").unwrap(),
            Fingerprint::new("abc").unwrap(),
            ArtifactMap::from_pairs([
                ("CodeFirstDatabase.Entity", "SELECT 1"),
                ("SimpleModel.Entities", "SELECT 2"),
            ])
            .unwrap(),
        );
        let lookup = ArtifactLookup::from(entry);

        assert_eq!(lookup.fingerprint().as_str(), "abc");
        assert_eq!(lookup.get("CodeFirstDatabase.Entity"), Some("SELECT 1"));
        assert_eq!(lookup.get("CodeFirstDatabase.Missing"), None);
        assert_eq!(
            lookup.extents().collect::<Vec<_>>(),
            vec!["CodeFirstDatabase.Entity", "SimpleModel.Entities"]
        );
        assert_eq!(lookup.len(), 2);
    }
}

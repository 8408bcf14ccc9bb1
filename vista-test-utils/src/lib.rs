//! VISTA Test Utilities
//!
//! Shared test infrastructure for the vista workspace:
//! - Proptest generators for identities, fingerprints and artifact maps
//! - A mock schema collaborator that counts its calls
//! - Fixtures for the `SimpleModel` scenario
//! - Assertions for vista error variants

// Re-export mock storage from its source crate
pub use vista_storage::MockDocumentStore;

// Re-export core types for convenience
pub use vista_core::{
    ArtifactMap, CacheEntry, CodecError, ConfigError, Diagnostic, Document, EntryFragment,
    Fingerprint, GenerationError, IdentityPair, Severity, StorageError, ValidationError,
    ViewFragment, VistaError, VistaResult,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use vista_cache::{ArtifactGenerator, Fingerprinter};

// ============================================================================
// MOCK SCHEMA COLLABORATOR
// ============================================================================

/// Deterministic schema collaborator for tests.
///
/// Fingerprints come from per-identity overrides or a default. Generated
/// views depend only on the identity, the entity sets and the current
/// fingerprint, so two generations under the same fingerprint are equal.
#[derive(Debug)]
pub struct MockSchema {
    default_fingerprint: RwLock<String>,
    overrides: RwLock<HashMap<(String, String), String>>,
    entity_sets: Vec<String>,
    failure: Option<Vec<Diagnostic>>,
    generation_delay: Option<Duration>,
    fingerprint_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl MockSchema {
    pub fn new(default_fingerprint: impl Into<String>) -> Self {
        Self {
            default_fingerprint: RwLock::new(default_fingerprint.into()),
            overrides: RwLock::new(HashMap::new()),
            entity_sets: vec!["Entities".to_string()],
            failure: None,
            generation_delay: None,
            fingerprint_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    /// Entity sets to generate one view each for.
    pub fn with_entity_sets<I, S>(mut self, sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_sets = sets.into_iter().map(Into::into).collect();
        self
    }

    /// Make every generation fail with `diagnostics`.
    pub fn failing(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.failure = Some(diagnostics);
        self
    }

    /// Sleep inside `generate`, to widen race windows.
    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = Some(delay);
        self
    }

    pub fn set_default_fingerprint(&self, fingerprint: impl Into<String>) {
        if let Ok(mut slot) = self.default_fingerprint.write() {
            *slot = fingerprint.into();
        }
    }

    pub fn set_fingerprint(&self, identity: &IdentityPair, fingerprint: impl Into<String>) {
        if let Ok(mut overrides) = self.overrides.write() {
            overrides.insert(
                (identity.primary().to_string(), identity.secondary().to_string()),
                fingerprint.into(),
            );
        }
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.fingerprint_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    fn current_fingerprint(&self, identity: &IdentityPair) -> String {
        let key = (identity.primary().to_string(), identity.secondary().to_string());
        let overridden = self
            .overrides
            .read()
            .ok()
            .and_then(|overrides| overrides.get(&key).cloned());
        overridden.unwrap_or_else(|| {
            self.default_fingerprint
                .read()
                .map(|fingerprint| fingerprint.clone())
                .unwrap_or_default()
        })
    }

    /// The view text this schema generates for one entity set.
    pub fn expected_view(identity: &IdentityPair, set: &str, fingerprint: &str) -> String {
        format!(
            "\n    SELECT VALUE -- Constructing {set}\n        [{store}Schema.{set}](T1.Id)\n    FROM {conceptual}.{set} AS T1\n    -- fingerprint {fingerprint} <&> ]]> done\n",
            set = set,
            store = identity.secondary(),
            conceptual = identity.primary(),
            fingerprint = fingerprint,
        )
    }
}

impl Fingerprinter for MockSchema {
    fn compute_fingerprint(&self, identity: &IdentityPair) -> VistaResult<Fingerprint> {
        self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
        Fingerprint::new(self.current_fingerprint(identity))
    }
}

impl ArtifactGenerator for MockSchema {
    fn generate(&self, identity: &IdentityPair) -> Result<ArtifactMap, GenerationError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.generation_delay {
            std::thread::sleep(delay);
        }
        if let Some(diagnostics) = &self.failure {
            return Err(GenerationError::new(diagnostics.clone()));
        }

        let fingerprint = self.current_fingerprint(identity);
        let mut artifacts = ArtifactMap::new();
        for set in &self.entity_sets {
            let extent = vista_core::qualified_extent_name(identity.secondary(), set);
            artifacts
                .insert(extent, Self::expected_view(identity, set, &fingerprint))
                .map_err(|e| GenerationError::new(vec![Diagnostic::error(1, e.to_string())]))?;
        }
        Ok(artifacts)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for vista types.

    use super::*;
    use proptest::prelude::*;

    /// Container-like name, occasionally with XML-hostile characters.
    pub fn arb_container_name() -> impl Strategy<Value = String> {
        prop_oneof![
            "[A-Z][A-Za-z0-9]{0,20}",
            "[A-Za-z][A-Za-z0-9 <>&'\"._-]{0,20}[A-Za-z0-9]",
        ]
    }

    /// Generate a valid identity pair.
    pub fn arb_identity_pair() -> impl Strategy<Value = IdentityPair> {
        (arb_container_name(), arb_container_name()).prop_filter_map(
            "identity names must not be blank",
            |(primary, secondary)| IdentityPair::new(primary, secondary).ok(),
        )
    }

    /// Generate a valid fingerprint.
    pub fn arb_fingerprint() -> impl Strategy<Value = Fingerprint> {
        prop_oneof![
            "[0-9a-f]{64}",
            "[A-Za-z0-9+/=]{1,40}",
        ]
        .prop_filter_map("fingerprint must not be blank", |value| {
            Fingerprint::new(value).ok()
        })
    }

    /// Artifact text, including whitespace runs, markup characters and
    /// CDATA terminators.
    pub fn arb_artifact_text() -> impl Strategy<Value = String> {
        prop_oneof![
            "[ -~\t\n\u{e9}\u{4e2d}]{0,80}",
            "[ \t\n]{0,10}SELECT VALUE [a-z]{1,10}[ \t\n]{0,10}",
            Just("]]>".to_string()),
            Just("a]]]]>>b<![CDATA[c]]>".to_string()),
            Just("<view extent=\"x\">&amp;</view>".to_string()),
            Just(String::new()),
        ]
    }

    /// Generate an artifact map with up to eight extents.
    pub fn arb_artifact_map() -> impl Strategy<Value = ArtifactMap> {
        prop::collection::btree_map(
            "[A-Za-z][A-Za-z0-9]{0,10}\\.[A-Za-z][A-Za-z0-9]{0,10}",
            arb_artifact_text(),
            0..8,
        )
        .prop_filter_map("extents must not be blank", |pairs| {
            ArtifactMap::from_pairs(pairs).ok()
        })
    }

    /// Generate a complete cache entry.
    pub fn arb_cache_entry() -> impl Strategy<Value = CacheEntry> {
        (arb_identity_pair(), arb_fingerprint(), arb_artifact_map())
            .prop_map(|(identity, fingerprint, artifacts)| {
                CacheEntry::new(identity, fingerprint, artifacts)
            })
    }

    /// Generate cache entries with pairwise distinct identities.
    pub fn arb_distinct_entries(max: usize) -> impl Strategy<Value = Vec<CacheEntry>> {
        prop::collection::vec(arb_cache_entry(), 0..max).prop_map(|entries| {
            let mut seen = std::collections::HashSet::new();
            entries
                .into_iter()
                .filter(|entry| seen.insert(entry.identity().clone()))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for the `SimpleModel` scenario.

    use super::*;

    pub fn simple_model_identity() -> IdentityPair {
        IdentityPair::new("SimpleModel", "CodeFirstDatabase").unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn other_identity() -> IdentityPair {
        IdentityPair::new("Other", "DB2").unwrap_or_else(|e| panic!("{e}"))
    }

    /// Entry for `identity` holding the views `MockSchema::new(fingerprint)`
    /// would generate.
    pub fn generated_entry(identity: &IdentityPair, fingerprint: &str) -> CacheEntry {
        let text = MockSchema::expected_view(identity, "Entities", fingerprint);
        let extent = vista_core::qualified_extent_name(identity.secondary(), "Entities");
        CacheEntry::new(
            identity.clone(),
            Fingerprint::new(fingerprint).unwrap_or_else(|e| panic!("{e}")),
            ArtifactMap::from_pairs([(extent, text)]).unwrap_or_else(|e| panic!("{e}")),
        )
    }

    /// Entry that belongs to no identity the scenarios use.
    pub fn unrelated_fragment() -> EntryFragment {
        EntryFragment::new()
            .with_attribute("hash", "a")
            .with_attribute("store-model", "S")
            .with_attribute("conceptual-model", "C")
    }

    /// Document with `SimpleModel` at fingerprint `abc` and `Other` at `xyz`.
    pub fn scenario_document() -> Document {
        Document::from_entries(vec![
            vista_storage::encode_entry(&generated_entry(&simple_model_identity(), "abc")),
            vista_storage::encode_entry(&generated_entry(&other_identity(), "xyz")),
        ])
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for vista error variants.

    use super::*;

    /// Assert that a result is a `NotConfigured` error.
    #[track_caller]
    pub fn assert_not_configured<T: std::fmt::Debug>(result: &VistaResult<T>) {
        match result {
            Err(VistaError::Config(ConfigError::NotConfigured { .. })) => {}
            other => panic!("Expected NotConfigured error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Codec error.
    #[track_caller]
    pub fn assert_codec_error<T: std::fmt::Debug>(result: &VistaResult<T>) {
        match result {
            Err(VistaError::Codec(_)) => {}
            other => panic!("Expected Codec error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Generation error with `count` diagnostics.
    #[track_caller]
    pub fn assert_generation_error<T: std::fmt::Debug>(result: &VistaResult<T>, count: usize) {
        match result {
            Err(VistaError::Generation(e)) => {
                assert_eq!(e.diagnostics.len(), count, "Wrong diagnostic count");
            }
            other => panic!("Expected Generation error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_schema_is_deterministic() {
        let schema = MockSchema::new("abc").with_entity_sets(["Entities", "Orders"]);
        let identity = fixtures::simple_model_identity();

        let first = schema.generate(&identity).unwrap();
        let second = schema.generate(&identity).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.contains("CodeFirstDatabase.Orders"));
        assert_eq!(schema.generate_calls(), 2);
    }

    #[test]
    fn test_mock_schema_overrides() {
        let schema = MockSchema::new("abc");
        let simple = fixtures::simple_model_identity();
        let other = fixtures::other_identity();
        schema.set_fingerprint(&other, "xyz");

        assert_eq!(schema.compute_fingerprint(&simple).unwrap().as_str(), "abc");
        assert_eq!(schema.compute_fingerprint(&other).unwrap().as_str(), "xyz");
        assert_eq!(schema.fingerprint_calls(), 2);
    }

    #[test]
    fn test_generated_entry_matches_schema() {
        let schema = MockSchema::new("abc");
        let identity = fixtures::simple_model_identity();
        let entry = fixtures::generated_entry(&identity, "abc");
        assert_eq!(entry.artifacts(), &schema.generate(&identity).unwrap());
    }

    #[test]
    fn test_failing_schema() {
        let schema = MockSchema::new("abc").failing(vec![Diagnostic::error(2062, "unmapped")]);
        let err = schema.generate(&fixtures::simple_model_identity()).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
    }
}

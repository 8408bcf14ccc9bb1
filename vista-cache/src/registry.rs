//! Instance registry binding caches to schema collaborators

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use vista_core::{ConfigError, FactoryId, VistaError, VistaResult};
use vista_storage::DocumentStore;

use crate::collaborator::SchemaCollaborator;
use crate::orchestrator::ArtifactCache;

static GLOBAL: Lazy<Arc<InstanceRegistry>> = Lazy::new(|| Arc::new(InstanceRegistry::new()));

/// Concurrent map from cache instance to the schema collaborator it serves.
///
/// Registering the same factory twice replaces the earlier binding; hosts
/// are expected to bind once before first use.
#[derive(Default)]
pub struct InstanceRegistry {
    bindings: DashMap<FactoryId, Arc<dyn SchemaCollaborator>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry for hosts that do not own one.
    pub fn global() -> Arc<InstanceRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn register(&self, factory: FactoryId, collaborator: Arc<dyn SchemaCollaborator>) {
        if self.bindings.insert(factory, collaborator).is_some() {
            debug!(factory = %factory, "replaced existing schema binding");
        } else {
            debug!(factory = %factory, "registered schema binding");
        }
    }

    /// Bind `collaborator` to `cache`.
    pub fn bind_schema<S: DocumentStore>(
        &self,
        collaborator: Arc<dyn SchemaCollaborator>,
        cache: &ArtifactCache<S>,
    ) {
        self.register(cache.id(), collaborator);
    }

    pub fn resolve(&self, factory: FactoryId) -> VistaResult<Arc<dyn SchemaCollaborator>> {
        self.bindings
            .get(&factory)
            .map(|binding| Arc::clone(binding.value()))
            .ok_or_else(|| {
                VistaError::Config(ConfigError::NotRegistered {
                    factory_id: factory.as_uuid(),
                })
            })
    }

    pub fn is_registered(&self, factory: FactoryId) -> bool {
        self.bindings.contains_key(&factory)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::{ArtifactMap, Fingerprint, GenerationError, IdentityPair};

    use crate::collaborator::{ArtifactGenerator, Fingerprinter};

    struct Fixed(&'static str);

    impl Fingerprinter for Fixed {
        fn compute_fingerprint(&self, _identity: &IdentityPair) -> VistaResult<Fingerprint> {
            Fingerprint::new(self.0)
        }
    }

    impl ArtifactGenerator for Fixed {
        fn generate(&self, _identity: &IdentityPair) -> Result<ArtifactMap, GenerationError> {
            Ok(ArtifactMap::new())
        }
    }

    fn fingerprint_of(collaborator: &Arc<dyn SchemaCollaborator>) -> String {
        let identity = IdentityPair::new("A", "B").unwrap();
        collaborator
            .compute_fingerprint(&identity)
            .unwrap()
            .as_str()
            .to_string()
    }

    #[test]
    fn test_resolve_unregistered_fails() {
        let registry = InstanceRegistry::new();
        let factory = FactoryId::new();
        let err = registry.resolve(factory).err().unwrap();
        assert_eq!(
            err,
            VistaError::Config(ConfigError::NotRegistered {
                factory_id: factory.as_uuid()
            })
        );
    }

    #[test]
    fn test_register_then_resolve() {
        let registry = InstanceRegistry::new();
        let factory = FactoryId::new();
        let collaborator: Arc<dyn SchemaCollaborator> = Arc::new(Fixed("one"));

        registry.register(factory, collaborator.clone());
        let resolved = registry.resolve(factory).unwrap();
        assert!(Arc::ptr_eq(&resolved, &collaborator));
        assert!(registry.is_registered(factory));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_registration_replaces_first() {
        let registry = InstanceRegistry::new();
        let factory = FactoryId::new();
        registry.register(factory, Arc::new(Fixed("one")));
        registry.register(factory, Arc::new(Fixed("two")));

        assert_eq!(registry.len(), 1);
        assert_eq!(fingerprint_of(&registry.resolve(factory).unwrap()), "two");
    }

    #[test]
    fn test_global_registry_is_shared() {
        let factory = FactoryId::new();
        InstanceRegistry::global().register(factory, Arc::new(Fixed("g")));
        assert!(InstanceRegistry::global().is_registered(factory));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(InstanceRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let factory = FactoryId::new();
                    registry.register(factory, Arc::new(Fixed("t")));
                    registry.resolve(factory).is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.len(), 16);
    }
}

//! Cache-or-generate orchestration
//!
//! Every call re-reads the store, compares the stored fingerprint with the
//! current one, and regenerates only on a miss. The returned lookup is
//! always built from the entry in hand, never re-read after saving, so a
//! caller whose save lost a race still gets correct artifacts.

use std::sync::Arc;

use tracing::{debug, info};

use vista_core::{CacheEntry, ConfigError, FactoryId, IdentityPair, VistaError, VistaResult};
use vista_storage::{decode_entry, encode_entry, DocumentStore, SaveOutcome};

use crate::collaborator::SchemaCollaborator;
use crate::lookup::ArtifactLookup;
use crate::registry::InstanceRegistry;

/// Why a call had to regenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegenerationReason {
    /// No stored entry for the identity pair.
    Absent,
    /// Stored entry was generated for a different fingerprint.
    FingerprintMismatch,
}

/// How a call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
    Hit,
    Regenerated {
        reason: RegenerationReason,
        save: SaveOutcome,
    },
}

/// Artifacts plus how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResolution {
    pub lookup: ArtifactLookup,
    pub outcome: CacheOutcome,
}

impl CacheResolution {
    pub fn is_hit(&self) -> bool {
        matches!(self.outcome, CacheOutcome::Hit)
    }
}

/// One view artifact cache over a document store.
///
/// The schema collaborator is looked up in the registry on every call, so
/// the cache can be built before the host binds its schema.
pub struct ArtifactCache<S> {
    id: FactoryId,
    store: S,
    registry: Arc<InstanceRegistry>,
}

impl<S: DocumentStore> ArtifactCache<S> {
    pub fn new(store: S, registry: Arc<InstanceRegistry>) -> Self {
        Self::with_id(FactoryId::new(), store, registry)
    }

    pub fn with_id(id: FactoryId, store: S, registry: Arc<InstanceRegistry>) -> Self {
        Self {
            id,
            store,
            registry,
        }
    }

    pub fn id(&self) -> FactoryId {
        self.id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Artifacts for `identity`, generating and persisting them on a miss.
    pub fn get_artifacts(&self, identity: &IdentityPair) -> VistaResult<ArtifactLookup> {
        Ok(self.resolve(identity)?.lookup)
    }

    /// Like [`get_artifacts`](Self::get_artifacts), also reporting whether
    /// the call hit, and how the save went on a miss.
    pub fn resolve(&self, identity: &IdentityPair) -> VistaResult<CacheResolution> {
        let collaborator = self.collaborator()?;
        let current = collaborator.compute_fingerprint(identity)?;

        let loaded = self.store.load(identity)?;
        let reason = match loaded.as_ref().and_then(|document| document.find(identity)) {
            Some(fragment) if fragment.fingerprint() == Some(current.as_str()) => {
                let entry = decode_entry(fragment)?;
                debug!(
                    factory = %self.id,
                    primary = identity.primary(),
                    secondary = identity.secondary(),
                    fingerprint = %current,
                    "view cache hit"
                );
                return Ok(CacheResolution {
                    lookup: ArtifactLookup::from(entry),
                    outcome: CacheOutcome::Hit,
                });
            }
            Some(_) => RegenerationReason::FingerprintMismatch,
            None => RegenerationReason::Absent,
        };

        info!(
            factory = %self.id,
            primary = identity.primary(),
            secondary = identity.secondary(),
            fingerprint = %current,
            ?reason,
            "generating views"
        );
        let artifacts = collaborator.generate(identity)?;
        let entry = CacheEntry::new(identity.clone(), current, artifacts);

        let mut document = loaded.unwrap_or_default();
        document.replace(encode_entry(&entry));
        let save = self.store.save(&document)?;
        if save == SaveOutcome::SuppressedByRace {
            debug!(
                factory = %self.id,
                primary = identity.primary(),
                secondary = identity.secondary(),
                "views saved by another writer first"
            );
        }

        Ok(CacheResolution {
            lookup: ArtifactLookup::from(entry),
            outcome: CacheOutcome::Regenerated { reason, save },
        })
    }

    fn collaborator(&self) -> VistaResult<Arc<dyn SchemaCollaborator>> {
        self.registry.resolve(self.id).map_err(|e| match e {
            VistaError::Config(ConfigError::NotRegistered { factory_id }) => {
                VistaError::Config(ConfigError::NotConfigured { factory_id })
            }
            other => other,
        })
    }
}

impl<S> std::fmt::Debug for ArtifactCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache").field("id", &self.id).finish()
    }
}

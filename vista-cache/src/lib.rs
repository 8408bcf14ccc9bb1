//! VISTA Cache - Generate Once, Cache Forever
//!
//! [`ArtifactCache`] returns stored view artifacts while their fingerprint
//! still matches the schema, and otherwise regenerates, persists and
//! returns fresh ones. The schema side is supplied by the host through
//! [`SchemaCollaborator`], bound to a cache in an [`InstanceRegistry`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use vista_cache::{ArtifactCache, InstanceRegistry};
//! use vista_core::{IdentityPair, StoreConfig};
//! # fn schema() -> Arc<dyn vista_cache::SchemaCollaborator> { unimplemented!() }
//!
//! # fn main() -> vista_core::VistaResult<()> {
//! let store = vista_storage::open_store(&StoreConfig::file("views.xml"))?;
//! let registry = InstanceRegistry::global();
//! let cache = ArtifactCache::new(store, registry.clone());
//! registry.bind_schema(schema(), &cache);
//!
//! let identity = IdentityPair::new("SimpleModel", "CodeFirstDatabase")?;
//! let views = cache.get_artifacts(&identity)?;
//! let _sql = views.get("CodeFirstDatabase.Entity");
//! # Ok(())
//! # }
//! ```

pub mod collaborator;
pub mod lookup;
pub mod orchestrator;
pub mod registry;

pub use collaborator::{ArtifactGenerator, Fingerprinter, SchemaCollaborator};
pub use lookup::ArtifactLookup;
pub use orchestrator::{ArtifactCache, CacheOutcome, CacheResolution, RegenerationReason};
pub use registry::InstanceRegistry;

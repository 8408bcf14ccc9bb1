//! Schema collaborator interfaces
//!
//! The cache never looks inside a schema. It asks a collaborator for a
//! cheap fingerprint and, on a miss, for the expensive generated views.

use vista_core::{ArtifactMap, Fingerprint, GenerationError, IdentityPair, VistaResult};

/// Computes the current fingerprint of a schema mapping.
///
/// Must be cheap next to [`ArtifactGenerator::generate`].
pub trait Fingerprinter {
    fn compute_fingerprint(&self, identity: &IdentityPair) -> VistaResult<Fingerprint>;
}

/// Generates the view artifacts for a schema mapping.
///
/// Must be deterministic for a fixed schema: two calls with the same
/// fingerprint produce equivalent artifacts.
pub trait ArtifactGenerator {
    fn generate(&self, identity: &IdentityPair) -> Result<ArtifactMap, GenerationError>;
}

/// Everything the cache needs from a schema, shareable across threads.
pub trait SchemaCollaborator: Fingerprinter + ArtifactGenerator + Send + Sync {}

impl<T> SchemaCollaborator for T where T: Fingerprinter + ArtifactGenerator + Send + Sync {}

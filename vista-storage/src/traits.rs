//! Document store capability

use vista_core::{Document, IdentityPair, VistaResult};

/// Result of a completed save attempt.
///
/// Failures are the `Err` arm of [`DocumentStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveOutcome {
    /// The document is now durably visible.
    Saved,
    /// Another writer got there first and the save was skipped.
    SuppressedByRace,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Storage for views documents.
///
/// Implementations must be safe to share between threads; every call does
/// its own blocking I/O.
pub trait DocumentStore: Send + Sync {
    /// Load the document that may hold the entry for `identity`.
    ///
    /// Flat stores ignore `identity` and return the whole document. Row
    /// stores return a document holding only the matching row's entry.
    /// `Ok(None)` means nothing is stored yet.
    fn load(&self, identity: &IdentityPair) -> VistaResult<Option<Document>>;

    /// Persist `document`. Never leaves a partially written document.
    fn save(&self, document: &Document) -> VistaResult<SaveOutcome>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn load(&self, identity: &IdentityPair) -> VistaResult<Option<Document>> {
        (**self).load(identity)
    }

    fn save(&self, document: &Document) -> VistaResult<SaveOutcome> {
        (**self).save(document)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    fn load(&self, identity: &IdentityPair) -> VistaResult<Option<Document>> {
        (**self).load(identity)
    }

    fn save(&self, document: &Document) -> VistaResult<SaveOutcome> {
        (**self).save(document)
    }
}

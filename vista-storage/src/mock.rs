//! In-memory document store for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use vista_core::{Document, IdentityPair, StorageError, VistaResult};

use crate::traits::{DocumentStore, SaveOutcome};

/// In-memory mock document store.
///
/// Holds a single document, like the flat-file store. With
/// `first_writer_wins` set, a save over an existing document is skipped.
#[derive(Debug, Default, Clone)]
pub struct MockDocumentStore {
    document: Arc<RwLock<Option<Document>>>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
    first_writer_wins: bool,
}

impl MockDocumentStore {
    /// Create an empty mock store that overwrites on save.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mock store that keeps the first saved document.
    pub fn first_writer_wins() -> Self {
        Self {
            first_writer_wins: true,
            ..Self::default()
        }
    }

    /// Create a mock store already holding `document`.
    pub fn with_document(document: Document) -> Self {
        let store = Self::new();
        store.set_document(Some(document));
        store
    }

    /// Replace the stored document directly, bypassing save counting.
    pub fn set_document(&self, document: Option<Document>) {
        if let Ok(mut slot) = self.document.write() {
            *slot = document;
        }
    }

    /// Current stored document.
    pub fn document(&self) -> Option<Document> {
        self.document.read().ok().and_then(|slot| slot.clone())
    }

    /// Number of `load` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `save` calls so far, suppressed ones included.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MockDocumentStore {
    fn load(&self, _identity: &IdentityPair) -> VistaResult<Option<Document>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let slot = self.document.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(slot.clone())
    }

    fn save(&self, document: &Document) -> VistaResult<SaveOutcome> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.document.write().map_err(|_| StorageError::LockPoisoned)?;
        if self.first_writer_wins && slot.is_some() {
            return Ok(SaveOutcome::SuppressedByRace);
        }
        *slot = Some(document.clone());
        Ok(SaveOutcome::Saved)
    }
}

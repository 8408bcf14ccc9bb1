//! Flat-file document store
//!
//! The whole document lives in one file. The first writer wins: once the
//! file exists it is never overwritten. Concurrent writers inside this
//! process are serialized by a mutex; writers in other processes are
//! detected when linking the new file into place fails because the target
//! already exists.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use vista_core::{
    Document, FileStoreConfig, IdentityPair, StorageError, VistaError, VistaResult,
};

use crate::codec::{parse_document, write_document};
use crate::traits::{DocumentStore, SaveOutcome};

/// Windows `ERROR_SHARING_VIOLATION`.
const SHARING_VIOLATION: i32 = 32;

/// Document store backed by a single XML file.
#[derive(Debug)]
pub struct FileDocumentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &FileStoreConfig) -> VistaResult<Self> {
        config.validate()?;
        Ok(Self::new(config.path.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, error: &io::Error) -> VistaError {
        VistaError::Storage(StorageError::Io {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        })
    }

    fn write_new(&self, contents: &str) -> VistaResult<SaveOutcome> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(&e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(&e))?;
        temp.write_all(contents.as_bytes())
            .map_err(|e| self.io_error(&e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(&e))?;

        match temp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(path = %self.path.display(), "views document written");
                Ok(SaveOutcome::Saved)
            }
            Err(e) if is_race(&e.error) => {
                debug!(
                    path = %self.path.display(),
                    error = %e.error,
                    "views document created by another writer; save skipped"
                );
                Ok(SaveOutcome::SuppressedByRace)
            }
            Err(e) => Err(self.io_error(&e.error)),
        }
    }
}

/// Whether a create failure means someone else owns the target now.
fn is_race(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::AlreadyExists
        || (cfg!(windows) && error.raw_os_error() == Some(SHARING_VIOLATION))
}

impl DocumentStore for FileDocumentStore {
    /// Best effort: an unreadable or unparsable file reads as absent.
    fn load(&self, _identity: &IdentityPair) -> VistaResult<Option<Document>> {
        let _guard = self.lock.lock().map_err(|_| StorageError::LockPoisoned)?;

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read views document; treating as absent");
                return Ok(None);
            }
        };

        match parse_document(&contents) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot parse views document; treating as absent");
                Ok(None)
            }
        }
    }

    fn save(&self, document: &Document) -> VistaResult<SaveOutcome> {
        let contents = write_document(document)?;

        let _guard = self.lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        if self.path.exists() {
            debug!(path = %self.path.display(), "views document already exists; save skipped");
            return Ok(SaveOutcome::SuppressedByRace);
        }
        self.write_new(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::{EntryFragment, ViewFragment};

    fn identity() -> IdentityPair {
        IdentityPair::new("SimpleModel", "CodeFirstDatabase").unwrap()
    }

    fn document(hash: &str) -> Document {
        Document::from_entries(vec![EntryFragment::new()
            .with_attribute("hash", hash)
            .with_attribute("conceptual-container", "SimpleModel")
            .with_attribute("store-container", "CodeFirstDatabase")
            .with_view(ViewFragment::new("CodeFirstDatabase.Entity", "SELECT 1"))])
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("views.xml"));
        assert_eq!(store.load(&identity()).unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("views.xml"));

        assert_eq!(store.save(&document("abc")).unwrap(), SaveOutcome::Saved);
        assert_eq!(store.load(&identity()).unwrap(), Some(document("abc")));
    }

    #[test]
    fn test_first_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.xml");
        let store = FileDocumentStore::new(&path);

        store.save(&document("abc")).unwrap();
        let before = fs::read(&path).unwrap();

        assert_eq!(
            store.save(&document("other")).unwrap(),
            SaveOutcome::SuppressedByRace
        );
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_existing_foreign_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.xml");
        fs::write(&path, "not xml at all").unwrap();
        let store = FileDocumentStore::new(&path);

        assert_eq!(store.load(&identity()).unwrap(), None);
        assert_eq!(
            store.save(&document("abc")).unwrap(),
            SaveOutcome::SuppressedByRace
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "not xml at all");
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache").join("views.xml");
        let store = FileDocumentStore::new(&path);

        assert_eq!(store.save(&document("abc")).unwrap(), SaveOutcome::Saved);
        assert!(path.exists());
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("views.xml"));
        store.save(&document("abc")).unwrap();
        store.save(&document("def")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("views.xml")]);
    }

    #[test]
    fn test_race_detection_is_narrow() {
        assert!(is_race(&io::Error::from(io::ErrorKind::AlreadyExists)));
        assert!(!is_race(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_race(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[test]
    fn test_link_onto_existing_target_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.xml");
        fs::write(&path, "first").unwrap();
        let store = FileDocumentStore::new(&path);

        assert_eq!(
            store.write_new("second").unwrap(),
            SaveOutcome::SuppressedByRace
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("views.xml")]);
    }

    #[test]
    fn test_separate_stores_on_one_path_keep_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.xml");
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = FileDocumentStore::new(&path);
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    store.save(&document(&format!("h{}", i))).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<SaveOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_saved()).count(), 1);
        let stored = FileDocumentStore::new(&path).load(&identity()).unwrap().unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_concurrent_saves_keep_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileDocumentStore::new(dir.path().join("views.xml")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.save(&document(&format!("h{}", i))).unwrap())
            })
            .collect();
        let outcomes: Vec<SaveOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_saved()).count(), 1);
        assert!(store.load(&identity()).unwrap().is_some());
    }
}

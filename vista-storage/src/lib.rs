//! VISTA Storage - Document Codec and Backing Stores
//!
//! Defines the [`DocumentStore`] capability and its two backing stores:
//! a flat XML file where the first writer wins, and a SQLite table with
//! one upserted row per identity pair. The XML codec shared by both lives
//! in [`codec`].

pub mod codec;
pub mod file_store;
pub mod mock;
pub mod row_store;
pub mod traits;

pub use codec::{decode_entry, encode_entry, parse_document, write_document};
pub use file_store::FileDocumentStore;
pub use mock::MockDocumentStore;
pub use row_store::{SqliteRowStore, StoredRow, MAX_KEY_LENGTH};
pub use traits::{DocumentStore, SaveOutcome};

use tracing::debug;
use vista_core::{StoreConfig, VistaResult};

/// Open the backing store selected by `config`.
pub fn open_store(config: &StoreConfig) -> VistaResult<Box<dyn DocumentStore>> {
    config.validate()?;
    match config {
        StoreConfig::File(file) => {
            debug!(path = %file.path.display(), "opening file document store");
            Ok(Box::new(FileDocumentStore::from_config(file)?))
        }
        StoreConfig::Sqlite(row) => {
            debug!(
                database = %row.database_path.display(),
                table = %row.table_name,
                "opening sqlite row store"
            );
            Ok(Box::new(SqliteRowStore::open(row.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::{Document, IdentityPair, RowStoreConfig};

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&StoreConfig::file(dir.path().join("views.xml"))).unwrap();
        let identity = IdentityPair::new("A", "B").unwrap();
        assert_eq!(store.load(&identity).unwrap(), None);
        assert_eq!(store.save(&Document::new()).unwrap(), SaveOutcome::Saved);
        assert_eq!(store.load(&identity).unwrap(), Some(Document::new()));
    }

    #[test]
    fn test_open_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Sqlite(RowStoreConfig::new(dir.path().join("views.db")));
        let store = open_store(&config).unwrap();
        assert_eq!(store.load(&IdentityPair::new("A", "B").unwrap()).unwrap(), None);
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        assert!(open_store(&StoreConfig::file("")).is_err());
    }
}

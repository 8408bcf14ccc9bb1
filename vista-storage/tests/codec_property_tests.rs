//! Property-Based Tests for the Views Document Codec
//!
//! For any valid cache entry, decoding its encoding gives the entry back,
//! and a document written to XML and read again is the same document.
//! Both stores depend on this: the flat file holds the whole document and
//! each row holds a single-entry document.

use proptest::prelude::*;
use vista_core::{Document, EntryFragment};
use vista_storage::{
    decode_entry, encode_entry, parse_document, write_document, DocumentStore, SqliteRowStore,
};
use vista_test_utils::fixtures;
use vista_test_utils::generators::{arb_cache_entry, arb_distinct_entries};

fn document_of(entries: &[vista_core::CacheEntry]) -> Document {
    Document::from_entries(entries.iter().map(encode_entry).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_entry_round_trip(entry in arb_cache_entry()) {
        let decoded = decode_entry(&encode_entry(&entry));
        prop_assert_eq!(decoded, Ok(entry));
    }

    #[test]
    fn prop_document_round_trip(entries in arb_distinct_entries(6)) {
        let document = document_of(&entries);
        let xml = write_document(&document)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let parsed = parse_document(&xml)
            .map_err(|e| TestCaseError::fail(format!("{e}\n{xml}")))?;

        prop_assert_eq!(&parsed, &document);
        for (fragment, entry) in parsed.entries().iter().zip(&entries) {
            let decoded = decode_entry(fragment);
            prop_assert_eq!(decoded.as_ref(), Ok(entry));
        }
    }

    #[test]
    fn prop_written_xml_is_stable(entries in arb_distinct_entries(4)) {
        let first = write_document(&document_of(&entries))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let reparsed = parse_document(&first)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = write_document(&reparsed)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_unrelated_fragment_survives_rewrite(entry in arb_cache_entry()) {
        let mut document = Document::from_entries(vec![fixtures::unrelated_fragment()]);
        document.replace(encode_entry(&entry));

        let xml = write_document(&document)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let parsed = parse_document(&xml)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(parsed.len(), 2);
        prop_assert_eq!(&parsed.entries()[0], &fixtures::unrelated_fragment());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    #[test]
    fn prop_row_store_round_trip(entries in arb_distinct_entries(4)) {
        let store = SqliteRowStore::in_memory()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        store
            .save(&document_of(&entries))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for entry in &entries {
            let loaded = store
                .load(entry.identity())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let fragments: Vec<EntryFragment> =
                loaded.map(|d| d.entries().to_vec()).unwrap_or_default();
            prop_assert_eq!(fragments.len(), 1);
            let decoded = decode_entry(&fragments[0]);
            prop_assert_eq!(decoded.as_ref(), Ok(entry));
        }
    }
}

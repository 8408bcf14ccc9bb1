//! In-memory model of a persisted views document
//!
//! A document is an ordered list of `mapping-views` fragments. Fragments are
//! kept in their raw attribute/child form so that entries this process does
//! not touch are written back exactly as they were read, unknown attributes
//! included.

use crate::IdentityPair;

/// Root element of a views document.
pub const ROOT_ELEMENT: &str = "views";
/// One cache entry.
pub const ENTRY_ELEMENT: &str = "mapping-views";
/// One extent's artifact text.
pub const VIEW_ELEMENT: &str = "view";

pub const FINGERPRINT_ATTR: &str = "hash";
pub const PRIMARY_ATTR: &str = "conceptual-container";
pub const SECONDARY_ATTR: &str = "store-container";
pub const EXTENT_ATTR: &str = "extent";

/// A `view` child element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFragment {
    pub extent: Option<String>,
    pub text: String,
}

impl ViewFragment {
    pub fn new(extent: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            extent: Some(extent.into()),
            text: text.into(),
        }
    }
}

/// A `mapping-views` element, attributes in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFragment {
    pub attributes: Vec<(String, String)>,
    pub views: Vec<ViewFragment>,
}

impl EntryFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_view(mut self, view: ViewFragment) -> Self {
        self.views.push(view);
        self
    }

    /// First value of attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Raw stored fingerprint, not validated.
    pub fn fingerprint(&self) -> Option<&str> {
        self.attribute(FINGERPRINT_ATTR)
    }

    pub fn matches(&self, identity: &IdentityPair) -> bool {
        self.matches_names(identity.primary(), identity.secondary())
    }

    fn matches_names(&self, primary: &str, secondary: &str) -> bool {
        self.attribute(PRIMARY_ATTR) == Some(primary)
            && self.attribute(SECONDARY_ATTR) == Some(secondary)
    }
}

/// Ordered collection of entry fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: Vec<EntryFragment>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<EntryFragment>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[EntryFragment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, identity: &IdentityPair) -> Option<&EntryFragment> {
        self.entries.iter().find(|entry| entry.matches(identity))
    }

    /// Remove every fragment with the same identity as `fragment`, then
    /// append it. Other fragments keep their relative order.
    ///
    /// A fragment lacking either identity attribute matches nothing, so it
    /// is appended without removing anything; replacing with it twice
    /// leaves two copies. Fragments built by `encode_entry` always carry
    /// both attributes.
    pub fn replace(&mut self, fragment: EntryFragment) {
        if let (Some(primary), Some(secondary)) = (
            fragment.attribute(PRIMARY_ATTR),
            fragment.attribute(SECONDARY_ATTR),
        ) {
            self.entries
                .retain(|entry| !entry.matches_names(primary, secondary));
        }
        self.entries.push(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(primary: &str, secondary: &str, hash: &str) -> EntryFragment {
        EntryFragment::new()
            .with_attribute(FINGERPRINT_ATTR, hash)
            .with_attribute(PRIMARY_ATTR, primary)
            .with_attribute(SECONDARY_ATTR, secondary)
    }

    #[test]
    fn test_find_by_identity() {
        let doc = Document::from_entries(vec![
            fragment("SimpleModel", "CodeFirstDatabase", "abc"),
            fragment("Other", "DB2", "xyz"),
        ]);
        let identity = IdentityPair::new("Other", "DB2").unwrap();
        assert_eq!(doc.find(&identity).and_then(|e| e.fingerprint()), Some("xyz"));

        let missing = IdentityPair::new("Other", "DB3").unwrap();
        assert!(doc.find(&missing).is_none());
    }

    #[test]
    fn test_replace_moves_entry_to_end() {
        let mut doc = Document::from_entries(vec![
            fragment("SimpleModel", "CodeFirstDatabase", "abc"),
            fragment("Other", "DB2", "xyz"),
        ]);
        doc.replace(fragment("SimpleModel", "CodeFirstDatabase", "abc2"));

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.entries()[0], fragment("Other", "DB2", "xyz"));
        assert_eq!(doc.entries()[1].fingerprint(), Some("abc2"));
    }

    #[test]
    fn test_replace_keeps_unrelated_attributes() {
        let unrelated = EntryFragment::new()
            .with_attribute("hash", "a")
            .with_attribute("store-model", "S")
            .with_attribute("conceptual-model", "C");
        let mut doc = Document::from_entries(vec![unrelated.clone()]);
        doc.replace(fragment("C", "S", "b"));

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.entries()[0], unrelated);
    }

    #[test]
    fn test_replace_appends_to_empty() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        doc.replace(fragment("A", "B", "h"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_replace_without_identity_only_appends() {
        let mut doc = Document::from_entries(vec![fragment("A", "B", "h1")]);
        let anonymous = EntryFragment::new().with_attribute(FINGERPRINT_ATTR, "h2");

        doc.replace(anonymous.clone());
        doc.replace(anonymous.clone());

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.entries()[0], fragment("A", "B", "h1"));
        assert_eq!(doc.entries()[1], anonymous);
        assert_eq!(doc.entries()[2], anonymous);
    }

    #[test]
    fn test_attribute_returns_first() {
        let entry = EntryFragment::new()
            .with_attribute("hash", "first")
            .with_attribute("hash", "second");
        assert_eq!(entry.fingerprint(), Some("first"));
        assert_eq!(entry.attribute("missing"), None);
    }
}

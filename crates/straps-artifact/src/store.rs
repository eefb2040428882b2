//! Declaration store
//!
//! Ordered view of one source unit: top-level declarations interleaved with
//! verbatim content that is never reordered. The store is an owned value;
//! callers that mutate it hold it by `&mut`.

use crate::declaration::{Declaration, Item};
use crate::hash::ContentHash;
use crate::python::{self, Entry, ParseError};

/// Separator placed before declarations inserted during a session
const INSERT_SEPARATOR: &str = "\n\n\n";

/// Store operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("item at index {0} is not a declaration")]
    NotADeclaration(usize),
}

/// Structural representation of a source unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationStore {
    entries: Vec<Entry>,
    trailer: String,
}

impl DeclarationStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse Python source into a store
    ///
    /// # Errors
    /// Returns [`ParseError::SyntaxError`] if the source does not parse cleanly
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let module = python::parse_module(source)?;
        Ok(Self {
            entries: module.entries,
            trailer: module.trailer,
        })
    }

    /// Name and documentation of every declaration, in store order
    #[must_use]
    pub fn list(&self) -> Vec<(&str, Option<&str>)> {
        self.declarations()
            .map(|d| (d.name(), d.documentation()))
            .collect()
    }

    /// All declarations named `name`
    #[must_use]
    pub fn find(&self, name: &str) -> Vec<&Declaration> {
        self.declarations().filter(|d| d.name() == name).collect()
    }

    /// Top-level indices of all declarations named `name`
    #[must_use]
    pub fn positions(&self, name: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.item.as_declaration().is_some_and(|d| d.name() == name))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether any declaration is named `name`
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.declarations().any(|d| d.name() == name)
    }

    /// Canonical text of the first declaration named `name`
    #[must_use]
    pub fn show(&self, name: &str) -> Option<&str> {
        self.declarations()
            .find(|d| d.name() == name)
            .map(Declaration::text)
    }

    /// Append a declaration at the end of the unit
    pub fn insert(&mut self, declaration: Declaration) {
        let leading = if self.entries.is_empty() {
            String::new()
        } else {
            INSERT_SEPARATOR.to_string()
        };
        if self.trailer.is_empty() {
            self.trailer.push('\n');
        }
        self.entries.push(Entry {
            leading,
            item: Item::Declaration(declaration),
        });
    }

    /// Replace the declaration at a top-level index, keeping its position
    ///
    /// # Errors
    /// Fails if the index is out of range or holds verbatim content
    pub fn replace_at(
        &mut self,
        index: usize,
        declaration: Declaration,
    ) -> Result<Declaration, StoreError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;
        match &mut entry.item {
            Item::Declaration(existing) => Ok(std::mem::replace(existing, declaration)),
            Item::Verbatim(_) => Err(StoreError::NotADeclaration(index)),
        }
    }

    /// Remove every declaration named `name`, returning how many were removed
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.item.as_declaration().map_or(true, |d| d.name() != name));
        before - self.entries.len()
    }

    /// All top-level items in order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|e| &e.item)
    }

    /// All declarations in order
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items().filter_map(Item::as_declaration)
    }

    /// Number of declarations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations().count()
    }

    /// Check if the store holds no declarations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations().next().is_none()
    }

    /// Serialize back to source text
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.leading);
            out.push_str(entry.item.text());
        }
        out.push_str(&self.trailer);
        out
    }

    /// Fingerprint of the serialized unit
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::compute(self.serialize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const SOURCE: &str = r#"import os

LIMIT = 3


def add(a, b):
    """Add two numbers.

    Returns the sum.
    """
    return a + b


async def fetch(url):
    return url


def add(x):
    return x
"#;

    fn store() -> DeclarationStore {
        DeclarationStore::parse(SOURCE).unwrap()
    }

    #[test]
    fn unmodified_store_round_trips_exactly() {
        assert_eq!(store().serialize(), SOURCE);
    }

    #[test]
    fn list_is_in_store_order_with_docs() {
        let store = store();
        let listed = store.list();
        assert_eq!(
            listed,
            vec![
                ("add", Some("Add two numbers.\n\nReturns the sum.")),
                ("fetch", None),
                ("add", None),
            ]
        );
    }

    #[test]
    fn find_returns_every_match() {
        let store = store();
        assert_eq!(store.find("add").len(), 2);
        assert_eq!(store.find("fetch").len(), 1);
        assert!(store.find("missing").is_empty());
        assert_eq!(store.positions("add"), vec![2, 4]);
    }

    #[test]
    fn show_returns_first_match() {
        let store = store();
        let shown = store.show("add").unwrap();
        assert!(shown.starts_with("def add(a, b):"));
        assert!(store.show("missing").is_none());
    }

    #[test]
    fn insert_appends_after_everything() {
        let mut store = store();
        let new = DeclarationStore::parse("def sub(a, b):\n    return a - b\n").unwrap();
        let decl = new.declarations().next().unwrap().clone().detached();
        store.insert(decl);

        let names: Vec<_> = store.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["add", "fetch", "add", "sub"]);
        assert!(store.serialize().ends_with("return x\n\n\ndef sub(a, b):\n    return a - b\n"));
    }

    #[test]
    fn insert_into_empty_store() {
        let mut store = DeclarationStore::new();
        let new = DeclarationStore::parse("def f(): pass").unwrap();
        store.insert(new.declarations().next().unwrap().clone());
        assert_eq!(store.serialize(), "def f(): pass\n");
    }

    #[test]
    fn replace_at_keeps_position() {
        let mut store = store();
        let new = DeclarationStore::parse("def fetch(url):\n    return None\n").unwrap();
        let decl = new.declarations().next().unwrap().clone();

        let old = store.replace_at(3, decl).unwrap();
        assert_eq!(old.name(), "fetch");
        assert_eq!(store.positions("fetch"), vec![3]);
        assert_eq!(store.show("fetch"), Some("def fetch(url):\n    return None"));
    }

    #[test]
    fn replace_at_rejects_verbatim_and_out_of_range() {
        let mut store = store();
        let decl = store.declarations().next().unwrap().clone();
        assert_eq!(
            store.replace_at(0, decl.clone()),
            Err(StoreError::NotADeclaration(0))
        );
        assert_eq!(
            store.replace_at(42, decl),
            Err(StoreError::IndexOutOfRange { index: 42, len: 5 })
        );
    }

    #[test]
    fn remove_all_drops_every_match() {
        let mut store = store();
        assert_eq!(store.remove_all("add"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove_all("add"), 0);
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let mut store = store();
        let before = store.fingerprint();
        store.remove_all("fetch");
        assert_ne!(before, store.fingerprint());
    }

    const KEYWORDS: &[&str] = &[
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
        "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
        "yield",
    ];

    fn identifier() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}".prop_filter("python keyword", |n| !KEYWORDS.contains(&n.as_str()))
    }

    proptest! {
        #[test]
        fn reparse_preserves_names_and_docs(
            names in proptest::collection::vec(identifier(), 0..6),
            with_doc in any::<bool>(),
        ) {
            let source: String = names
                .iter()
                .map(|n| if with_doc {
                    format!("def {n}(x):\n    \"\"\"Doc of {n}.\"\"\"\n    return x\n\n\n")
                } else {
                    format!("def {n}(x):\n    return x\n\n\n")
                })
                .collect();

            let store = DeclarationStore::parse(&source).unwrap();
            let reparsed = DeclarationStore::parse(&store.serialize()).unwrap();

            prop_assert_eq!(store.list(), reparsed.list());
            let listed: Vec<&str> = reparsed.list().into_iter().map(|(n, _)| n).collect();
            let expected: Vec<&str> = names.iter().map(String::as_str).collect();
            prop_assert_eq!(listed, expected);
        }
    }
}

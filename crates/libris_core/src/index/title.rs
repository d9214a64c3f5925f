//! Title index for listing books alphabetically.

use crate::entity::BookId;
use std::collections::{BTreeMap, BTreeSet};

/// Exact titles in lexicographic order.
///
/// Unlike the other indexes this one is kept exact: removing a book removes
/// its entry.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    entries: BTreeMap<String, BTreeSet<BookId>>,
}

impl TitleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `book_id` under `title`.
    pub fn insert(&mut self, title: &str, book_id: BookId) {
        self.entries
            .entry(title.to_string())
            .or_default()
            .insert(book_id);
    }

    /// Drops `book_id` from `title`. Returns true if it was present.
    pub fn remove(&mut self, title: &str, book_id: &BookId) -> bool {
        let Some(ids) = self.entries.get_mut(title) else {
            return false;
        };
        let removed = ids.remove(book_id);
        if ids.is_empty() {
            self.entries.remove(title);
        }
        removed
    }

    /// All `(title, id)` pairs ordered by title, then ID.
    #[must_use]
    pub fn scan_ordered(&self) -> Vec<(String, BookId)> {
        self.entries
            .iter()
            .flat_map(|(title, ids)| ids.iter().map(move |id| (title.clone(), id.clone())))
            .collect()
    }

    /// Number of indexed books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_by_title_then_id() {
        let mut index = TitleIndex::new();
        index.insert("Walden", BookId::new("2"));
        index.insert("Emma", BookId::new("9"));
        index.insert("Emma", BookId::new("1"));

        let titles: Vec<_> = index
            .scan_ordered()
            .into_iter()
            .map(|(title, id)| format!("{title}/{id}"))
            .collect();
        assert_eq!(titles, vec!["Emma/1", "Emma/9", "Walden/2"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn remove_drops_empty_titles() {
        let mut index = TitleIndex::new();
        index.insert("Emma", BookId::new("1"));
        assert!(!index.remove("Emma", &BookId::new("2")));
        assert!(index.remove("Emma", &BookId::new("1")));
        assert!(index.is_empty());
        assert!(!index.remove("Emma", &BookId::new("1")));
    }
}

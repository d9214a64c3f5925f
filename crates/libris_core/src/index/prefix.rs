//! Prefix index (trie) for autocompletion.

use crate::entity::BookId;
use std::collections::{BTreeMap, BTreeSet};

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    children: BTreeMap<char, usize>,
    terminal: bool,
    postings: Vec<BookId>,
}

/// Trie over lower-cased search terms.
///
/// Nodes live in an arena and refer to their children by index. A terminal
/// node carries the posting list of books indexed under that term.
///
/// ```
/// use libris_core::index::PrefixIndex;
/// use libris_core::BookId;
///
/// let mut index = PrefixIndex::new();
/// index.index_term("Dune", &BookId::new("b1"));
/// index.insert("dungeon");
///
/// let terms = index.prefix_search("DUN");
/// assert_eq!(terms.len(), 2);
/// assert_eq!(index.candidates("dune"), &[BookId::new("b1")]);
/// ```
#[derive(Debug, Clone)]
pub struct PrefixIndex {
    nodes: Vec<Node>,
    terms: usize,
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            terms: 0,
        }
    }

    /// Inserts a term, lower-cased. Runs in O(term length).
    pub fn insert(&mut self, term: &str) {
        self.insert_node(&term.to_lowercase());
    }

    /// Inserts `text` as a term and records `book_id` under it.
    ///
    /// Blank text is ignored. Re-indexing the same pair is a no-op.
    pub fn index_term(&mut self, text: &str, book_id: &BookId) {
        let term = text.trim().to_lowercase();
        if term.is_empty() {
            return;
        }
        let node = self.insert_node(&term);
        let postings = &mut self.nodes[node].postings;
        if !postings.contains(book_id) {
            postings.push(book_id.clone());
        }
    }

    fn insert_node(&mut self, term: &str) -> usize {
        let mut current = ROOT;
        for c in term.chars() {
            current = match self.nodes[current].children.get(&c) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[current].children.insert(c, child);
                    child
                }
            };
        }
        if !self.nodes[current].terminal {
            self.nodes[current].terminal = true;
            self.terms += 1;
        }
        current
    }

    fn find(&self, path: &str) -> Option<usize> {
        path.chars().try_fold(ROOT, |node, c| {
            self.nodes[node].children.get(&c).copied()
        })
    }

    /// Returns every inserted term starting with `prefix` (case-insensitive).
    ///
    /// An empty prefix matches every term. Callers must not rely on the
    /// order of the returned set.
    #[must_use]
    pub fn prefix_search(&self, prefix: &str) -> BTreeSet<String> {
        let prefix = prefix.to_lowercase();
        let mut found = BTreeSet::new();
        let Some(start) = self.find(&prefix) else {
            return found;
        };

        let mut stack = vec![(start, prefix)];
        while let Some((node, path)) = stack.pop() {
            let node = &self.nodes[node];
            if node.terminal {
                found.insert(path.clone());
            }
            for (&c, &child) in &node.children {
                let mut next = path.clone();
                next.push(c);
                stack.push((child, next));
            }
        }
        found
    }

    /// Books recorded under an exact term. Empty if the term is unknown.
    #[must_use]
    pub fn candidates(&self, term: &str) -> &[BookId] {
        match self.find(&term.to_lowercase()) {
            Some(node) => &self.nodes[node].postings,
            None => &[],
        }
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms
    }

    /// Number of trie nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Removes every term.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

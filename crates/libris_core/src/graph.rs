//! Co-occurrence graph and recommendations.
//!
//! Books are vertices; the weight of an edge counts how often the two books
//! appear together in users' loan histories. Weights are symmetric at all
//! times. The graph is derived state: it is rebuilt from loan histories when
//! a catalog is opened and is never persisted.

use crate::entity::{BookId, CatalogStore, User, UserId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Undirected weighted graph over book IDs.
#[derive(Debug, Clone, Default)]
pub struct CoOccurrenceGraph {
    adjacency: BTreeMap<BookId, BTreeMap<BookId, u32>>,
}

impl CoOccurrenceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self, a: &BookId, b: &BookId) {
        *self
            .adjacency
            .entry(a.clone())
            .or_default()
            .entry(b.clone())
            .or_insert(0) += 1;
        *self
            .adjacency
            .entry(b.clone())
            .or_default()
            .entry(a.clone())
            .or_insert(0) += 1;
    }

    /// Records that `book` was granted to a user with the given loan history.
    ///
    /// Every history entry other than `book` itself gains one unit of weight
    /// with `book`, once per occurrence.
    pub fn record_loan(&mut self, book: &BookId, history: &[BookId]) {
        for other in history.iter().filter(|other| *other != book) {
            self.bump(book, other);
        }
    }

    /// Rebuilds the graph from every user's loan history.
    ///
    /// Each pair of history positions `i < j` contributes one unit, provided
    /// both books still exist and are distinct.
    pub fn rebuild<'a>(&mut self, users: impl IntoIterator<Item = &'a User>, catalog: &CatalogStore) {
        self.adjacency.clear();
        for user in users {
            let history = &user.loan_history;
            for (i, first) in history.iter().enumerate() {
                if !catalog.contains_book(first) {
                    continue;
                }
                for second in &history[i + 1..] {
                    if second != first && catalog.contains_book(second) {
                        self.bump(first, second);
                    }
                }
            }
        }
        debug!(edges = self.edge_count(), "co-occurrence graph rebuilt");
    }

    /// Weight of the edge between two books, 0 if there is none.
    #[must_use]
    pub fn weight(&self, a: &BookId, b: &BookId) -> u32 {
        self.adjacency
            .get(a)
            .and_then(|neighbors| neighbors.get(b))
            .copied()
            .unwrap_or(0)
    }

    /// Neighbors of a book with their weights.
    pub fn neighbors(&self, book: &BookId) -> impl Iterator<Item = (&BookId, u32)> {
        self.adjacency
            .get(book)
            .into_iter()
            .flat_map(|neighbors| neighbors.iter().map(|(id, weight)| (id, *weight)))
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Recommends up to `limit` books for a user.
    ///
    /// Every neighbor of a book the user has borrowed, and that the user has
    /// not borrowed, scores the edge weight. Candidates missing from the
    /// catalog are skipped; with a genre filter, candidates whose genre does
    /// not contain it (case-insensitively) are excluded. Results are ordered
    /// by score descending, then ID ascending. An unknown user gets nothing.
    #[must_use]
    pub fn recommend(
        &self,
        user_id: &UserId,
        limit: usize,
        genre: Option<&str>,
        catalog: &CatalogStore,
    ) -> Vec<(BookId, u32)> {
        let Some(user) = catalog.user(user_id) else {
            return Vec::new();
        };
        let genre = genre
            .map(str::to_lowercase)
            .filter(|genre| !genre.is_empty());
        let read: BTreeSet<&BookId> = user.loan_history.iter().collect();

        let mut scores: BTreeMap<&BookId, u32> = BTreeMap::new();
        for &book in &read {
            for (candidate, weight) in self.neighbors(book) {
                if read.contains(candidate) {
                    continue;
                }
                let Some(found) = catalog.book(candidate) else {
                    continue;
                };
                if let Some(genre) = &genre {
                    if !found.genre.to_lowercase().contains(genre.as_str()) {
                        continue;
                    }
                }
                *scores.entry(candidate).or_insert(0) += weight;
            }
        }

        let mut ranked: Vec<(BookId, u32)> = scores
            .into_iter()
            .map(|(id, score)| (id.clone(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Book, NewBook, NewUser};
    use proptest::prelude::*;

    fn b(id: &str) -> BookId {
        BookId::new(id)
    }

    fn catalog(books: &[(&str, &str)], users: &[(&str, &[&str])]) -> CatalogStore {
        let mut store = CatalogStore::new();
        for (id, genre) in books {
            let book = Book::from_new(b(id), NewBook::new(*id, 1).genre(*genre));
            store.insert_book(book).unwrap();
        }
        let mut snapshot = store.to_snapshot();
        for (id, history) in users {
            let mut user = User::from_new(UserId::new(*id), NewUser::new(*id, ""));
            user.loan_history = history.iter().map(|h| b(h)).collect();
            snapshot.users.push(user);
        }
        CatalogStore::from_snapshot(snapshot)
    }

    fn replay(graph: &mut CoOccurrenceGraph, history: &[&str]) {
        let mut seen = Vec::new();
        for id in history {
            seen.push(b(id));
            graph.record_loan(&b(id), &seen);
        }
    }

    #[test]
    fn co_borrowing_weights() {
        let mut graph = CoOccurrenceGraph::new();
        replay(&mut graph, &["B1", "B2"]);
        replay(&mut graph, &["B1", "B2", "B3"]);

        assert_eq!(graph.weight(&b("B1"), &b("B2")), 2);
        assert_eq!(graph.weight(&b("B1"), &b("B3")), 1);
        assert_eq!(graph.weight(&b("B3"), &b("B2")), 1);
        assert_eq!(graph.weight(&b("B1"), &b("B9")), 0);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn recommends_unread_neighbors() {
        let store = catalog(
            &[("B1", "Fantasy"), ("B2", "Fantasy"), ("B3", "Fantasy")],
            &[("U1", &["B1", "B2"]), ("U2", &["B1", "B2", "B3"])],
        );
        let mut graph = CoOccurrenceGraph::new();
        replay(&mut graph, &["B1", "B2"]);
        replay(&mut graph, &["B1", "B2", "B3"]);

        let recs = graph.recommend(&UserId::new("U1"), 5, None, &store);
        assert_eq!(recs, vec![(b("B3"), 2)]);
    }

    #[test]
    fn ties_break_by_id_and_limit_applies() {
        let store = catalog(
            &[("A", "x"), ("C", "x"), ("D", "x"), ("E", "x")],
            &[("U", &["A"])],
        );
        let mut graph = CoOccurrenceGraph::new();
        replay(&mut graph, &["A", "E"]);
        replay(&mut graph, &["A", "D"]);
        replay(&mut graph, &["A", "C"]);
        replay(&mut graph, &["A", "D"]);

        let recs = graph.recommend(&UserId::new("U"), 2, None, &store);
        assert_eq!(recs, vec![(b("D"), 2), (b("C"), 1)]);
    }

    #[test]
    fn genre_filter_excludes_and_missing_books_skipped() {
        let store = catalog(
            &[("A", "Fantasy"), ("B", "Dark Fantasy"), ("C", "Poetry")],
            &[("U", &["A"])],
        );
        let mut graph = CoOccurrenceGraph::new();
        replay(&mut graph, &["A", "B"]);
        replay(&mut graph, &["A", "C"]);
        replay(&mut graph, &["A", "GONE"]);

        let user = UserId::new("U");
        let all = graph.recommend(&user, 10, None, &store);
        assert_eq!(all.len(), 2);
        let fantasy = graph.recommend(&user, 10, Some("FANTASY"), &store);
        assert_eq!(fantasy, vec![(b("B"), 1)]);
        assert!(graph.recommend(&UserId::new("nobody"), 10, None, &store).is_empty());
    }

    #[test]
    fn rebuild_from_histories() {
        let store = catalog(
            &[("B1", ""), ("B2", ""), ("B3", "")],
            &[("U1", &["B1", "B2", "B1"]), ("U2", &["B2", "B3", "GONE"])],
        );
        let mut graph = CoOccurrenceGraph::new();
        graph.rebuild(store.users(), &store);

        assert_eq!(graph.weight(&b("B1"), &b("B2")), 2);
        assert_eq!(graph.weight(&b("B1"), &b("B1")), 0);
        assert_eq!(graph.weight(&b("B2"), &b("B3")), 1);
        assert_eq!(graph.weight(&b("B3"), &b("GONE")), 0);
    }

    proptest! {
        #[test]
        fn weights_stay_symmetric(histories in prop::collection::vec(
            prop::collection::vec(0u8..6, 0..8), 0..6,
        )) {
            let mut graph = CoOccurrenceGraph::new();
            for history in &histories {
                let mut seen = Vec::new();
                for n in history {
                    let id = b(&format!("B{n}"));
                    seen.push(id.clone());
                    graph.record_loan(&id, &seen);
                }
            }
            for x in 0u8..6 {
                for y in 0u8..6 {
                    let (x, y) = (b(&format!("B{x}")), b(&format!("B{y}")));
                    prop_assert_eq!(graph.weight(&x, &y), graph.weight(&y, &x));
                }
            }
        }
    }
}

//! Catalog statistics.
//!
//! [`CommandCounters`] accumulates per-service operation counts.
//! [`CatalogStats`] is a point-in-time snapshot combining those counters
//! with table and index sizes.
//!
//! # Usage
//!
//! ```rust
//! use libris_core::LibraryService;
//!
//! let service = LibraryService::open_in_memory().unwrap();
//! let stats = service.stats();
//! assert_eq!(stats.books, 0);
//! assert_eq!(stats.searches, 0);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one service instance.
///
/// Counters are atomic so read-only queries can bump them through `&self`.
#[derive(Debug, Default)]
pub struct CommandCounters {
    commands: AtomicU64,
    rejected: AtomicU64,
    searches: AtomicU64,
    recommendations: AtomicU64,
    undos: AtomicU64,
    flush_failures: AtomicU64,
}

impl CommandCounters {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recommendation(&self) {
        self.recommendations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undo(&self) {
        self.undos.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Mutating commands that were applied.
    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    /// Mutating commands that failed validation.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Prefix searches served.
    pub fn searches(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    /// Recommendation requests served.
    pub fn recommendations(&self) -> u64 {
        self.recommendations.load(Ordering::Relaxed)
    }

    /// Undo calls, including no-ops.
    pub fn undos(&self) -> u64 {
        self.undos.load(Ordering::Relaxed)
    }

    /// Table flushes that failed.
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Books in the catalog.
    pub books: usize,
    /// Registered users.
    pub users: usize,
    /// Loans currently active.
    pub active_loans: usize,
    /// Loan records including returned ones.
    pub loan_records: usize,
    /// Requests waiting across all waitlists.
    pub queued_requests: usize,
    /// Distinct terms in the prefix index.
    pub prefix_terms: usize,
    /// Nodes in the prefix trie, root included.
    pub prefix_nodes: usize,
    /// Entries in the ordered key index, stale ones included.
    pub ordered_entries: usize,
    /// Height of the ordered key index.
    pub ordered_height: i32,
    /// Edges in the co-occurrence graph.
    pub graph_edges: usize,
    /// Actions in the undo log.
    pub undo_depth: usize,
    /// Applied mutating commands.
    pub commands: u64,
    /// Rejected mutating commands.
    pub rejected: u64,
    /// Searches served.
    pub searches: u64,
    /// Recommendation requests served.
    pub recommendations: u64,
    /// Undo calls.
    pub undos: u64,
    /// Failed table flushes.
    pub flush_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let counters = CommandCounters::new();
        counters.record_command();
        counters.record_command();
        counters.record_rejected();
        counters.record_search();
        counters.record_flush_failure();

        assert_eq!(counters.commands(), 2);
        assert_eq!(counters.rejected(), 1);
        assert_eq!(counters.searches(), 1);
        assert_eq!(counters.recommendations(), 0);
        assert_eq!(counters.undos(), 0);
        assert_eq!(counters.flush_failures(), 1);
    }

    #[test]
    fn stats_serialize_as_flat_json() {
        let stats = CatalogStats {
            books: 3,
            ..CatalogStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["books"], 3);
        assert_eq!(json["undo_depth"], 0);
    }
}

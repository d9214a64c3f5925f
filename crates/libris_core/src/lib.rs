//! # Libris Core
//!
//! In-memory catalog engine for a lending library.
//!
//! This crate provides:
//! - Entity tables for books, users, loans and waitlists with cascading
//!   mutation rules
//! - A prefix trie for title and author autocompletion
//! - An AVL tree for listing books by numeric key
//! - A co-occurrence graph for "borrowed together" recommendations
//! - A single-step undo log
//! - A persistence port writing whole JSON tables to a storage backend
//!
//! Everything is reached through [`LibraryService`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod graph;
pub mod index;
mod persistence;
mod service;
mod stats;
mod transaction;

pub use config::Config;
pub use entity::{
    normalize_genre, numeric_key, Book, BookId, BookUpdate, CatalogStore, IdGenerator, IdMint,
    Loan, LoanId, LoanOutcome, NewBook, NewUser, Promotion, RandomIdGenerator, ReturnOutcome,
    SequentialIdGenerator, User, UserId,
};
pub use error::{CoreError, CoreResult};
pub use graph::CoOccurrenceGraph;
pub use persistence::{
    Persistence, PersistenceFailure, Snapshot, TablePersistence, Tables, WaitlistRow,
    BOOKS_TABLE, LOANS_TABLE, USERS_TABLE, WAITLISTS_TABLE,
};
pub use service::LibraryService;
pub use stats::{CatalogStats, CommandCounters};
pub use transaction::{Action, ActionKind, TransactionLog, UndoOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

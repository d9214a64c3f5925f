//! Persistence port for catalog tables.
//!
//! The catalog is stored as four whole tables: `books`, `users`, `loans` and
//! `waitlists`. Every save overwrites a table completely; there is no append
//! or partial update. Derived state (indexes, the co-occurrence graph and the
//! undo log) is never stored.
//!
//! ## Format
//!
//! [`TablePersistence`] encodes each table as a pretty-printed JSON array
//! and hands the bytes to a [`TableBackend`]. A table that was never written
//! loads as empty.

use crate::entity::{Book, BookId, CatalogStore, Loan, User, UserId};
use crate::error::CoreResult;
use libris_storage::TableBackend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Table holding books.
pub const BOOKS_TABLE: &str = "books";
/// Table holding users.
pub const USERS_TABLE: &str = "users";
/// Table holding loans.
pub const LOANS_TABLE: &str = "loans";
/// Table holding waitlists.
pub const WAITLISTS_TABLE: &str = "waitlists";

/// Persisted waitlist of one book, front of the queue first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistRow {
    /// The awaited book.
    pub book_id: BookId,
    /// Waiting users in FIFO order.
    pub users: Vec<UserId>,
}

/// Full contents of the four catalog tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Books.
    pub books: Vec<Book>,
    /// Users.
    pub users: Vec<User>,
    /// Loans, active and returned.
    pub loans: Vec<Loan>,
    /// Non-empty waitlists.
    pub waitlists: Vec<WaitlistRow>,
}

/// Storage port consumed by the catalog service.
///
/// Saves are idempotent total overwrites of one table.
pub trait Persistence: Send {
    /// Loads every table.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read or decoded.
    fn load_snapshot(&self) -> CoreResult<Snapshot>;

    /// Overwrites the books table.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn save_books(&mut self, catalog: &CatalogStore) -> CoreResult<()>;

    /// Overwrites the users table.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn save_users(&mut self, catalog: &CatalogStore) -> CoreResult<()>;

    /// Overwrites the loans table.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn save_loans(&mut self, catalog: &CatalogStore) -> CoreResult<()>;

    /// Overwrites the waitlists table.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn save_waitlists(&mut self, catalog: &CatalogStore) -> CoreResult<()>;
}

/// Set of tables touched by a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tables(u8);

impl Tables {
    /// No tables.
    pub const NONE: Self = Self(0);
    /// The books table.
    pub const BOOKS: Self = Self(1);
    /// The users table.
    pub const USERS: Self = Self(1 << 1);
    /// The loans table.
    pub const LOANS: Self = Self(1 << 2);
    /// The waitlists table.
    pub const WAITLISTS: Self = Self(1 << 3);
    /// Every table.
    pub const ALL: Self = Self(0b1111);

    /// Returns true if every table in `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no table is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Tables {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A flush that failed after its command had already been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    /// Name of the table that could not be written.
    pub table: &'static str,
    /// Error text.
    pub message: String,
}

impl fmt::Display for PersistenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to save table {}: {}", self.table, self.message)
    }
}

/// [`Persistence`] implementation writing JSON tables to a [`TableBackend`].
#[derive(Debug, Clone, Default)]
pub struct TablePersistence<B> {
    backend: B,
}

impl<B: TableBackend> TablePersistence<B> {
    /// Wraps a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn load_table<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Vec<T>> {
        match self.backend.read_table(name)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_table<T: Serialize + ?Sized>(&mut self, name: &str, rows: &T) -> CoreResult<()> {
        let bytes = serde_json::to_vec_pretty(rows)?;
        self.backend.write_table(name, &bytes)?;
        Ok(())
    }
}

impl<B: TableBackend> Persistence for TablePersistence<B> {
    fn load_snapshot(&self) -> CoreResult<Snapshot> {
        Ok(Snapshot {
            books: self.load_table(BOOKS_TABLE)?,
            users: self.load_table(USERS_TABLE)?,
            loans: self.load_table(LOANS_TABLE)?,
            waitlists: self.load_table(WAITLISTS_TABLE)?,
        })
    }

    fn save_books(&mut self, catalog: &CatalogStore) -> CoreResult<()> {
        let rows: Vec<&Book> = catalog.books().collect();
        self.save_table(BOOKS_TABLE, &rows)
    }

    fn save_users(&mut self, catalog: &CatalogStore) -> CoreResult<()> {
        let rows: Vec<&User> = catalog.users().collect();
        self.save_table(USERS_TABLE, &rows)
    }

    fn save_loans(&mut self, catalog: &CatalogStore) -> CoreResult<()> {
        let rows: Vec<&Loan> = catalog.loans().collect();
        self.save_table(LOANS_TABLE, &rows)
    }

    fn save_waitlists(&mut self, catalog: &CatalogStore) -> CoreResult<()> {
        self.save_table(WAITLISTS_TABLE, &catalog.waitlist_rows())
    }
}

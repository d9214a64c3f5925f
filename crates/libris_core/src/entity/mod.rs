//! Catalog entities: books, users, loans.
//!
//! The [`CatalogStore`] exclusively owns every entity record. Derived
//! structures (indexes, the co-occurrence graph) refer to entities by ID only.

mod generator;
mod id;
mod store;

pub use generator::{IdGenerator, IdMint, RandomIdGenerator, SequentialIdGenerator};
pub use id::{numeric_key, BookId, LoanId, UserId};
pub use store::{CatalogStore, LoanOutcome, Promotion, ReturnOutcome};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Canonical key.
    pub id: BookId,
    /// Key derived from the digits of `id`, 0 if none.
    pub numeric_key: i64,
    /// Title as entered.
    pub title: String,
    /// Authors in credited order.
    pub authors: Vec<String>,
    /// Free-form genre label.
    pub genre: String,
    /// Publication date, `YYYY-MM-DD` by convention.
    pub publication_date: String,
    /// Copies owned by the library.
    pub total_copies: u32,
    /// Copies on the shelf. Always `<= total_copies`.
    pub available_copies: u32,
}

impl Book {
    /// Builds a book with every copy on the shelf.
    #[must_use]
    pub fn from_new(id: BookId, new: NewBook) -> Self {
        Self {
            numeric_key: id.numeric_key(),
            id,
            title: new.title,
            authors: new.authors,
            genre: new.genre,
            publication_date: new.publication_date,
            total_copies: new.total_copies,
            available_copies: new.total_copies,
        }
    }

    /// Number of copies not on the shelf.
    #[must_use]
    pub fn copies_out(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }
}

/// A library user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Canonical key.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Books currently on loan to this user.
    pub active_loans: BTreeSet<BookId>,
    /// Mirrors `active_loans.len()`.
    pub active_loan_count: u32,
    /// Every book ever granted to this user, oldest first.
    pub loan_history: Vec<BookId>,
    /// Titles of returned books, oldest first.
    pub read_history: Vec<String>,
}

impl User {
    /// Builds a user with no loans.
    #[must_use]
    pub fn from_new(id: UserId, new: NewUser) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            active_loans: BTreeSet::new(),
            active_loan_count: 0,
            loan_history: Vec::new(),
            read_history: Vec::new(),
        }
    }

    /// Returns true if the user currently holds the book.
    #[must_use]
    pub fn has_on_loan(&self, book_id: &BookId) -> bool {
        self.active_loans.contains(book_id)
    }
}

/// A loan of one copy of a book to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Loan identifier.
    pub id: LoanId,
    /// The borrowed book.
    pub book_id: BookId,
    /// The borrower.
    pub user_id: UserId,
    /// Title of the book, kept in step with renames.
    pub title: String,
    /// False once the copy has been returned.
    pub active: bool,
}

/// Input for adding a book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    /// Caller-supplied ID. `None` (or blank) means generate one.
    pub id: Option<String>,
    /// Title.
    pub title: String,
    /// Authors in credited order.
    pub authors: Vec<String>,
    /// Genre label.
    pub genre: String,
    /// Publication date.
    pub publication_date: String,
    /// Number of copies; all start on the shelf.
    pub total_copies: u32,
}

impl NewBook {
    /// Starts a new book with a title and copy count.
    #[must_use]
    pub fn new(title: impl Into<String>, total_copies: u32) -> Self {
        Self {
            title: title.into(),
            total_copies,
            ..Self::default()
        }
    }

    /// Sets an explicit ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Appends an author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Sets the genre.
    #[must_use]
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    /// Sets the publication date.
    #[must_use]
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.publication_date = date.into();
        self
    }
}

/// Input for adding a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    /// Caller-supplied ID. `None` (or blank) means generate one.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

impl NewUser {
    /// Starts a new user.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Sets an explicit ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Field changes for `modify_book`. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookUpdate {
    /// New title.
    pub title: Option<String>,
    /// New author list.
    pub authors: Option<Vec<String>>,
    /// New genre.
    pub genre: Option<String>,
    /// New publication date.
    pub publication_date: Option<String>,
    /// New number of owned copies.
    pub total_copies: Option<u32>,
}

impl BookUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the authors.
    #[must_use]
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the genre.
    #[must_use]
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Sets the publication date.
    #[must_use]
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.publication_date = Some(date.into());
        self
    }

    /// Sets the number of owned copies.
    #[must_use]
    pub fn total_copies(mut self, copies: u32) -> Self {
        self.total_copies = Some(copies);
        self
    }

    /// Returns true if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Normalizes a genre label for matching: lower-case, alphanumerics only.
#[must_use]
pub fn normalize_genre(genre: &str) -> String {
    genre
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

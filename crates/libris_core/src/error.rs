//! Error types for Libris core.

use crate::entity::{BookId, UserId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Libris core operations.
///
/// The `Display` text of each variant is the reason string reported to the
/// caller of a failed command.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] libris_storage::StorageError),

    /// Table encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Book not found.
    #[error("book not found: {id}")]
    BookNotFound {
        /// The book ID that was not found.
        id: BookId,
    },

    /// User not found.
    #[error("user not found: {id}")]
    UserNotFound {
        /// The user ID that was not found.
        id: UserId,
    },

    /// No active loan exists for the pair.
    #[error("no active loan of book {book_id} for user {user_id}")]
    LoanNotFound {
        /// The borrowing user.
        user_id: UserId,
        /// The borrowed book.
        book_id: BookId,
    },

    /// A book with this ID already exists.
    #[error("book already exists: {id}")]
    BookExists {
        /// The duplicate book ID.
        id: BookId,
    },

    /// A user with this ID already exists.
    #[error("user already exists: {id}")]
    UserExists {
        /// The duplicate user ID.
        id: UserId,
    },

    /// The user already holds an active loan on the book.
    #[error("user {user_id} already has book {book_id} on loan")]
    AlreadyBorrowed {
        /// The borrowing user.
        user_id: UserId,
        /// The borrowed book.
        book_id: BookId,
    },

    /// The ID generator produced only IDs that are already taken.
    #[error("could not mint a free {kind} id after {attempts} attempts")]
    IdSpaceExhausted {
        /// Which kind of ID was being minted.
        kind: &'static str,
        /// Candidates tried.
        attempts: usize,
    },

    /// Operation rejected before any state was changed.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a book not found error.
    pub fn book_not_found(id: &BookId) -> Self {
        Self::BookNotFound { id: id.clone() }
    }

    /// Creates a user not found error.
    pub fn user_not_found(id: &UserId) -> Self {
        Self::UserNotFound { id: id.clone() }
    }

    /// Creates a loan not found error.
    pub fn loan_not_found(user_id: &UserId, book_id: &BookId) -> Self {
        Self::LoanNotFound {
            user_id: user_id.clone(),
            book_id: book_id.clone(),
        }
    }

    /// Creates an already borrowed error.
    pub fn already_borrowed(user_id: &UserId, book_id: &BookId) -> Self {
        Self::AlreadyBorrowed {
            user_id: user_id.clone(),
            book_id: book_id.clone(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for the lookup failures (book, user or loan absent).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BookNotFound { .. } | Self::UserNotFound { .. } | Self::LoanNotFound { .. }
        )
    }

    /// Returns true if the error came from the persistence layer.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Codec(_))
    }
}

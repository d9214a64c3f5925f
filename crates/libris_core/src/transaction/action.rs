//! Action records and their compensations.

use crate::entity::{BookId, CatalogStore, LoanId, UserId};
use std::fmt;
use tracing::debug;

/// One logged command, carrying exactly what its compensation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A book was added.
    AddBook {
        /// The new book.
        book_id: BookId,
    },
    /// A user was added.
    AddUser {
        /// The new user.
        user_id: UserId,
    },
    /// A loan request was granted from the shelf.
    LoanGranted {
        /// The created loan.
        loan_id: LoanId,
        /// The borrower.
        user_id: UserId,
        /// The borrowed book.
        book_id: BookId,
    },
    /// A loan request joined the waitlist.
    Queued {
        /// The requested book.
        book_id: BookId,
        /// The waiting user.
        user_id: UserId,
    },
    /// A book was deleted.
    DeleteBook {
        /// The deleted book.
        book_id: BookId,
    },
    /// A book was modified.
    ModifyBook {
        /// The modified book.
        book_id: BookId,
    },
    /// A user was deleted.
    DeleteUser {
        /// The deleted user.
        user_id: UserId,
    },
    /// A loan was returned.
    ReturnLoan {
        /// The closed loan.
        loan_id: LoanId,
        /// The borrower.
        user_id: UserId,
        /// The returned book.
        book_id: BookId,
    },
}

/// Tag identifying the kind of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// See [`Action::AddBook`].
    AddBook,
    /// See [`Action::AddUser`].
    AddUser,
    /// See [`Action::LoanGranted`].
    LoanGranted,
    /// See [`Action::Queued`].
    Queued,
    /// See [`Action::DeleteBook`].
    DeleteBook,
    /// See [`Action::ModifyBook`].
    ModifyBook,
    /// See [`Action::DeleteUser`].
    DeleteUser,
    /// See [`Action::ReturnLoan`].
    ReturnLoan,
}

impl ActionKind {
    /// Returns true if actions of this kind have a compensation.
    #[must_use]
    pub fn is_reversible(self) -> bool {
        matches!(
            self,
            Self::AddBook | Self::AddUser | Self::LoanGranted | Self::Queued
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddBook => "add book",
            Self::AddUser => "add user",
            Self::LoanGranted => "loan",
            Self::Queued => "waitlist request",
            Self::DeleteBook => "delete book",
            Self::ModifyBook => "modify book",
            Self::DeleteUser => "delete user",
            Self::ReturnLoan => "return",
        };
        f.write_str(name)
    }
}

/// Result of `undo_last`. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The log was empty.
    Empty,
    /// The record was popped and its compensation applied.
    Reverted(ActionKind),
    /// The record was popped but its target is gone or already settled.
    Stale(ActionKind),
    /// The record was popped; its kind has no compensation.
    Unsupported(ActionKind),
}

impl UndoOutcome {
    /// Returns true if state was changed.
    #[must_use]
    pub fn is_reverted(self) -> bool {
        matches!(self, Self::Reverted(_))
    }
}

impl fmt::Display for UndoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("nothing to undo"),
            Self::Reverted(kind) => write!(f, "undid {kind}"),
            Self::Stale(kind) => write!(f, "{kind} can no longer be undone"),
            Self::Unsupported(kind) => write!(f, "undo of {kind} is not supported"),
        }
    }
}

impl Action {
    /// Returns the kind tag.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::AddBook { .. } => ActionKind::AddBook,
            Self::AddUser { .. } => ActionKind::AddUser,
            Self::LoanGranted { .. } => ActionKind::LoanGranted,
            Self::Queued { .. } => ActionKind::Queued,
            Self::DeleteBook { .. } => ActionKind::DeleteBook,
            Self::ModifyBook { .. } => ActionKind::ModifyBook,
            Self::DeleteUser { .. } => ActionKind::DeleteUser,
            Self::ReturnLoan { .. } => ActionKind::ReturnLoan,
        }
    }

    /// Applies the compensation of this action to the catalog.
    ///
    /// Added entities are removed with the regular cascading delete, so the
    /// tables stay consistent even if later commands touched them. A loan is
    /// only revoked while it is still active, and a waitlist request loses
    /// just the first matching entry.
    pub fn compensate(&self, catalog: &mut CatalogStore) -> UndoOutcome {
        let kind = self.kind();
        let applied = match self {
            Self::AddBook { book_id } => catalog.delete_book(book_id).is_ok(),
            Self::AddUser { user_id } => catalog.delete_user(user_id).is_ok(),
            Self::LoanGranted { loan_id, .. } => catalog.revoke_loan(loan_id),
            Self::Queued { book_id, user_id } => catalog.withdraw_request(book_id, user_id),
            Self::DeleteBook { .. }
            | Self::ModifyBook { .. }
            | Self::DeleteUser { .. }
            | Self::ReturnLoan { .. } => return UndoOutcome::Unsupported(kind),
        };
        if applied {
            UndoOutcome::Reverted(kind)
        } else {
            debug!(action = ?self, "undo target is gone or settled");
            UndoOutcome::Stale(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entity::{Book, IdMint, LoanOutcome, NewBook, NewUser, SequentialIdGenerator, User};

    fn setup(copies: u32) -> (CatalogStore, IdMint) {
        let mut store = CatalogStore::new();
        store
            .insert_book(Book::from_new(BookId::new("B1"), NewBook::new("Emma", copies)))
            .unwrap();
        store
            .insert_user(User::from_new(UserId::new("U1"), NewUser::new("Ana", "a@x")))
            .unwrap();
        let mint = IdMint::new(&Config::default(), Box::new(SequentialIdGenerator::new()));
        (store, mint)
    }

    #[test]
    fn unsupported_kinds_leave_state() {
        let (mut store, _) = setup(1);
        let before = store.clone();
        let action = Action::DeleteBook {
            book_id: BookId::new("B1"),
        };
        assert_eq!(
            action.compensate(&mut store),
            UndoOutcome::Unsupported(ActionKind::DeleteBook)
        );
        assert_eq!(store, before);
    }

    #[test]
    fn add_book_compensation_cascades() {
        let (mut store, mut mint) = setup(1);
        let user = UserId::new("U1");
        let book = BookId::new("B1");
        store.request_loan(&user, &book, &mut mint).unwrap();

        let action = Action::AddBook { book_id: book.clone() };
        assert!(action.compensate(&mut store).is_reverted());
        assert!(!store.contains_book(&book));
        assert_eq!(store.user(&user).unwrap().active_loan_count, 0);
        assert_eq!(action.compensate(&mut store), UndoOutcome::Stale(ActionKind::AddBook));
    }

    #[test]
    fn loan_compensation_only_while_active() {
        let (mut store, mut mint) = setup(1);
        let user = UserId::new("U1");
        let book = BookId::new("B1");
        let LoanOutcome::Granted { loan_id } = store.request_loan(&user, &book, &mut mint).unwrap()
        else {
            panic!("expected a granted loan");
        };
        let action = Action::LoanGranted {
            loan_id,
            user_id: user.clone(),
            book_id: book.clone(),
        };

        store.return_loan(&user, &book, &mut mint).unwrap();
        assert_eq!(action.compensate(&mut store), UndoOutcome::Stale(ActionKind::LoanGranted));
        assert_eq!(store.book(&book).unwrap().available_copies, 1);
    }

    #[test]
    fn kinds_and_display() {
        assert!(ActionKind::Queued.is_reversible());
        assert!(!ActionKind::ReturnLoan.is_reversible());
        assert_eq!(
            UndoOutcome::Unsupported(ActionKind::ModifyBook).to_string(),
            "undo of modify book is not supported"
        );
        assert_eq!(UndoOutcome::Empty.to_string(), "nothing to undo");
    }
}

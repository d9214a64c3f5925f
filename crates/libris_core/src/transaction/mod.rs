//! Undo support for catalog commands.
//!
//! Every mutating command appends one [`Action`] to the [`TransactionLog`].
//! `undo_last` pops exactly one record and applies its compensation:
//!
//! - **Reversible**: `AddBook`, `AddUser`, `LoanGranted`, `Queued`
//! - **Recorded only**: `DeleteBook`, `ModifyBook`, `DeleteUser`, `ReturnLoan`
//!   pop as [`UndoOutcome::Unsupported`] and leave state unchanged
//!
//! The log lives in memory for the lifetime of one service and is never
//! persisted. There is no redo.

mod action;
mod log;

pub use action::{Action, ActionKind, UndoOutcome};
pub use log::TransactionLog;

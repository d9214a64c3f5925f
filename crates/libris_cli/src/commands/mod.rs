//! CLI command implementations.

pub mod books;
pub mod browse;
pub mod inspect;
pub mod loans;
pub mod users;

use libris_core::{Config, LibraryService, RandomIdGenerator, TablePersistence, UndoOutcome};
use libris_storage::FileBackend;
use std::error::Error;
use std::path::Path;

/// Result type shared by the command implementations.
pub type CommandResult<T = ()> = Result<T, Box<dyn Error>>;

/// File extension of the catalog tables.
pub const TABLE_EXTENSION: &str = "json";

/// Opens (or creates) the catalog stored in `dir`.
pub fn open_library(dir: &Path) -> CommandResult<LibraryService> {
    let backend = FileBackend::open(dir)?.with_extension(TABLE_EXTENSION);
    LibraryService::open(
        Config::default(),
        TablePersistence::new(backend),
        RandomIdGenerator::new(),
    )
    .map_err(|err| -> Box<dyn Error> {
        if err.is_persistence_failure() {
            format!("cannot load catalog from {}: {err}", dir.display()).into()
        } else {
            err.into()
        }
    })
}

/// Reverts the most recent command of this invocation.
pub fn undo_last(library: &mut LibraryService) -> UndoOutcome {
    let outcome = library.undo_last();
    println!("Undo: {outcome}");
    outcome
}

/// Prints flush failures and turns them into an error exit.
///
/// The command itself has been applied in memory; only durability is lost.
pub fn report_persistence(library: &mut LibraryService) -> CommandResult {
    let failures = library.take_persistence_failures();
    if failures.is_empty() {
        return Ok(());
    }
    for failure in &failures {
        eprintln!("warning: {failure}");
    }
    Err(format!("{} table write(s) failed; changes may not be saved", failures.len()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{ActionKind, BookId, NewBook, NewUser};
    use tempfile::tempdir;

    #[test]
    fn catalog_persists_between_invocations() {
        let dir = tempdir().unwrap();
        let (book, user) = {
            let mut library = open_library(dir.path()).unwrap();
            let book = library.add_book(NewBook::new("Emma", 1).id("978-1")).unwrap();
            let user = library.add_user(NewUser::new("Ana", "a@x")).unwrap();
            library.loan_book(&user, &book).unwrap();
            report_persistence(&mut library).unwrap();
            (book, user)
        };

        assert!(dir.path().join("books.json").exists());
        let library = open_library(dir.path()).unwrap();
        assert!(library.user(&user).unwrap().has_on_loan(&book));
        assert_eq!(library.book(&book).unwrap().available_copies, 0);
    }

    #[test]
    fn undo_is_saved_before_exit() {
        let dir = tempdir().unwrap();
        {
            let mut library = open_library(dir.path()).unwrap();
            library.add_book(NewBook::new("Emma", 1).id("978-1")).unwrap();
            report_persistence(&mut library).unwrap();
        }
        {
            let mut library = open_library(dir.path()).unwrap();
            library.add_book(NewBook::new("Persuasion", 1).id("978-2")).unwrap();
            assert_eq!(undo_last(&mut library), UndoOutcome::Reverted(ActionKind::AddBook));
            report_persistence(&mut library).unwrap();
        }

        let mut library = open_library(dir.path()).unwrap();
        assert_eq!(library.catalog().book_count(), 1);
        assert!(library.book(&BookId::new("978-1")).is_some());
        assert_eq!(undo_last(&mut library), UndoOutcome::Empty);
    }

    #[test]
    fn unreadable_tables_name_the_data_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("books.json"), b"[{").unwrap();
        let err = open_library(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("cannot load catalog from "));
    }
}

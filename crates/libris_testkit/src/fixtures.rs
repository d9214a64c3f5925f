//! Test fixtures and catalog helpers.
//!
//! Provides convenience functions for setting up test catalogs
//! and common test scenarios.

use libris_core::{Config, LibraryService, SequentialIdGenerator, TablePersistence};
use libris_storage::{FileBackend, InMemoryBackend};
use std::path::Path;
use tempfile::TempDir;

/// A test catalog with deterministic IDs and automatic cleanup.
pub struct TestLibrary {
    /// The service instance.
    pub library: LibraryService,
    backend: Backend,
}

enum Backend {
    Memory(InMemoryBackend),
    File(TempDir),
}

impl TestLibrary {
    /// Creates a catalog backed by memory.
    pub fn memory() -> Self {
        let backend = InMemoryBackend::new();
        let library = open(TablePersistence::new(backend.clone()));
        Self {
            library,
            backend: Backend::Memory(backend),
        }
    }

    /// Creates a catalog stored as JSON tables in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let library = open(file_persistence(temp_dir.path()));
        Self {
            library,
            backend: Backend::File(temp_dir),
        }
    }

    /// Reopens the catalog from what was persisted so far.
    ///
    /// The new service starts with an empty undo log and rebuilt indexes.
    pub fn reopen(&mut self) {
        self.library = match &self.backend {
            Backend::Memory(backend) => open(TablePersistence::new(backend.clone())),
            Backend::File(dir) => open(file_persistence(dir.path())),
        };
    }

    /// Returns the data directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Memory(_) => None,
            Backend::File(dir) => Some(dir.path()),
        }
    }

    /// Returns the in-memory backend, if any.
    pub fn memory_backend(&self) -> Option<&InMemoryBackend> {
        match &self.backend {
            Backend::Memory(backend) => Some(backend),
            Backend::File(_) => None,
        }
    }
}

fn file_persistence(dir: &Path) -> TablePersistence<FileBackend> {
    let backend = FileBackend::open(dir)
        .expect("Failed to open file backend")
        .with_extension("json");
    TablePersistence::new(backend)
}

fn open<P: libris_core::Persistence + 'static>(persistence: P) -> LibraryService {
    LibraryService::open(Config::default(), persistence, SequentialIdGenerator::new())
        .expect("Failed to open catalog")
}

impl std::ops::Deref for TestLibrary {
    type Target = LibraryService;

    fn deref(&self) -> &Self::Target {
        &self.library
    }
}

impl std::ops::DerefMut for TestLibrary {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.library
    }
}

/// Runs a test with a temporary in-memory catalog.
pub fn with_temp_library<F, R>(f: F) -> R
where
    F: FnOnce(&mut LibraryService) -> R,
{
    let mut test_library = TestLibrary::memory();
    f(&mut test_library.library)
}

/// Runs a test with a catalog stored in a temporary directory.
pub fn with_file_library<F, R>(f: F) -> R
where
    F: FnOnce(&mut LibraryService, &Path) -> R,
{
    let mut test_library = TestLibrary::file();
    let dir = test_library
        .path()
        .expect("File catalog should have a path")
        .to_path_buf();
    f(&mut test_library.library, &dir)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use libris_core::{BookId, NewBook, NewUser, UserId};

    /// Book IDs used by [`small_catalog`].
    pub const BOOKS: [&str; 3] = ["978-1", "978-2", "978-3"];

    /// User IDs used by [`small_catalog`].
    pub const USERS: [&str; 2] = ["U1", "U2"];

    /// A catalog with three single-copy books and two users.
    pub fn small_catalog() -> TestLibrary {
        let mut test_library = TestLibrary::memory();
        let titles = ["Emma", "Persuasion", "Sanditon"];
        for (id, title) in BOOKS.iter().zip(titles) {
            test_library
                .add_book(NewBook::new(title, 1).id(*id).author("Jane Austen").genre("Novel"))
                .expect("Failed to add book");
        }
        for id in USERS {
            test_library
                .add_user(NewUser::new(id, format!("{id}@example.org")).id(id))
                .expect("Failed to add user");
        }
        test_library
    }

    /// Shorthand for a book ID.
    pub fn book(id: &str) -> BookId {
        BookId::new(id)
    }

    /// Shorthand for a user ID.
    pub fn user(id: &str) -> UserId {
        UserId::new(id)
    }
}

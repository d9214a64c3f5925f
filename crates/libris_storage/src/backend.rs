//! Table backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A low-level table store for Libris.
///
/// Backends are **opaque**. They map a table name to a byte blob and
/// provide whole-table reads and writes. Libris core owns all format
/// interpretation - backends do not understand books, users, or loans.
///
/// # Invariants
///
/// - `write_table` replaces the entire previous contents of the table
/// - `read_table` returns exactly the bytes of the last successful write
/// - A failed `write_table` leaves the previous contents intact
/// - Table names match `[a-z0-9_]+`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait TableBackend: Send + Sync {
    /// Reads the full contents of a table.
    ///
    /// Returns `Ok(None)` if the table has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn read_table(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the contents of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, the backend is read-only,
    /// or an I/O error occurs.
    fn write_table(&mut self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Returns the names of all stored tables in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table list cannot be determined.
    fn table_names(&self) -> StorageResult<Vec<String>>;

    /// Returns the size of a table in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TableNotFound`] if the table does not exist.
    fn table_size(&self, name: &str) -> StorageResult<u64>;
}

/// Checks that a table name is non-empty and matches `[a-z0-9_]+`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidTableName`] otherwise.
pub fn validate_table_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidTableName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_table_name("books").is_ok());
        assert!(validate_table_name("wait_lists_2").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "Books", "../etc", "a.b", "with space"] {
            assert!(
                matches!(
                    validate_table_name(name),
                    Err(StorageError::InvalidTableName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }
}

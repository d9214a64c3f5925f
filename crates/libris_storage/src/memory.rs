//! In-memory table backend for testing.

use crate::backend::{validate_table_name, TableBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory table backend.
///
/// This backend stores all tables in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral catalogs that don't need persistence
///
/// Clones share the same tables, so a test can hand one handle to the
/// catalog and keep another to inspect what was flushed.
///
/// # Fault Injection
///
/// [`InMemoryBackend::set_read_only`] makes every subsequent write fail
/// with [`StorageError::ReadOnly`], which is how flush failures are
/// exercised in tests.
///
/// # Example
///
/// ```rust
/// use libris_storage::{InMemoryBackend, TableBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let observer = backend.clone();
/// backend.write_table("users", b"{}").unwrap();
/// assert_eq!(observer.table_size("users").unwrap(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    read_only: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with tables.
    ///
    /// Useful for testing load paths.
    #[must_use]
    pub fn with_tables<I, N>(tables: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let map = tables
            .into_iter()
            .map(|(name, data)| (name.into(), data))
            .collect();
        Self {
            tables: Arc::new(RwLock::new(map)),
            read_only: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes writes fail (or succeed again) on every clone of this backend.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Returns true if writes are currently refused.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    /// Clears all tables.
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.is_read_only() {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl TableBackend for InMemoryBackend {
    fn read_table(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_table_name(name)?;
        Ok(self.tables.read().get(name).cloned())
    }

    fn write_table(&mut self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_table_name(name)?;
        self.check_writable()?;
        self.tables.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.tables.read().keys().cloned().collect())
    }

    fn table_size(&self, name: &str) -> StorageResult<u64> {
        validate_table_name(name)?;
        self.tables
            .read()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::TableNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_backend_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.table_names().unwrap().is_empty());
        assert_eq!(backend.read_table("books").unwrap(), None);
    }

    #[test]
    fn write_replaces_whole_table() {
        let mut backend = InMemoryBackend::new();
        backend.write_table("books", b"first version").unwrap();
        backend.write_table("books", b"v2").unwrap();

        assert_eq!(backend.read_table("books").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(backend.table_size("books").unwrap(), 2);
    }

    #[test]
    fn clones_share_tables() {
        let mut backend = InMemoryBackend::new();
        let observer = backend.clone();
        backend.write_table("loans", b"[]").unwrap();
        assert_eq!(observer.table_names().unwrap(), vec!["loans".to_string()]);
    }

    #[test]
    fn read_only_rejects_writes_and_keeps_data() {
        let mut backend = InMemoryBackend::with_tables([("users", b"old".to_vec())]);
        backend.set_read_only(true);

        let result = backend.write_table("users", b"new");
        assert!(matches!(result, Err(StorageError::ReadOnly)));
        assert_eq!(backend.read_table("users").unwrap(), Some(b"old".to_vec()));

        backend.set_read_only(false);
        backend.write_table("users", b"new").unwrap();
        assert_eq!(backend.read_table("users").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn size_of_missing_table() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.table_size("books"),
            Err(StorageError::TableNotFound { .. })
        ));
    }

    #[test]
    fn invalid_name_rejected() {
        let mut backend = InMemoryBackend::new();
        assert!(matches!(
            backend.write_table("../books", b"x"),
            Err(StorageError::InvalidTableName { .. })
        ));
    }
}

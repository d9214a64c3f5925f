//! File-based table backend for persistent storage.

use crate::backend::{validate_table_name, TableBackend};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Default file extension for table files.
const DEFAULT_EXTENSION: &str = "tbl";

/// A directory-based table backend.
///
/// Each table is stored as `<dir>/<name>.<extension>`. Data survives
/// process restarts.
///
/// # Durability
///
/// `write_table` writes to `<name>.<extension>.tmp`, calls
/// `File::sync_all()`, then renames the temporary file over the table.
/// A crash mid-write leaves either the old or the new table, never a
/// truncated mix.
///
/// # Example
///
/// ```no_run
/// use libris_storage::{FileBackend, TableBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("catalog")).unwrap().with_extension("json");
/// backend.write_table("books", b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    extension: String,
}

impl FileBackend {
    /// Opens a backend rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            extension: DEFAULT_EXTENSION.to_string(),
        })
    }

    /// Sets the file extension used for table files.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file backing a table.
    #[must_use]
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}.tmp", self.extension))
    }
}

impl TableBackend for FileBackend {
    fn read_table(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_table_name(name)?;
        let mut file = match File::open(self.table_path(name)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn write_table(&mut self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_table_name(name)?;
        let temp = self.temp_path(name);
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.table_path(name))?;
        Ok(())
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        let suffix = format!(".{}", self.extension);
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(&suffix) {
                if validate_table_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn table_size(&self, name: &str) -> StorageResult<u64> {
        validate_table_name(name)?;
        match fs::metadata(self.table_path(name)) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::TableNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

//! # Libris Storage
//!
//! Table storage backends for the Libris catalog engine.
//!
//! This crate provides the lowest-level persistence abstraction for Libris.
//! Backends are **opaque named-table stores** - they do not interpret the
//! bytes they hold.
//!
//! ## Design Principles
//!
//! - A table is a name plus a byte blob; every write replaces the whole blob
//! - No knowledge of books, users, loans, or the encoding used for them
//! - Must be `Send + Sync`
//! - Libris core owns all format interpretation
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral catalogs
//! - [`FileBackend`] - One file per table inside a directory
//!
//! ## Example
//!
//! ```rust
//! use libris_storage::{InMemoryBackend, TableBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_table("books", b"[]").unwrap();
//! assert_eq!(backend.read_table("books").unwrap().as_deref(), Some(&b"[]"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_table_name, TableBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;

//! # Libris Testkit
//!
//! Test utilities for Libris.
//!
//! This crate provides:
//! - Test fixtures with in-memory or temporary-directory catalogs
//! - Property-based generators for catalog commands
//! - An invariant-checking harness that replays command sequences
//!
//! ## Usage
//!
//! ```rust
//! use libris_testkit::prelude::*;
//! use libris_core::NewBook;
//!
//! with_temp_library(|library| {
//!     library.add_book(NewBook::new("Emma", 1)).unwrap();
//!     assert_eq!(library.stats().books, 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;

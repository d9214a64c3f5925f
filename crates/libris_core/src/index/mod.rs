//! Derived lookup structures over the catalog.
//!
//! Indexes hold book IDs only, never copies of mutable entity state, and can
//! be rebuilt from the [`CatalogStore`](crate::CatalogStore) at any time.
//!
//! # Index Types
//!
//! - [`PrefixIndex`]: trie over lower-cased titles and author names
//! - [`OrderedKeyIndex`]: AVL tree keyed by numeric key
//! - [`TitleIndex`]: exact titles in lexicographic order
//!
//! # Staleness
//!
//! `PrefixIndex` and `OrderedKeyIndex` have no delete operation. Entries for
//! removed books stay behind and every consumer re-validates IDs against
//! the catalog. `TitleIndex` is kept exact.

mod ordered;
mod prefix;
mod title;

pub use ordered::OrderedKeyIndex;
pub use prefix::PrefixIndex;
pub use title::TitleIndex;

//! Entity identifiers and numeric key derivation.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use tracing::debug;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the ID as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Canonical key of a book (usually an ISBN, caller-supplied or generated).
    BookId
}

string_id! {
    /// Canonical key of a library user.
    UserId
}

string_id! {
    /// Identifier of a single loan record.
    LoanId
}

impl BookId {
    /// Derives the numeric key used by the ordered index.
    ///
    /// See [`numeric_key`].
    #[must_use]
    pub fn numeric_key(&self) -> i64 {
        numeric_key(&self.0)
    }
}

/// Derives a numeric key from an ID string.
///
/// All non-digit characters are stripped and the remaining digits are parsed
/// as a signed 64-bit integer. An empty digit string or a value that does not
/// fit yields 0.
///
/// ```
/// use libris_core::numeric_key;
///
/// assert_eq!(numeric_key("978-0-306-40615-7"), 9780306406157);
/// assert_eq!(numeric_key("no digits"), 0);
/// ```
#[must_use]
pub fn numeric_key(id: &str) -> i64 {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        debug!(id, "id has no digits, numeric key resolves to 0");
        return 0;
    }
    match digits.parse::<i64>() {
        Ok(key) => key,
        Err(_) => {
            debug!(id, "numeric key overflows i64, resolves to 0");
            0
        }
    }
}

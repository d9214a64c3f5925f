//! Catalog configuration.

/// Configuration for opening a catalog.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to flush the touched tables after every mutating command.
    pub write_through: bool,

    /// Default number of suggestions returned by `search`.
    pub search_limit: usize,

    /// Default number of books returned by `recommend`.
    pub recommend_limit: usize,

    /// Prefix of generated book IDs.
    pub generated_book_prefix: String,

    /// Number of random digits after the book prefix.
    pub generated_book_digits: usize,

    /// Number of digits in a generated user ID.
    pub user_id_digits: usize,

    /// Prefix of loan IDs.
    pub loan_id_prefix: String,

    /// Number of random digits in a loan ID.
    pub loan_id_digits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_through: true,
            search_limit: 10,
            recommend_limit: 10,
            generated_book_prefix: "978".to_string(),
            generated_book_digits: 10,
            user_id_digits: 12,
            loan_id_prefix: "P".to_string(),
            loan_id_digits: 8,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether mutating commands flush to the persistence port.
    #[must_use]
    pub const fn write_through(mut self, value: bool) -> Self {
        self.write_through = value;
        self
    }

    /// Sets the default search limit.
    #[must_use]
    pub const fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Sets the default recommendation limit.
    #[must_use]
    pub const fn recommend_limit(mut self, limit: usize) -> Self {
        self.recommend_limit = limit;
        self
    }

    /// Sets the shape of generated book IDs.
    #[must_use]
    pub fn book_ids(mut self, prefix: impl Into<String>, digits: usize) -> Self {
        self.generated_book_prefix = prefix.into();
        self.generated_book_digits = digits;
        self
    }

    /// Sets the number of digits in generated user IDs.
    #[must_use]
    pub const fn user_id_digits(mut self, digits: usize) -> Self {
        self.user_id_digits = digits;
        self
    }

    /// Sets the shape of loan IDs.
    #[must_use]
    pub fn loan_ids(mut self, prefix: impl Into<String>, digits: usize) -> Self {
        self.loan_id_prefix = prefix.into();
        self.loan_id_digits = digits;
        self
    }
}

//! ID generation.

use crate::config::Config;
use crate::entity::{BookId, LoanId, UserId};
use crate::error::{CoreError, CoreResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use tracing::warn;

/// Source of random-looking digit strings for new IDs.
///
/// The catalog never reaches for a global random generator; it asks the
/// `IdGenerator` it was opened with, so tests can supply a deterministic one.
pub trait IdGenerator: Send {
    /// Returns a string of exactly `len` ASCII digits.
    fn digits(&mut self, len: usize) -> String;
}

/// Production generator backed by a seeded `StdRng`.
pub struct RandomIdGenerator {
    rng: StdRng,
}

impl RandomIdGenerator {
    /// Creates a generator seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomIdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator for RandomIdGenerator {
    fn digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Deterministic generator yielding zero-padded increasing numbers.
///
/// The first call returns `1` padded to the requested width, the next `2`,
/// and so on. Once the counter needs more digits than requested it is
/// emitted unpadded.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn digits(&mut self, len: usize) -> String {
        let value = self.next;
        self.next = self.next.saturating_add(1);
        format!("{value:0len$}")
    }
}

/// Candidates tried before a mint gives up.
const MAX_MINT_ATTEMPTS: usize = 64;

/// Mints book, user and loan IDs in the configured shapes.
///
/// Each mint method takes a `taken` predicate and retries until the
/// generator produces an unused ID, giving up after 64 candidates.
pub struct IdMint {
    generator: Box<dyn IdGenerator>,
    book_prefix: String,
    book_digits: usize,
    user_digits: usize,
    loan_prefix: String,
    loan_digits: usize,
}

impl IdMint {
    /// Creates a mint from the catalog configuration.
    pub fn new(config: &Config, generator: Box<dyn IdGenerator>) -> Self {
        Self {
            generator,
            book_prefix: config.generated_book_prefix.clone(),
            book_digits: config.generated_book_digits,
            user_digits: config.user_id_digits,
            loan_prefix: config.loan_id_prefix.clone(),
            loan_digits: config.loan_id_digits,
        }
    }

    fn mint<T>(
        &mut self,
        kind: &'static str,
        mut candidate: impl FnMut(&mut dyn IdGenerator) -> T,
        taken: impl Fn(&T) -> bool,
    ) -> CoreResult<T> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let id = candidate(self.generator.as_mut());
            if !taken(&id) {
                return Ok(id);
            }
        }
        warn!(kind, attempts = MAX_MINT_ATTEMPTS, "id space exhausted");
        Err(CoreError::IdSpaceExhausted {
            kind,
            attempts: MAX_MINT_ATTEMPTS,
        })
    }

    /// Mints a book ID such as `978` followed by ten digits.
    ///
    /// # Errors
    ///
    /// Returns `IdSpaceExhausted` if every candidate was taken.
    pub fn book_id(&mut self, taken: impl Fn(&BookId) -> bool) -> CoreResult<BookId> {
        let (prefix, digits) = (self.book_prefix.clone(), self.book_digits);
        self.mint(
            "book",
            |generator| BookId::new(format!("{prefix}{}", generator.digits(digits))),
            taken,
        )
    }

    /// Mints a purely numeric user ID.
    ///
    /// # Errors
    ///
    /// Returns `IdSpaceExhausted` if every candidate was taken.
    pub fn user_id(&mut self, taken: impl Fn(&UserId) -> bool) -> CoreResult<UserId> {
        let digits = self.user_digits;
        self.mint("user", |generator| UserId::new(generator.digits(digits)), taken)
    }

    /// Mints a loan ID such as `P` followed by eight digits.
    ///
    /// # Errors
    ///
    /// Returns `IdSpaceExhausted` if every candidate was taken.
    pub fn loan_id(&mut self, taken: impl Fn(&LoanId) -> bool) -> CoreResult<LoanId> {
        let (prefix, digits) = (self.loan_prefix.clone(), self.loan_digits);
        self.mint(
            "loan",
            |generator| LoanId::new(format!("{prefix}{}", generator.digits(digits))),
            taken,
        )
    }
}

impl fmt::Debug for IdMint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdMint")
            .field("book_prefix", &self.book_prefix)
            .field("book_digits", &self.book_digits)
            .field("user_digits", &self.user_digits)
            .field("loan_prefix", &self.loan_prefix)
            .field("loan_digits", &self.loan_digits)
            .finish_non_exhaustive()
    }
}

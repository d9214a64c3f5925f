//! Catalog store: canonical entity tables and cascading mutation rules.

use crate::entity::{
    normalize_genre, Book, BookId, BookUpdate, IdMint, Loan, LoanId, User, UserId,
};
use crate::error::{CoreError, CoreResult};
use crate::persistence::{Snapshot, WaitlistRow};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Result of a loan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanOutcome {
    /// A copy was taken from the shelf.
    Granted {
        /// The new loan.
        loan_id: LoanId,
    },
    /// No copy was available; the user joined the waitlist.
    Queued {
        /// 1-based position in the waitlist.
        position: usize,
    },
}

/// A waitlisted user who received a returned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// The user who was first in line.
    pub user_id: UserId,
    /// The loan created for them.
    pub loan_id: LoanId,
}

/// Result of returning a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    /// The loan that was closed.
    pub loan_id: LoanId,
    /// Set when the copy went straight to the next user in the waitlist.
    pub promoted: Option<Promotion>,
}

/// Canonical entity tables.
///
/// `CatalogStore` exclusively owns books, users, loans and waitlists, and
/// enforces the rules that keep them mutually consistent:
///
/// - `0 <= available_copies <= total_copies` for every book
/// - `active_loan_count == active_loans.len()` for every user
/// - at most one active loan per (book, user) pair
/// - `available_copies + copies on active loan == total_copies`
///
/// Every cascading mutation validates all lookups before it changes
/// anything, so a failed command leaves the tables untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStore {
    books: BTreeMap<BookId, Book>,
    users: BTreeMap<UserId, User>,
    loans: BTreeMap<LoanId, Loan>,
    waitlists: BTreeMap<BookId, VecDeque<UserId>>,
}

impl CatalogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the tables from a persisted snapshot.
    ///
    /// Active-loan counters are recomputed from the active-loan sets and
    /// empty waitlists are dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let books = snapshot
            .books
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();
        let users = snapshot
            .users
            .into_iter()
            .map(|mut user| {
                let count = u32::try_from(user.active_loans.len()).unwrap_or(u32::MAX);
                if user.active_loan_count != count {
                    debug!(user_id = %user.id, stored = user.active_loan_count, count, "repairing active loan counter");
                    user.active_loan_count = count;
                }
                (user.id.clone(), user)
            })
            .collect();
        let loans = snapshot
            .loans
            .into_iter()
            .map(|loan| (loan.id.clone(), loan))
            .collect();
        let waitlists = snapshot
            .waitlists
            .into_iter()
            .filter(|row| !row.users.is_empty())
            .map(|row| (row.book_id, row.users.into_iter().collect()))
            .collect();
        Self {
            books,
            users,
            loans,
            waitlists,
        }
    }

    /// Copies the tables into a snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            books: self.books.values().cloned().collect(),
            users: self.users.values().cloned().collect(),
            loans: self.loans.values().cloned().collect(),
            waitlists: self.waitlist_rows(),
        }
    }

    /// Returns the waitlists in their persisted row form.
    #[must_use]
    pub fn waitlist_rows(&self) -> Vec<WaitlistRow> {
        self.waitlists
            .iter()
            .map(|(book_id, queue)| WaitlistRow {
                book_id: book_id.clone(),
                users: queue.iter().cloned().collect(),
            })
            .collect()
    }

    // === Reads ===

    /// Looks up a book.
    #[must_use]
    pub fn book(&self, id: &BookId) -> Option<&Book> {
        self.books.get(id)
    }

    /// Returns true if the book exists.
    #[must_use]
    pub fn contains_book(&self, id: &BookId) -> bool {
        self.books.contains_key(id)
    }

    /// Iterates books in ID order.
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Number of books.
    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Looks up a user.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Returns true if the user exists.
    #[must_use]
    pub fn contains_user(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// Iterates users in ID order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Looks up a loan.
    #[must_use]
    pub fn loan(&self, id: &LoanId) -> Option<&Loan> {
        self.loans.get(id)
    }

    /// Iterates loans (active and returned) in ID order.
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// Returns the active loan for a (user, book) pair.
    #[must_use]
    pub fn active_loan(&self, user_id: &UserId, book_id: &BookId) -> Option<&Loan> {
        self.loans
            .values()
            .find(|loan| loan.active && &loan.user_id == user_id && &loan.book_id == book_id)
    }

    /// Number of active loans across the catalog.
    #[must_use]
    pub fn active_loan_total(&self) -> usize {
        self.loans.values().filter(|loan| loan.active).count()
    }

    /// Number of users currently holding a copy of the book.
    #[must_use]
    pub fn copies_on_loan(&self, book_id: &BookId) -> usize {
        self.users
            .values()
            .filter(|user| user.has_on_loan(book_id))
            .count()
    }

    /// Returns the waitlist of a book, front first.
    #[must_use]
    pub fn waitlist(&self, book_id: &BookId) -> Option<&VecDeque<UserId>> {
        self.waitlists.get(book_id)
    }

    /// Total number of queued requests across all books.
    #[must_use]
    pub fn queued_total(&self) -> usize {
        self.waitlists.values().map(VecDeque::len).sum()
    }

    /// Books whose normalized genre contains the normalized query.
    ///
    /// Normalization lower-cases and keeps only alphanumerics, so
    /// `"sci fi"` matches `"Sci-Fi"`.
    #[must_use]
    pub fn books_by_genre(&self, genre: &str) -> Vec<&Book> {
        let needle = normalize_genre(genre);
        self.books
            .values()
            .filter(|book| normalize_genre(&book.genre).contains(&needle))
            .collect()
    }

    // === Inserts ===

    /// Adds a book.
    ///
    /// # Errors
    ///
    /// Returns `BookExists` if the ID is taken.
    pub fn insert_book(&mut self, book: Book) -> CoreResult<()> {
        if self.books.contains_key(&book.id) {
            return Err(CoreError::BookExists { id: book.id });
        }
        self.books.insert(book.id.clone(), book);
        Ok(())
    }

    /// Adds a user.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the ID is taken.
    pub fn insert_user(&mut self, user: User) -> CoreResult<()> {
        if self.users.contains_key(&user.id) {
            return Err(CoreError::UserExists { id: user.id });
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    // === Loan state machine ===

    /// Requests a loan of `book_id` for `user_id`.
    ///
    /// With a copy on the shelf the loan is granted immediately; otherwise
    /// the user is appended to the book's waitlist. Queued requests do not
    /// reserve stock.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `BookNotFound`, `AlreadyBorrowed` if the user
    /// already holds an active loan on the book, or `IdSpaceExhausted` if no
    /// loan ID could be minted.
    pub fn request_loan(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
        mint: &mut IdMint,
    ) -> CoreResult<LoanOutcome> {
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| CoreError::user_not_found(user_id))?;
        let book = self
            .books
            .get(book_id)
            .ok_or_else(|| CoreError::book_not_found(book_id))?;
        if user.has_on_loan(book_id) {
            return Err(CoreError::already_borrowed(user_id, book_id));
        }

        if book.available_copies > 0 {
            let loan_id = mint.loan_id(|id| self.loans.contains_key(id))?;
            self.grant(user_id, book_id, loan_id.clone(), true)?;
            Ok(LoanOutcome::Granted { loan_id })
        } else {
            let queue = self.waitlists.entry(book_id.clone()).or_default();
            queue.push_back(user_id.clone());
            Ok(LoanOutcome::Queued {
                position: queue.len(),
            })
        }
    }

    /// Returns a borrowed copy.
    ///
    /// The loan is deactivated and the title appended to the user's read
    /// history. If someone is waiting for the book, the copy passes straight
    /// to the first eligible user in line and `available_copies` stays put;
    /// otherwise it goes back on the shelf.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `BookNotFound`, `LoanNotFound` if the pair has no
    /// active loan, or `IdSpaceExhausted` if someone is waiting and no loan
    /// ID could be minted for them.
    pub fn return_loan(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
        mint: &mut IdMint,
    ) -> CoreResult<ReturnOutcome> {
        if !self.users.contains_key(user_id) {
            return Err(CoreError::user_not_found(user_id));
        }
        let title = self
            .books
            .get(book_id)
            .map(|book| book.title.clone())
            .ok_or_else(|| CoreError::book_not_found(book_id))?;
        let loan_id = self
            .active_loan(user_id, book_id)
            .map(|loan| loan.id.clone())
            .ok_or_else(|| CoreError::loan_not_found(user_id, book_id))?;
        // Minted up front so a failure leaves the tables untouched.
        let handover_id = if self.waitlists.get(book_id).is_some_and(|queue| !queue.is_empty()) {
            Some(mint.loan_id(|id| self.loans.contains_key(id))?)
        } else {
            None
        };

        if let Some(loan) = self.loans.get_mut(&loan_id) {
            loan.active = false;
        }
        if let Some(user) = self.users.get_mut(user_id) {
            if user.active_loans.remove(book_id) {
                user.active_loan_count = user.active_loan_count.saturating_sub(1);
            }
            user.read_history.push(title);
        }

        let promoted = match handover_id {
            Some(handover_id) => self.promote_next(book_id, handover_id)?,
            None => None,
        };
        if promoted.is_none() {
            self.restock(book_id);
        }
        Ok(ReturnOutcome { loan_id, promoted })
    }

    /// Hands a freed copy to the first eligible user in the book's waitlist.
    ///
    /// Queued IDs whose user is gone or already holds the book are dropped.
    fn promote_next(&mut self, book_id: &BookId, loan_id: LoanId) -> CoreResult<Option<Promotion>> {
        let mut promoted = None;
        while let Some(next) = self
            .waitlists
            .get_mut(book_id)
            .and_then(VecDeque::pop_front)
        {
            let eligible = self
                .users
                .get(&next)
                .is_some_and(|user| !user.has_on_loan(book_id));
            if !eligible {
                debug!(book_id = %book_id, user_id = %next, "skipping ineligible waitlist entry");
                continue;
            }
            self.grant(&next, book_id, loan_id.clone(), false)?;
            promoted = Some(Promotion {
                user_id: next,
                loan_id,
            });
            break;
        }
        self.drop_empty_waitlist(book_id);
        Ok(promoted)
    }

    /// Creates an active loan. Both entities must exist.
    fn grant(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
        loan_id: LoanId,
        from_shelf: bool,
    ) -> CoreResult<()> {
        let book = self
            .books
            .get_mut(book_id)
            .ok_or_else(|| CoreError::book_not_found(book_id))?;
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| CoreError::user_not_found(user_id))?;

        if from_shelf {
            book.available_copies = book.available_copies.saturating_sub(1);
        }
        if user.active_loans.insert(book_id.clone()) {
            user.active_loan_count = user.active_loan_count.saturating_add(1);
        }
        user.loan_history.push(book_id.clone());

        self.loans.insert(
            loan_id.clone(),
            Loan {
                id: loan_id,
                book_id: book_id.clone(),
                user_id: user_id.clone(),
                title: book.title.clone(),
                active: true,
            },
        );
        Ok(())
    }

    /// Puts one copy back on the shelf, never above `total_copies`.
    fn restock(&mut self, book_id: &BookId) {
        if let Some(book) = self.books.get_mut(book_id) {
            if book.available_copies < book.total_copies {
                book.available_copies += 1;
            }
        }
    }

    fn drop_empty_waitlist(&mut self, book_id: &BookId) {
        if self.waitlists.get(book_id).is_some_and(VecDeque::is_empty) {
            self.waitlists.remove(book_id);
        }
    }

    // === Cascading deletes and edits ===

    /// Deletes a book and everything that references it.
    ///
    /// Removes every loan of the book, drops it from each user's active
    /// loans, loan history and read history (by title), and discards its
    /// waitlist. Derived indexes are not touched.
    ///
    /// # Errors
    ///
    /// Returns `BookNotFound` if the book does not exist.
    pub fn delete_book(&mut self, id: &BookId) -> CoreResult<Book> {
        let book = self
            .books
            .remove(id)
            .ok_or_else(|| CoreError::book_not_found(id))?;

        let before = self.loans.len();
        self.loans.retain(|_, loan| &loan.book_id != id);
        debug!(book_id = %id, removed_loans = before - self.loans.len(), "cascading book delete");

        for user in self.users.values_mut() {
            if user.active_loans.remove(id) {
                user.active_loan_count = user.active_loan_count.saturating_sub(1);
            }
            user.loan_history.retain(|entry| entry != id);
            user.read_history.retain(|title| title != &book.title);
        }
        self.waitlists.remove(id);
        Ok(book)
    }

    /// Deletes a user and everything that references them.
    ///
    /// Each of the user's active loans is force-returned to the shelf, their
    /// loan records are removed, and they leave every waitlist.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    pub fn delete_user(&mut self, id: &UserId) -> CoreResult<User> {
        let user = self
            .users
            .remove(id)
            .ok_or_else(|| CoreError::user_not_found(id))?;

        for book_id in &user.active_loans {
            self.restock(book_id);
        }
        self.loans.retain(|_, loan| &loan.user_id != id);
        for queue in self.waitlists.values_mut() {
            queue.retain(|queued| queued != id);
        }
        self.waitlists.retain(|_, queue| !queue.is_empty());
        debug!(user_id = %id, forced_returns = user.active_loans.len(), "cascading user delete");
        Ok(user)
    }

    /// Applies field changes to a book and returns its previous state.
    ///
    /// A new title is propagated into the book's loan records and into every
    /// read-history entry equal to the old title. A new copy count shifts
    /// `available_copies` by the same delta.
    ///
    /// # Errors
    ///
    /// `BookNotFound`, or `InvalidOperation` if `total_copies` would drop
    /// below the number of copies currently out.
    pub fn modify_book(&mut self, id: &BookId, update: BookUpdate) -> CoreResult<Book> {
        let current = self
            .books
            .get(id)
            .ok_or_else(|| CoreError::book_not_found(id))?;
        let out = current.copies_out();
        if let Some(total) = update.total_copies {
            if total < out {
                return Err(CoreError::invalid_operation(format!(
                    "cannot set total copies of {id} to {total}: {out} copies are out"
                )));
            }
        }
        let previous = current.clone();

        if let Some(book) = self.books.get_mut(id) {
            if let Some(title) = update.title {
                book.title = title;
            }
            if let Some(authors) = update.authors {
                book.authors = authors;
            }
            if let Some(genre) = update.genre {
                book.genre = genre;
            }
            if let Some(date) = update.publication_date {
                book.publication_date = date;
            }
            if let Some(total) = update.total_copies {
                book.total_copies = total;
                book.available_copies = total - out;
            }

            if book.title != previous.title {
                let new_title = book.title.clone();
                for loan in self.loans.values_mut().filter(|loan| &loan.book_id == id) {
                    loan.title.clone_from(&new_title);
                }
                for user in self.users.values_mut() {
                    for title in user
                        .read_history
                        .iter_mut()
                        .filter(|title| **title == previous.title)
                    {
                        title.clone_from(&new_title);
                    }
                }
            }
        }
        Ok(previous)
    }

    // === Compensations used by undo ===

    /// Cancels a still-active loan as if it had never been granted.
    ///
    /// The loan record is removed, the copy goes back on the shelf and the
    /// book leaves the user's active loans. Loan history is left alone.
    /// Returns false if the loan is gone or no longer active.
    pub fn revoke_loan(&mut self, loan_id: &LoanId) -> bool {
        if !self.loans.get(loan_id).is_some_and(|loan| loan.active) {
            return false;
        }
        let Some(loan) = self.loans.remove(loan_id) else {
            return false;
        };
        self.restock(&loan.book_id);
        if let Some(user) = self.users.get_mut(&loan.user_id) {
            if user.active_loans.remove(&loan.book_id) {
                user.active_loan_count = user.active_loan_count.saturating_sub(1);
            }
        }
        true
    }

    /// Removes the first occurrence of a user from a book's waitlist,
    /// keeping everyone else in order. Returns false if they were not queued.
    pub fn withdraw_request(&mut self, book_id: &BookId, user_id: &UserId) -> bool {
        let Some(queue) = self.waitlists.get_mut(book_id) else {
            return false;
        };
        let Some(position) = queue.iter().position(|queued| queued == user_id) else {
            return false;
        };
        queue.remove(position);
        self.drop_empty_waitlist(book_id);
        true
    }

    // === Verification ===

    /// Checks the cross-table invariants and describes every violation.
    ///
    /// An empty result means the tables are consistent.
    #[must_use]
    pub fn verify(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for book in self.books.values() {
            if book.available_copies > book.total_copies {
                problems.push(format!(
                    "book {}: available {} exceeds total {}",
                    book.id, book.available_copies, book.total_copies
                ));
            }
            let holders = self.copies_on_loan(&book.id);
            if book.available_copies as usize + holders != book.total_copies as usize {
                problems.push(format!(
                    "book {}: available {} + on loan {} != total {}",
                    book.id, book.available_copies, holders, book.total_copies
                ));
            }
        }

        let mut active_pairs = BTreeSet::new();
        for loan in self.loans.values().filter(|loan| loan.active) {
            if !active_pairs.insert((&loan.user_id, &loan.book_id)) {
                problems.push(format!(
                    "user {} has more than one active loan of book {}",
                    loan.user_id, loan.book_id
                ));
            }
            if !self.books.contains_key(&loan.book_id) {
                problems.push(format!("loan {} references missing book {}", loan.id, loan.book_id));
            }
            match self.users.get(&loan.user_id) {
                Some(user) if user.has_on_loan(&loan.book_id) => {}
                Some(_) => problems.push(format!(
                    "loan {} is active but user {} does not hold book {}",
                    loan.id, loan.user_id, loan.book_id
                )),
                None => problems.push(format!("loan {} references missing user {}", loan.id, loan.user_id)),
            }
        }

        for user in self.users.values() {
            if user.active_loan_count as usize != user.active_loans.len() {
                problems.push(format!(
                    "user {}: active loan count {} != {} active loans",
                    user.id,
                    user.active_loan_count,
                    user.active_loans.len()
                ));
            }
            for book_id in &user.active_loans {
                if !active_pairs.contains(&(&user.id, book_id)) {
                    problems.push(format!(
                        "user {} holds book {} without an active loan record",
                        user.id, book_id
                    ));
                }
            }
        }

        for (book_id, queue) in &self.waitlists {
            if !self.books.contains_key(book_id) {
                problems.push(format!("waitlist for missing book {book_id}"));
            }
            for user_id in queue.iter().filter(|id| !self.users.contains_key(*id)) {
                problems.push(format!("waitlist for {book_id} contains missing user {user_id}"));
            }
        }

        problems
    }
}

//! Catalog service facade.

use crate::config::Config;
use crate::entity::{
    Book, BookId, BookUpdate, CatalogStore, IdGenerator, IdMint, LoanOutcome, NewBook, NewUser,
    RandomIdGenerator, ReturnOutcome, User, UserId,
};
use crate::error::{CoreError, CoreResult};
use crate::graph::CoOccurrenceGraph;
use crate::index::{OrderedKeyIndex, PrefixIndex, TitleIndex};
use crate::persistence::{
    Persistence, PersistenceFailure, TablePersistence, Tables, BOOKS_TABLE, LOANS_TABLE,
    USERS_TABLE, WAITLISTS_TABLE,
};
use crate::stats::{CatalogStats, CommandCounters};
use crate::transaction::{Action, ActionKind, TransactionLog, UndoOutcome};
use libris_storage::InMemoryBackend;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

const TABLE_ORDER: [(Tables, &str); 4] = [
    (Tables::BOOKS, BOOKS_TABLE),
    (Tables::USERS, USERS_TABLE),
    (Tables::LOANS, LOANS_TABLE),
    (Tables::WAITLISTS, WAITLISTS_TABLE),
];

fn save_table(persistence: &mut dyn Persistence, catalog: &CatalogStore, table: Tables) -> CoreResult<()> {
    match table {
        Tables::BOOKS => persistence.save_books(catalog),
        Tables::USERS => persistence.save_users(catalog),
        Tables::LOANS => persistence.save_loans(catalog),
        Tables::WAITLISTS => persistence.save_waitlists(catalog),
        _ => Ok(()),
    }
}

/// The lookup indexes maintained alongside the catalog.
#[derive(Debug, Default)]
struct Indexes {
    prefix: PrefixIndex,
    ordered: OrderedKeyIndex,
    titles: TitleIndex,
}

impl Indexes {
    fn add(&mut self, book: &Book) {
        self.prefix.index_term(&book.title, &book.id);
        for author in &book.authors {
            self.prefix.index_term(author, &book.id);
        }
        if book.numeric_key != 0 {
            self.ordered.insert(book.numeric_key, book.id.clone());
        }
        self.titles.insert(&book.title, book.id.clone());
    }

    fn rebuild(&mut self, catalog: &CatalogStore) {
        *self = Self::default();
        for book in catalog.books() {
            self.add(book);
        }
    }
}

/// The main catalog handle.
///
/// `LibraryService` is the single owner of all catalog state. Each command:
///
/// 1. Validates and mutates the [`CatalogStore`]
/// 2. Propagates the change into the indexes and the co-occurrence graph
/// 3. Appends an [`Action`] to the undo log
/// 4. Flushes the touched tables through the persistence port
///
/// A failed command changes nothing. A failed flush does not roll back the
/// command; it is logged and kept for [`take_persistence_failures`].
///
/// # Example
///
/// ```rust
/// use libris_core::{LibraryService, LoanOutcome, NewBook, NewUser};
///
/// let mut library = LibraryService::open_in_memory().unwrap();
/// let book = library
///     .add_book(NewBook::new("Dune", 1).author("Frank Herbert"))
///     .unwrap();
/// let user = library.add_user(NewUser::new("Ana", "ana@example.org")).unwrap();
///
/// let outcome = library.loan_book(&user, &book).unwrap();
/// assert!(matches!(outcome, LoanOutcome::Granted { .. }));
/// assert_eq!(library.search("du", None), vec!["Dune (Autor: Frank Herbert)"]);
/// ```
///
/// [`take_persistence_failures`]: LibraryService::take_persistence_failures
pub struct LibraryService {
    config: Config,
    catalog: CatalogStore,
    indexes: Indexes,
    graph: CoOccurrenceGraph,
    log: TransactionLog,
    mint: IdMint,
    persistence: Box<dyn Persistence>,
    failures: Vec<PersistenceFailure>,
    counters: CommandCounters,
}

impl LibraryService {
    /// Opens a catalog from a persistence port.
    ///
    /// Loads the snapshot, rebuilds every derived index from it and starts
    /// with an empty undo log.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    pub fn open<P, G>(config: Config, persistence: P, ids: G) -> CoreResult<Self>
    where
        P: Persistence + 'static,
        G: IdGenerator + 'static,
    {
        let snapshot = persistence.load_snapshot()?;
        let catalog = CatalogStore::from_snapshot(snapshot);
        let mint = IdMint::new(&config, Box::new(ids));

        let mut service = Self {
            config,
            catalog,
            indexes: Indexes::default(),
            graph: CoOccurrenceGraph::new(),
            log: TransactionLog::new(),
            mint,
            persistence: Box::new(persistence),
            failures: Vec::new(),
            counters: CommandCounters::new(),
        };
        service.rebuild_indexes();

        let problems = service.catalog.verify();
        if !problems.is_empty() {
            warn!(count = problems.len(), first = %problems[0], "loaded catalog is inconsistent");
        }
        info!(
            books = service.catalog.book_count(),
            users = service.catalog.user_count(),
            active_loans = service.catalog.active_loan_total(),
            "catalog opened"
        );
        Ok(service)
    }

    /// Opens an empty catalog backed by memory only.
    ///
    /// # Errors
    ///
    /// Infallible in practice; the signature matches [`open`](Self::open).
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(
            Config::default(),
            TablePersistence::new(InMemoryBackend::new()),
            RandomIdGenerator::new(),
        )
    }

    /// Rebuilds the prefix, ordered and title indexes and the graph.
    ///
    /// Discards any stale index entries.
    pub fn rebuild_indexes(&mut self) {
        self.indexes.rebuild(&self.catalog);
        self.graph.rebuild(self.catalog.users(), &self.catalog);
        debug!(
            terms = self.indexes.prefix.term_count(),
            ordered = self.indexes.ordered.len(),
            "indexes rebuilt"
        );
    }

    // === Books ===

    /// Adds a book and returns its ID.
    ///
    /// An ID is generated when `NewBook::id` is `None` or blank.
    ///
    /// # Errors
    ///
    /// Returns `BookExists` if the supplied ID is taken, or
    /// `IdSpaceExhausted` if no free ID could be generated.
    pub fn add_book(&mut self, new: NewBook) -> CoreResult<BookId> {
        let supplied = new.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let id = match supplied {
            Some(id) => BookId::new(id),
            None => self
                .mint
                .book_id(|id| self.catalog.contains_book(id))
                .map_err(|err| self.reject(err))?,
        };

        let book = Book::from_new(id.clone(), new);
        self.catalog
            .insert_book(book)
            .map_err(|err| self.reject(err))?;
        if let Some(book) = self.catalog.book(&id) {
            self.indexes.add(book);
        }

        info!(book_id = %id, "book added");
        self.commit(Action::AddBook { book_id: id.clone() }, Tables::BOOKS);
        Ok(id)
    }

    /// Removes a book with all of its loans and waitlist.
    ///
    /// # Errors
    ///
    /// Returns `BookNotFound` if the book does not exist.
    pub fn remove_book(&mut self, id: &BookId) -> CoreResult<()> {
        let book = self.catalog.delete_book(id).map_err(|err| self.reject(err))?;
        self.indexes.titles.remove(&book.title, id);

        info!(book_id = %id, "book removed");
        self.commit(Action::DeleteBook { book_id: id.clone() }, Tables::ALL);
        Ok(())
    }

    /// Changes the fields of a book.
    ///
    /// A new title is propagated into loans and read histories and indexed
    /// for search. Terms of the old title stay in the prefix index.
    ///
    /// # Errors
    ///
    /// `BookNotFound`, or `InvalidOperation` if `total_copies` would drop
    /// below the number of copies currently out.
    pub fn modify_book(&mut self, id: &BookId, update: BookUpdate) -> CoreResult<()> {
        let previous = self
            .catalog
            .modify_book(id, update)
            .map_err(|err| self.reject(err))?;
        if let Some(book) = self.catalog.book(id) {
            self.indexes.titles.remove(&previous.title, id);
            self.indexes.add(book);
        }

        info!(book_id = %id, "book modified");
        self.commit(
            Action::ModifyBook { book_id: id.clone() },
            Tables::BOOKS | Tables::USERS | Tables::LOANS,
        );
        Ok(())
    }

    // === Users ===

    /// Registers a user and returns their ID.
    ///
    /// An ID is generated when `NewUser::id` is `None` or blank.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the supplied ID is taken, or
    /// `IdSpaceExhausted` if no free ID could be generated.
    pub fn add_user(&mut self, new: NewUser) -> CoreResult<UserId> {
        let supplied = new.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let id = match supplied {
            Some(id) => UserId::new(id),
            None => self
                .mint
                .user_id(|id| self.catalog.contains_user(id))
                .map_err(|err| self.reject(err))?,
        };

        let user = User::from_new(id.clone(), new);
        self.catalog
            .insert_user(user)
            .map_err(|err| self.reject(err))?;

        info!(user_id = %id, "user added");
        self.commit(Action::AddUser { user_id: id.clone() }, Tables::USERS);
        Ok(id)
    }

    /// Removes a user, returning their borrowed copies to the shelf.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    pub fn remove_user(&mut self, id: &UserId) -> CoreResult<()> {
        let user = self.catalog.delete_user(id).map_err(|err| self.reject(err))?;

        info!(user_id = %id, forced_returns = user.active_loans.len(), "user removed");
        self.commit(Action::DeleteUser { user_id: id.clone() }, Tables::ALL);
        Ok(())
    }

    // === Loans ===

    /// Lends a book to a user, or queues the request if no copy is free.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `BookNotFound`, `AlreadyBorrowed`, or
    /// `IdSpaceExhausted` if no loan ID could be minted.
    pub fn loan_book(&mut self, user_id: &UserId, book_id: &BookId) -> CoreResult<LoanOutcome> {
        let outcome = self
            .catalog
            .request_loan(user_id, book_id, &mut self.mint)
            .map_err(|err| self.reject(err))?;

        match &outcome {
            LoanOutcome::Granted { loan_id } => {
                self.record_co_occurrence(user_id, book_id);
                info!(user_id = %user_id, book_id = %book_id, loan_id = %loan_id, "loan granted");
                self.commit(
                    Action::LoanGranted {
                        loan_id: loan_id.clone(),
                        user_id: user_id.clone(),
                        book_id: book_id.clone(),
                    },
                    Tables::BOOKS | Tables::USERS | Tables::LOANS,
                );
            }
            LoanOutcome::Queued { position } => {
                info!(user_id = %user_id, book_id = %book_id, position, "loan request queued");
                self.commit(
                    Action::Queued {
                        book_id: book_id.clone(),
                        user_id: user_id.clone(),
                    },
                    Tables::WAITLISTS,
                );
            }
        }
        Ok(outcome)
    }

    /// Returns a borrowed book.
    ///
    /// If users are waiting for it, the copy goes to the first eligible one.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `BookNotFound`, or `LoanNotFound` if the user does not
    /// hold the book. `IdSpaceExhausted` if a waiter is due a copy but no
    /// loan ID could be minted; the return is then not applied.
    pub fn return_book(&mut self, user_id: &UserId, book_id: &BookId) -> CoreResult<ReturnOutcome> {
        let outcome = self
            .catalog
            .return_loan(user_id, book_id, &mut self.mint)
            .map_err(|err| self.reject(err))?;

        info!(user_id = %user_id, book_id = %book_id, loan_id = %outcome.loan_id, "book returned");
        if let Some(promotion) = &outcome.promoted {
            self.record_co_occurrence(&promotion.user_id, book_id);
            info!(
                user_id = %promotion.user_id,
                book_id = %book_id,
                loan_id = %promotion.loan_id,
                "waitlist promoted"
            );
        }
        self.commit(
            Action::ReturnLoan {
                loan_id: outcome.loan_id.clone(),
                user_id: user_id.clone(),
                book_id: book_id.clone(),
            },
            Tables::ALL,
        );
        Ok(outcome)
    }

    fn record_co_occurrence(&mut self, user_id: &UserId, book_id: &BookId) {
        if let Some(user) = self.catalog.user(user_id) {
            self.graph.record_loan(book_id, &user.loan_history);
        }
    }

    // === Queries ===

    /// Autocompletes titles and author names.
    ///
    /// Returns up to `limit` (default `Config::search_limit`) display lines
    /// of the form `"{title} (Autor: {authors})"`, one per live book. An
    /// empty prefix yields nothing.
    #[must_use]
    pub fn search(&self, prefix: &str, limit: Option<usize>) -> Vec<String> {
        self.counters.record_search();
        let limit = limit.unwrap_or(self.config.search_limit);
        let mut lines = Vec::new();
        if prefix.is_empty() || limit == 0 {
            return lines;
        }

        let mut seen = BTreeSet::new();
        'terms: for term in self.indexes.prefix.prefix_search(prefix) {
            for id in self.indexes.prefix.candidates(&term) {
                let Some(book) = self.catalog.book(id) else {
                    continue;
                };
                if seen.insert(id) {
                    lines.push(suggestion(book));
                    if lines.len() == limit {
                        break 'terms;
                    }
                }
            }
        }
        lines
    }

    /// Recommends books borrowed together with the user's past loans.
    ///
    /// `limit` defaults to `Config::recommend_limit`.
    #[must_use]
    pub fn recommend(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
        genre: Option<&str>,
    ) -> Vec<(BookId, u32)> {
        self.counters.record_recommendation();
        let limit = limit.unwrap_or(self.config.recommend_limit);
        self.graph.recommend(user_id, limit, genre, &self.catalog)
    }

    /// Live books in ascending numeric-key order.
    ///
    /// Books whose ID has no digits are not listed.
    #[must_use]
    pub fn list_by_numeric_key(&self) -> Vec<(i64, BookId)> {
        self.indexes
            .ordered
            .in_order()
            .into_iter()
            .filter(|(_, id)| self.catalog.contains_book(id))
            .collect()
    }

    /// The live book registered under a numeric key.
    ///
    /// When several IDs share a key, the first one added owns it.
    #[must_use]
    pub fn book_by_numeric_key(&self, key: i64) -> Option<&Book> {
        self.indexes.ordered.get(key).and_then(|id| self.catalog.book(id))
    }

    /// Books ordered by title.
    #[must_use]
    pub fn list_by_title(&self) -> Vec<(String, BookId)> {
        self.indexes.titles.scan_ordered()
    }

    /// Books whose genre matches, ignoring case and punctuation.
    #[must_use]
    pub fn books_by_genre(&self, genre: &str) -> Vec<&Book> {
        self.catalog.books_by_genre(genre)
    }

    /// Looks up a book.
    #[must_use]
    pub fn book(&self, id: &BookId) -> Option<&Book> {
        self.catalog.book(id)
    }

    /// Looks up a user.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.catalog.user(id)
    }

    /// Read access to the entity tables.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Read access to the co-occurrence graph.
    #[must_use]
    pub fn graph(&self) -> &CoOccurrenceGraph {
        &self.graph
    }

    /// Read access to the undo log.
    #[must_use]
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Undo ===

    /// Pops the most recent action and applies its compensation.
    ///
    /// Never fails: an empty log, a stale target and an action without a
    /// compensation are all reported through the outcome.
    pub fn undo_last(&mut self) -> UndoOutcome {
        self.counters.record_undo();
        let Some(action) = self.log.pop() else {
            return UndoOutcome::Empty;
        };

        let added_title = match &action {
            Action::AddBook { book_id } => self.catalog.book(book_id).map(|book| book.title.clone()),
            _ => None,
        };
        let outcome = action.compensate(&mut self.catalog);

        if let (Action::AddBook { book_id }, Some(title)) = (&action, &added_title) {
            if matches!(outcome, UndoOutcome::Reverted(_)) {
                self.indexes.titles.remove(title, book_id);
            }
        }
        let tables = match outcome {
            UndoOutcome::Reverted(ActionKind::Queued) => Tables::WAITLISTS,
            UndoOutcome::Reverted(ActionKind::LoanGranted) => {
                Tables::BOOKS | Tables::USERS | Tables::LOANS
            }
            UndoOutcome::Reverted(_) => Tables::ALL,
            _ => Tables::NONE,
        };
        self.flush(tables);
        info!(%outcome, "undo");
        outcome
    }

    // === Persistence ===

    /// Writes every table, regardless of `write_through`.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the remaining tables are still attempted.
    pub fn save_all(&mut self) -> CoreResult<()> {
        let mut first = None;
        for (table, name) in TABLE_ORDER {
            if let Err(err) = save_table(self.persistence.as_mut(), &self.catalog, table) {
                warn!(table = name, error = %err, "failed to persist table");
                if first.is_none() {
                    first = Some(err);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Drains the flush failures recorded since the last call.
    pub fn take_persistence_failures(&mut self) -> Vec<PersistenceFailure> {
        std::mem::take(&mut self.failures)
    }

    fn flush(&mut self, tables: Tables) {
        if tables.is_empty() || !self.config.write_through {
            return;
        }
        for (table, name) in TABLE_ORDER {
            if !tables.contains(table) {
                continue;
            }
            if let Err(err) = save_table(self.persistence.as_mut(), &self.catalog, table) {
                warn!(table = name, error = %err, "failed to persist table");
                self.counters.record_flush_failure();
                self.failures.push(PersistenceFailure {
                    table: name,
                    message: err.to_string(),
                });
            }
        }
    }

    fn commit(&mut self, action: Action, tables: Tables) {
        self.counters.record_command();
        self.log.push(action);
        self.flush(tables);
    }

    fn reject(&self, err: CoreError) -> CoreError {
        self.counters.record_rejected();
        debug!(error = %err, "command rejected");
        err
    }

    // === Statistics ===

    /// Returns a snapshot of catalog sizes and operation counters.
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            books: self.catalog.book_count(),
            users: self.catalog.user_count(),
            active_loans: self.catalog.active_loan_total(),
            loan_records: self.catalog.loans().count(),
            queued_requests: self.catalog.queued_total(),
            prefix_terms: self.indexes.prefix.term_count(),
            prefix_nodes: self.indexes.prefix.node_count(),
            ordered_entries: self.indexes.ordered.len(),
            ordered_height: self.indexes.ordered.height(),
            graph_edges: self.graph.edge_count(),
            undo_depth: self.log.len(),
            commands: self.counters.commands(),
            rejected: self.counters.rejected(),
            searches: self.counters.searches(),
            recommendations: self.counters.recommendations(),
            undos: self.counters.undos(),
            flush_failures: self.counters.flush_failures(),
        }
    }
}

impl fmt::Debug for LibraryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryService")
            .field("config", &self.config)
            .field("books", &self.catalog.book_count())
            .field("users", &self.catalog.user_count())
            .field("undo_depth", &self.log.len())
            .finish_non_exhaustive()
    }
}

/// Search display line for a book.
fn suggestion(book: &Book) -> String {
    format!("{} (Autor: {})", book.title, book.authors.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SequentialIdGenerator;
    use crate::persistence::Snapshot;

    fn open_with(backend: InMemoryBackend) -> LibraryService {
        LibraryService::open(
            Config::default(),
            TablePersistence::new(backend),
            SequentialIdGenerator::new(),
        )
        .unwrap()
    }

    fn library() -> LibraryService {
        open_with(InMemoryBackend::new())
    }

    fn add_book(library: &mut LibraryService, id: &str, title: &str, copies: u32) -> BookId {
        library
            .add_book(NewBook::new(title, copies).id(id).author("Anon").genre("Fiction"))
            .unwrap()
    }

    fn add_user(library: &mut LibraryService, id: &str) -> UserId {
        library
            .add_user(NewUser::new(id, format!("{id}@example.org")).id(id))
            .unwrap()
    }

    /// Entity tables with loan histories blanked, which undo leaves alone.
    fn reachable(library: &LibraryService) -> Snapshot {
        let mut snapshot = library.catalog().to_snapshot();
        for user in &mut snapshot.users {
            user.loan_history.clear();
        }
        snapshot
    }

    #[test]
    fn generated_ids() {
        let mut library = library();
        let book = library.add_book(NewBook::new("Emma", 1)).unwrap();
        let user = library.add_user(NewUser::new("Ana", "a@x").id("  ")).unwrap();
        assert_eq!(book.as_str(), "9780000000001");
        assert_eq!(user.as_str(), "000000000002");
    }

    #[test]
    fn duplicate_book_rejected() {
        let mut library = library();
        add_book(&mut library, "B1", "Emma", 1);
        let err = library.add_book(NewBook::new("Other", 1).id("B1")).unwrap_err();
        assert!(matches!(err, CoreError::BookExists { .. }));
        assert_eq!(library.stats().rejected, 1);
        assert_eq!(library.log().len(), 1);
    }

    #[test]
    fn waitlist_hand_over() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");

        assert!(matches!(library.loan_book(&u1, &b1).unwrap(), LoanOutcome::Granted { .. }));
        assert_eq!(library.book(&b1).unwrap().available_copies, 0);
        assert_eq!(library.loan_book(&u2, &b1).unwrap(), LoanOutcome::Queued { position: 1 });

        let outcome = library.return_book(&u1, &b1).unwrap();
        assert_eq!(outcome.promoted.unwrap().user_id, u2);
        assert!(library.catalog().waitlist(&b1).is_none());
        assert!(library.user(&u2).unwrap().has_on_loan(&b1));
        assert_eq!(library.book(&b1).unwrap().available_copies, 0);
    }

    #[test]
    fn co_borrowing_recommendations() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "One", 5);
        let b2 = add_book(&mut library, "B2", "Two", 5);
        let b3 = add_book(&mut library, "B3", "Three", 5);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");
        for book in [&b1, &b2] {
            library.loan_book(&u1, book).unwrap();
        }
        for book in [&b1, &b2, &b3] {
            library.loan_book(&u2, book).unwrap();
        }

        assert_eq!(library.graph().weight(&b1, &b2), 2);
        assert_eq!(library.graph().weight(&b1, &b3), 1);
        assert_eq!(library.recommend(&u1, Some(5), None), vec![(b3, 2)]);
        assert!(library.recommend(&u1, Some(5), Some("poetry")).is_empty());
    }

    #[test]
    fn promotion_feeds_graph() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "One", 1);
        let b2 = add_book(&mut library, "B2", "Two", 1);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");
        library.loan_book(&u2, &b2).unwrap();
        library.loan_book(&u1, &b1).unwrap();
        library.loan_book(&u2, &b1).unwrap();
        library.return_book(&u1, &b1).unwrap();
        assert_eq!(library.graph().weight(&b1, &b2), 1);
    }

    #[test]
    fn delete_book_with_active_loan() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        library.loan_book(&u1, &b1).unwrap();

        library.remove_book(&b1).unwrap();
        let user = library.user(&u1).unwrap();
        assert!(!user.has_on_loan(&b1));
        assert_eq!(user.active_loan_count, 0);
        assert!(library.catalog().loans().all(|loan| loan.book_id != b1));
        assert!(library.list_by_title().is_empty());
    }

    #[test]
    fn search_lines_and_staleness() {
        let mut library = library();
        library
            .add_book(
                NewBook::new("Harry Potter", 1)
                    .id("1")
                    .author("J. K. Rowling")
                    .author("Mary GrandPré"),
            )
            .unwrap();
        library.add_book(NewBook::new("Hamlet", 1).id("2").author("Shakespeare")).unwrap();

        let mut lines = library.search("HA", None);
        lines.sort();
        assert_eq!(
            lines,
            vec![
                "Hamlet (Autor: Shakespeare)".to_string(),
                "Harry Potter (Autor: J. K. Rowling, Mary GrandPré)".to_string(),
            ]
        );
        assert_eq!(library.search("j. k", None).len(), 1);
        assert_eq!(library.search("ha", Some(1)).len(), 1);
        assert!(library.search("", None).is_empty());

        library.remove_book(&BookId::new("2")).unwrap();
        assert_eq!(library.search("ha", None).len(), 1);
        assert_eq!(library.stats().searches, 5);
    }

    #[test]
    fn title_and_author_match_same_book_once() {
        let mut library = library();
        library.add_book(NewBook::new("Stone", 1).id("1").author("Stone Author")).unwrap();
        assert_eq!(library.search("stone", None).len(), 1);
    }

    #[test]
    fn numeric_listing_filters_stale_and_keyless() {
        let mut library = library();
        add_book(&mut library, "978-3", "C", 1);
        add_book(&mut library, "978-1", "A", 1);
        add_book(&mut library, "no-digits", "Z", 1);
        add_book(&mut library, "978-2", "B", 1);
        library.remove_book(&BookId::new("978-2")).unwrap();

        let listed: Vec<i64> = library.list_by_numeric_key().into_iter().map(|(k, _)| k).collect();
        assert_eq!(listed, vec![9781, 9783]);
        assert_eq!(library.stats().ordered_entries, 3);
    }

    #[test]
    fn numeric_key_lookup_skips_removed_books() {
        let mut library = library();
        add_book(&mut library, "978-1", "A", 1);
        add_book(&mut library, "97-81", "Shadowed", 1);
        add_book(&mut library, "978-2", "B", 1);
        library.remove_book(&BookId::new("978-2")).unwrap();

        assert_eq!(library.book_by_numeric_key(9781).unwrap().title, "A");
        assert!(library.book_by_numeric_key(9782).is_none());
        assert!(library.book_by_numeric_key(1).is_none());
    }

    #[test]
    fn stats_report_trie_size() {
        let mut library = library();
        assert_eq!(library.stats().prefix_nodes, 1);
        add_book(&mut library, "B1", "ab", 1);
        let stats = library.stats();
        assert!(stats.prefix_terms >= 1);
        assert!(stats.prefix_nodes >= 3);
    }

    #[test]
    fn modify_moves_title_entry_and_indexes_new_terms() {
        let mut library = library();
        let id = add_book(&mut library, "B1", "Old Name", 1);
        library.modify_book(&id, BookUpdate::new().title("New Name")).unwrap();

        assert_eq!(library.list_by_title(), vec![("New Name".to_string(), id)]);
        assert_eq!(library.search("new", None), vec!["New Name (Autor: Anon)".to_string()]);
        // the old term is stale but still resolves to the live book
        assert_eq!(library.search("old", None), vec!["New Name (Autor: Anon)".to_string()]);
    }

    #[test]
    fn undo_reversible_commands() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");

        let before = reachable(&library);
        library.loan_book(&u1, &b1).unwrap();
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::LoanGranted));
        assert_eq!(reachable(&library), before);

        library.loan_book(&u1, &b1).unwrap();
        let before = reachable(&library);
        library.loan_book(&u2, &b1).unwrap();
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::Queued));
        assert_eq!(reachable(&library), before);

        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::LoanGranted));
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::AddUser));
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::AddUser));
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::AddBook));
        assert_eq!(library.undo_last(), UndoOutcome::Empty);
        assert_eq!(library.catalog().book_count(), 0);
        assert!(library.list_by_title().is_empty());
    }

    #[test]
    fn undo_unsupported_and_stale() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        library.loan_book(&u1, &b1).unwrap();
        library.return_book(&u1, &b1).unwrap();

        let before = library.catalog().clone();
        assert_eq!(library.undo_last(), UndoOutcome::Unsupported(ActionKind::ReturnLoan));
        assert_eq!(library.catalog(), &before);
        assert_eq!(library.undo_last(), UndoOutcome::Stale(ActionKind::LoanGranted));
        assert_eq!(library.catalog(), &before);
        assert_eq!(library.stats().undos, 2);
    }

    #[test]
    fn undo_that_changes_nothing_writes_nothing() {
        let backend = InMemoryBackend::new();
        let mut library = open_with(backend.clone());
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        library.loan_book(&u1, &b1).unwrap();
        library.return_book(&u1, &b1).unwrap();
        backend.set_read_only(true);

        assert_eq!(library.undo_last(), UndoOutcome::Unsupported(ActionKind::ReturnLoan));
        assert_eq!(library.undo_last(), UndoOutcome::Stale(ActionKind::LoanGranted));
        assert!(library.take_persistence_failures().is_empty());

        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::AddUser));
        assert_eq!(library.take_persistence_failures().len(), 4);
    }

    #[test]
    fn undo_add_user_holding_promoted_copy_cascades() {
        let mut library = library();
        let b1 = add_book(&mut library, "B1", "Emma", 1);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");
        library.loan_book(&u1, &b1).unwrap();
        library.loan_book(&u2, &b1).unwrap();
        library.return_book(&u1, &b1).unwrap();
        assert!(library.user(&u2).unwrap().has_on_loan(&b1));

        assert_eq!(library.undo_last(), UndoOutcome::Unsupported(ActionKind::ReturnLoan));
        assert_eq!(library.undo_last(), UndoOutcome::Stale(ActionKind::Queued));
        assert_eq!(library.undo_last(), UndoOutcome::Stale(ActionKind::LoanGranted));
        assert_eq!(library.undo_last(), UndoOutcome::Reverted(ActionKind::AddUser));

        assert!(library.user(&u2).is_none());
        assert_eq!(library.book(&b1).unwrap().available_copies, 1);
        assert!(library.catalog().verify().is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let backend = InMemoryBackend::new();
        let mut library = open_with(backend.clone());
        let b1 = add_book(&mut library, "978-1", "Emma", 1);
        let b2 = add_book(&mut library, "978-2", "Persuasion", 1);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");
        library.loan_book(&u1, &b1).unwrap();
        library.loan_book(&u1, &b2).unwrap();
        library.loan_book(&u2, &b1).unwrap();

        let reopened = open_with(backend);
        assert_eq!(reopened.catalog(), library.catalog());
        assert_eq!(reopened.graph().weight(&b1, &b2), 1);
        assert_eq!(reopened.search("pers", None).len(), 1);
        assert_eq!(reopened.list_by_numeric_key().len(), 2);
        assert!(reopened.log().is_empty());
    }

    #[test]
    fn flush_failures_are_recorded_not_fatal() {
        let backend = InMemoryBackend::new();
        let mut library = open_with(backend.clone());
        backend.set_read_only(true);

        let id = add_book(&mut library, "B1", "Emma", 1);
        assert!(library.book(&id).is_some());
        let failures = library.take_persistence_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].table, BOOKS_TABLE);
        assert!(library.take_persistence_failures().is_empty());
        assert!(library.save_all().is_err());

        backend.set_read_only(false);
        library.save_all().unwrap();
        assert_eq!(library.stats().flush_failures, 1);
    }

    #[test]
    fn write_through_disabled_skips_flushes() {
        let backend = InMemoryBackend::new();
        let mut library = LibraryService::open(
            Config::default().write_through(false),
            TablePersistence::new(backend.clone()),
            SequentialIdGenerator::new(),
        )
        .unwrap();
        add_book(&mut library, "B1", "Emma", 1);
        assert!(libris_storage::TableBackend::table_names(&backend).unwrap().is_empty());

        library.save_all().unwrap();
        assert_eq!(open_with(backend).catalog().book_count(), 1);
    }

    #[test]
    fn open_fails_on_corrupt_tables() {
        let backend = InMemoryBackend::with_tables([(BOOKS_TABLE, b"[{]".to_vec())]);
        let result = LibraryService::open(
            Config::default(),
            TablePersistence::new(backend),
            SequentialIdGenerator::new(),
        );
        assert!(matches!(result, Err(CoreError::Codec(_))));
    }

    #[test]
    fn loan_is_rejected_cleanly_when_loan_ids_run_out() {
        let mut library = LibraryService::open(
            Config::default().loan_ids("P", 0),
            TablePersistence::new(InMemoryBackend::new()),
            RandomIdGenerator::with_seed(1),
        )
        .unwrap();
        let book = add_book(&mut library, "B1", "Emma", 2);
        let u1 = add_user(&mut library, "U1");
        let u2 = add_user(&mut library, "U2");

        assert!(matches!(library.loan_book(&u1, &book).unwrap(), LoanOutcome::Granted { .. }));
        let before = library.catalog().clone();
        let rejected = library.stats().rejected;
        let undo_depth = library.log().len();

        let err = library.loan_book(&u2, &book).unwrap_err();
        assert!(matches!(err, CoreError::IdSpaceExhausted { kind: "loan", .. }));
        assert_eq!(library.catalog(), &before);
        assert_eq!(library.book(&book).unwrap().available_copies, 1);
        assert_eq!(library.stats().rejected, rejected + 1);
        assert_eq!(library.log().len(), undo_depth);
    }
}

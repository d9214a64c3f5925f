//! Invariant harness for command sequences.
//!
//! [`InvariantHarness`] replays [`CatalogCommand`]s against a test catalog
//! and checks after every step that the tables and the derived indexes
//! still agree.

use crate::fixtures::TestLibrary;
use crate::generators::{pool_book, pool_user, CatalogCommand};
use libris_core::{CoreResult, LibraryService, Snapshot, UndoOutcome};
use std::collections::BTreeSet;

/// Catalog state reachable through the tables, excluding loan histories.
///
/// Loan histories only feed recommendations and are never rewound by undo,
/// so they are left out when comparing states.
pub fn reachable_state(library: &LibraryService) -> Snapshot {
    let mut snapshot = library.catalog().to_snapshot();
    for user in &mut snapshot.users {
        user.loan_history.clear();
    }
    snapshot
}

/// Describes every disagreement between the tables and the derived state.
pub fn invariant_violations(library: &LibraryService) -> Vec<String> {
    let catalog = library.catalog();
    let mut problems = catalog.verify();

    let graph = library.graph();
    for book in catalog.books() {
        for (other, weight) in graph.neighbors(&book.id) {
            let back = graph.weight(other, &book.id);
            if back != weight {
                problems.push(format!(
                    "graph edge {}-{} has weights {weight} and {back}",
                    book.id, other
                ));
            }
        }
    }

    let listed: Vec<_> = library
        .list_by_numeric_key()
        .into_iter()
        .map(|(_, id)| id)
        .collect();
    let mut keyed: Vec<_> = catalog.books().filter(|book| book.numeric_key != 0).collect();
    keyed.sort_by_key(|book| book.numeric_key);
    let expected: Vec<_> = keyed.into_iter().map(|book| book.id.clone()).collect();
    if listed != expected {
        problems.push(format!("numeric listing {listed:?} != {expected:?}"));
    }

    let titles = library.list_by_title();
    let mut expected: Vec<_> = catalog
        .books()
        .map(|book| (book.title.clone(), book.id.clone()))
        .collect();
    expected.sort();
    if titles != expected {
        problems.push(format!("title listing {titles:?} != {expected:?}"));
    }

    for book in catalog.books().filter(|book| !book.title.trim().is_empty()) {
        let lines = library.search(&book.title, Some(catalog.book_count()));
        if !lines.iter().any(|line| line.starts_with(book.title.as_str())) {
            problems.push(format!("book {} not found by its title", book.id));
        }
    }

    problems
}

/// Replays commands and checks invariants after each one.
pub struct InvariantHarness {
    library: TestLibrary,
    applied: usize,
    rejected: usize,
}

impl InvariantHarness {
    /// Creates a harness over an empty in-memory catalog.
    pub fn new() -> Self {
        Self::with_library(TestLibrary::memory())
    }

    /// Creates a harness over an existing test catalog.
    pub fn with_library(library: TestLibrary) -> Self {
        Self {
            library,
            applied: 0,
            rejected: 0,
        }
    }

    /// Applies one command, then asserts every invariant.
    ///
    /// # Errors
    ///
    /// Returns the rejection reported by the service. Invariants are
    /// checked either way.
    pub fn run(&mut self, command: &CatalogCommand) -> CoreResult<()> {
        let result = command.apply(&mut self.library);
        match result {
            Ok(()) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
        self.verify_all();
        result
    }

    /// Applies a command sequence, ignoring rejections.
    pub fn run_all<'a>(&mut self, commands: impl IntoIterator<Item = &'a CatalogCommand>) {
        for command in commands {
            let _ = self.run(command);
        }
    }

    /// Applies a command and, when it logged a reversible action,
    /// asserts that undoing it restores the reachable state.
    ///
    /// Two cases only check invariants. A repeated waitlist request: undo
    /// withdraws the user's earliest entry, which reorders a queue they
    /// already stood in. A book whose title is already in someone's read
    /// history: the cascading delete drops read-history entries by title.
    pub fn assert_undo_restores(&mut self, command: &CatalogCommand) {
        let before = reachable_state(&self.library);
        let depth = self.library.log().len();
        let catalog = self.library.catalog();
        let exempt = match command {
            CatalogCommand::Loan { user, book } => catalog
                .waitlist(&pool_book(*book))
                .is_some_and(|queue| queue.contains(&pool_user(*user))),
            CatalogCommand::AddBook { title, .. } => catalog
                .users()
                .any(|user| user.read_history.contains(title)),
            _ => false,
        };

        if self.run(command).is_err() || self.library.log().len() == depth {
            return;
        }
        let reversible = self
            .library
            .log()
            .last()
            .is_some_and(|action| action.kind().is_reversible());
        if !reversible {
            return;
        }

        let outcome = self.library.undo_last();
        assert!(outcome.is_reverted(), "undo of {command:?} reported {outcome}");
        self.verify_all();
        if !exempt {
            assert_eq!(
                reachable_state(&self.library),
                before,
                "undo of {command:?} did not restore the catalog"
            );
        }
    }

    /// Asserts that no invariant is violated.
    pub fn verify_all(&self) {
        let problems = invariant_violations(&self.library);
        assert!(problems.is_empty(), "invariants violated: {problems:#?}");
    }

    /// Pops the whole undo log, checking invariants after every step.
    pub fn unwind(&mut self) -> Vec<UndoOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = self.library.undo_last();
            self.verify_all();
            if outcome == UndoOutcome::Empty {
                return outcomes;
            }
            outcomes.push(outcome);
        }
    }

    /// Reopens the catalog from its backend and checks it matches.
    pub fn assert_reopen_preserves_state(&mut self) {
        let before = self.library.catalog().clone();
        self.library.reopen();
        assert_eq!(self.library.catalog(), &before, "reopened catalog differs");
        self.verify_all();
    }

    /// Commands applied successfully.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Commands the service rejected.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Returns the service under test.
    pub fn library(&self) -> &LibraryService {
        &self.library
    }
}

impl Default for InvariantHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Book IDs currently in the catalog.
pub fn live_books(library: &LibraryService) -> BTreeSet<String> {
    library
        .catalog()
        .books()
        .map(|book| book.id.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::command_sequence_strategy;
    use libris_core::ActionKind;
    use proptest::prelude::*;

    fn add_book(slot: usize, copies: u32) -> CatalogCommand {
        CatalogCommand::AddBook {
            slot,
            title: format!("Title {slot}"),
            copies,
        }
    }

    #[test]
    fn waitlist_scenario_keeps_invariants() {
        let mut harness = InvariantHarness::new();
        harness.run(&add_book(0, 1)).unwrap();
        for slot in 0..3 {
            harness.run(&CatalogCommand::AddUser { slot }).unwrap();
        }
        for user in 0..3 {
            harness.run(&CatalogCommand::Loan { user, book: 0 }).unwrap();
        }
        harness.run(&CatalogCommand::Return { user: 0, book: 0 }).unwrap();
        harness.run(&CatalogCommand::RemoveUser { slot: 1 }).unwrap();

        // Deleting the promoted holder restocks the copy without a promotion.
        let library = harness.library();
        assert_eq!(library.book(&pool_book(0)).unwrap().available_copies, 1);
        let queue = library.catalog().waitlist(&pool_book(0)).unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![&pool_user(2)]);
        assert_eq!(harness.applied(), 9);
        assert_eq!(harness.rejected(), 0);
    }

    #[test]
    fn rejected_commands_are_counted() {
        let mut harness = InvariantHarness::new();
        assert!(harness.run(&CatalogCommand::Loan { user: 0, book: 0 }).is_err());
        assert!(harness.run(&CatalogCommand::RemoveBook { slot: 0 }).is_err());
        harness.run(&add_book(0, 1)).unwrap();
        assert!(harness.run(&add_book(0, 1)).is_err());
        assert_eq!(harness.rejected(), 3);
        assert_eq!(live_books(harness.library()).len(), 1);
    }

    #[test]
    fn unwind_reports_each_record() {
        let mut harness = InvariantHarness::new();
        harness.run(&add_book(0, 1)).unwrap();
        harness.run(&CatalogCommand::AddUser { slot: 0 }).unwrap();
        harness.run(&CatalogCommand::Loan { user: 0, book: 0 }).unwrap();
        harness.run(&CatalogCommand::Return { user: 0, book: 0 }).unwrap();

        let outcomes = harness.unwind();
        assert_eq!(
            outcomes,
            vec![
                UndoOutcome::Unsupported(ActionKind::ReturnLoan),
                UndoOutcome::Stale(ActionKind::LoanGranted),
                UndoOutcome::Reverted(ActionKind::AddUser),
                UndoOutcome::Reverted(ActionKind::AddBook),
            ]
        );
        assert!(live_books(harness.library()).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_sequences_keep_invariants(commands in command_sequence_strategy(40)) {
            let mut harness = InvariantHarness::new();
            harness.run_all(&commands);
            prop_assert_eq!(harness.applied() + harness.rejected(), commands.len());
            harness.assert_reopen_preserves_state();
        }

        #[test]
        fn reversible_commands_undo_cleanly(
            setup in command_sequence_strategy(25),
            command in crate::generators::command_strategy(),
        ) {
            let mut harness = InvariantHarness::new();
            harness.run_all(&setup);
            harness.assert_undo_restores(&command);
        }
    }
}

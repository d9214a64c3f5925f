//! Property-based test generators.
//!
//! Provides proptest strategies for catalog inputs and command sequences.
//! Commands address books and users through small fixed ID pools so that
//! random sequences collide often enough to exercise waitlists, cascades
//! and rejections.

use libris_core::{BookId, BookUpdate, CoreResult, LibraryService, NewBook, NewUser, UserId};
use proptest::prelude::*;

/// Book IDs addressable by [`CatalogCommand`].
pub const BOOK_POOL: [&str; 5] = ["978-101", "978-102", "978-103", "978-104", "978-105"];

/// User IDs addressable by [`CatalogCommand`].
pub const USER_POOL: [&str; 4] = ["U-1", "U-2", "U-3", "U-4"];

/// Book ID at a pool slot.
pub fn pool_book(slot: usize) -> BookId {
    BookId::new(BOOK_POOL[slot % BOOK_POOL.len()])
}

/// User ID at a pool slot.
pub fn pool_user(slot: usize) -> UserId {
    UserId::new(USER_POOL[slot % USER_POOL.len()])
}

/// Strategy for book titles: one to three capitalized words.
pub fn title_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,8}( [A-Z][a-z]{2,8}){0,2}"
}

/// Strategy for author names.
pub fn author_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,7} [A-Z][a-z]{2,9}"
}

/// Strategy for genre labels, including compound ones.
pub fn genre_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["Fantasy", "Dark Fantasy", "Poetry", "Essay", "Novel", ""])
        .prop_map(String::from)
}

/// Strategy for copy counts, zero included.
pub fn copies_strategy() -> impl Strategy<Value = u32> {
    0u32..4
}

/// Strategy for a book without a supplied ID.
pub fn new_book_strategy() -> impl Strategy<Value = NewBook> {
    (
        title_strategy(),
        prop::collection::vec(author_strategy(), 0..3),
        genre_strategy(),
        copies_strategy(),
    )
        .prop_map(|(title, authors, genre, copies)| {
            authors
                .into_iter()
                .fold(NewBook::new(title, copies).genre(genre), |book, author| {
                    book.author(author)
                })
        })
}

/// Strategy for a user without a supplied ID.
pub fn new_user_strategy() -> impl Strategy<Value = NewUser> {
    ("[A-Z][a-z]{2,8}", "[a-z]{3,8}@[a-z]{3,6}\\.org")
        .prop_map(|(name, email)| NewUser::new(name, email))
}

/// A catalog command addressed through the ID pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    /// Add a book at a pool slot.
    AddBook {
        /// Pool slot.
        slot: usize,
        /// Title.
        title: String,
        /// Copies owned.
        copies: u32,
    },
    /// Add a user at a pool slot.
    AddUser {
        /// Pool slot.
        slot: usize,
    },
    /// Request a loan.
    Loan {
        /// User slot.
        user: usize,
        /// Book slot.
        book: usize,
    },
    /// Return a loan.
    Return {
        /// User slot.
        user: usize,
        /// Book slot.
        book: usize,
    },
    /// Delete a book.
    RemoveBook {
        /// Pool slot.
        slot: usize,
    },
    /// Delete a user.
    RemoveUser {
        /// Pool slot.
        slot: usize,
    },
    /// Change a book's title and copy count.
    ModifyBook {
        /// Pool slot.
        slot: usize,
        /// New title.
        title: String,
        /// New copy count.
        copies: u32,
    },
    /// Undo the most recent action.
    Undo,
}

impl CatalogCommand {
    /// Applies the command to a service.
    ///
    /// # Errors
    ///
    /// Returns the rejection reported by the service.
    pub fn apply(&self, library: &mut LibraryService) -> CoreResult<()> {
        match self {
            Self::AddBook { slot, title, copies } => library
                .add_book(NewBook::new(title.clone(), *copies).id(pool_book(*slot).as_str()))
                .map(drop),
            Self::AddUser { slot } => {
                let id = pool_user(*slot);
                library
                    .add_user(NewUser::new(id.as_str(), format!("{id}@example.org")).id(id.as_str()))
                    .map(drop)
            }
            Self::Loan { user, book } => library
                .loan_book(&pool_user(*user), &pool_book(*book))
                .map(drop),
            Self::Return { user, book } => library
                .return_book(&pool_user(*user), &pool_book(*book))
                .map(drop),
            Self::RemoveBook { slot } => library.remove_book(&pool_book(*slot)),
            Self::RemoveUser { slot } => library.remove_user(&pool_user(*slot)),
            Self::ModifyBook { slot, title, copies } => library.modify_book(
                &pool_book(*slot),
                BookUpdate::new().title(title.clone()).total_copies(*copies),
            ),
            Self::Undo => {
                library.undo_last();
                Ok(())
            }
        }
    }
}

/// Strategy for a single command, weighted towards loans and returns.
pub fn command_strategy() -> impl Strategy<Value = CatalogCommand> {
    let book = 0..BOOK_POOL.len();
    let user = 0..USER_POOL.len();
    prop_oneof![
        3 => (book.clone(), title_strategy(), copies_strategy())
            .prop_map(|(slot, title, copies)| CatalogCommand::AddBook { slot, title, copies }),
        2 => user.clone().prop_map(|slot| CatalogCommand::AddUser { slot }),
        5 => (user.clone(), book.clone())
            .prop_map(|(user, book)| CatalogCommand::Loan { user, book }),
        3 => (user.clone(), book.clone())
            .prop_map(|(user, book)| CatalogCommand::Return { user, book }),
        1 => book.clone().prop_map(|slot| CatalogCommand::RemoveBook { slot }),
        1 => user.prop_map(|slot| CatalogCommand::RemoveUser { slot }),
        1 => (book, title_strategy(), copies_strategy())
            .prop_map(|(slot, title, copies)| CatalogCommand::ModifyBook { slot, title, copies }),
        1 => Just(CatalogCommand::Undo),
    ]
}

/// Strategy for a command sequence of up to `max_len` commands.
pub fn command_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<CatalogCommand>> {
    prop::collection::vec(command_strategy(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestLibrary;

    proptest! {
        #[test]
        fn generated_books_are_accepted(new in new_book_strategy()) {
            let mut test_library = TestLibrary::memory();
            let title = new.title.clone();
            let id = test_library.add_book(new).unwrap();
            prop_assert_eq!(&test_library.book(&id).unwrap().title, &title);
        }

        #[test]
        fn generated_users_are_accepted(new in new_user_strategy()) {
            let mut test_library = TestLibrary::memory();
            let id = test_library.add_user(new).unwrap();
            prop_assert!(test_library.user(&id).is_some());
        }

        #[test]
        fn titles_are_searchable(title in title_strategy()) {
            let mut test_library = TestLibrary::memory();
            test_library.add_book(NewBook::new(title.clone(), 1)).unwrap();
            let prefix: String = title.chars().take(2).collect();
            prop_assert_eq!(test_library.search(&prefix, None).len(), 1);
        }
    }

    #[test]
    fn pools_wrap_around() {
        assert_eq!(pool_book(BOOK_POOL.len()), pool_book(0));
        assert_eq!(pool_user(USER_POOL.len() + 1), pool_user(1));
    }

    #[test]
    fn commands_address_pools() {
        let mut test_library = TestLibrary::memory();
        let script = [
            CatalogCommand::AddBook { slot: 0, title: "Emma".into(), copies: 1 },
            CatalogCommand::AddUser { slot: 0 },
            CatalogCommand::Loan { user: 0, book: 0 },
        ];
        for command in &script {
            command.apply(&mut test_library).unwrap();
        }
        assert!(test_library.user(&pool_user(0)).unwrap().has_on_loan(&pool_book(0)));

        let missing = CatalogCommand::Return { user: 1, book: 0 }.apply(&mut test_library);
        assert!(missing.unwrap_err().is_not_found());
        CatalogCommand::Undo.apply(&mut test_library).unwrap();
        assert_eq!(test_library.book(&pool_book(0)).unwrap().available_copies, 1);
    }
}

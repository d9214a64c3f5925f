//! Benchmark utilities.

use libris_core::{
    BookId, Config, LibraryService, NewBook, NewUser, SequentialIdGenerator, TablePersistence,
    UserId,
};
use libris_storage::InMemoryBackend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SYLLABLES: [&str; 12] = [
    "an", "bel", "cor", "dra", "el", "fin", "gor", "ha", "is", "lun", "mor", "tha",
];

/// Seeded generator so runs are comparable.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x1b5_2024)
}

/// Generate a capitalized word of two to four syllables.
pub fn random_word(rng: &mut impl Rng) -> String {
    let count = rng.gen_range(2..=4);
    let word: String = (0..count)
        .map(|_| SYLLABLES[rng.gen_range(0..SYLLABLES.len())])
        .collect();
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generate a title of one to three words.
pub fn random_title(rng: &mut impl Rng) -> String {
    let words = rng.gen_range(1..=3);
    (0..words)
        .map(|_| random_word(rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate books with distinct numeric IDs in random order.
pub fn generate_books(count: usize, rng: &mut impl Rng) -> Vec<NewBook> {
    let mut keys: Vec<usize> = (1..=count).collect();
    for i in (1..keys.len()).rev() {
        keys.swap(i, rng.gen_range(0..=i));
    }
    keys.into_iter()
        .map(|key| {
            NewBook::new(random_title(rng), rng.gen_range(1..=3))
                .id(format!("978{key:010}"))
                .author(format!("{} {}", random_word(rng), random_word(rng)))
                .genre(if key % 2 == 0 { "Fantasy" } else { "Essay" })
        })
        .collect()
}

/// Open a catalog that never flushes, so benchmarks measure the engine only.
pub fn memory_library() -> LibraryService {
    LibraryService::open(
        Config::default().write_through(false),
        TablePersistence::new(InMemoryBackend::new()),
        SequentialIdGenerator::new(),
    )
    .expect("in-memory catalog opens")
}

/// A catalog with `books` books and `users` users, none of them borrowing.
pub fn populated_library(books: usize, users: usize) -> (LibraryService, Vec<BookId>, Vec<UserId>) {
    let mut rng = rng();
    let mut library = memory_library();
    let book_ids = generate_books(books, &mut rng)
        .into_iter()
        .map(|book| library.add_book(book).expect("generated book IDs are unique"))
        .collect();
    let user_ids = (0..users)
        .map(|n| {
            library
                .add_user(NewUser::new(format!("Reader {n}"), format!("r{n}@example.org")))
                .expect("generated user IDs are unique")
        })
        .collect();
    (library, book_ids, user_ids)
}

/// Have every user borrow and return `per_user` random books so the
/// co-occurrence graph is dense enough for recommendations.
pub fn simulate_history(
    library: &mut LibraryService,
    books: &[BookId],
    users: &[UserId],
    per_user: usize,
) {
    let mut rng = rng();
    for user in users {
        for _ in 0..per_user {
            let book = &books[rng.gen_range(0..books.len())];
            if library.loan_book(user, book).is_ok() {
                let _ = library.return_book(user, book);
            }
        }
    }
}

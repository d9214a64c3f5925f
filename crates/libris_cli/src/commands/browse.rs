//! Read-only catalog queries.

use libris_core::{LibraryService, UserId};

/// Runs `search`.
pub fn search(library: &LibraryService, prefix: &str, limit: Option<usize>) {
    let lines = library.search(prefix, limit);
    if lines.is_empty() {
        println!("No matches for \"{prefix}\"");
    }
    for line in lines {
        println!("{line}");
    }
}

/// Runs `recommend`.
pub fn recommend(library: &LibraryService, user: &str, limit: Option<usize>, genre: Option<&str>) {
    let recommendations = library.recommend(&UserId::new(user), limit, genre);
    if recommendations.is_empty() {
        println!("No recommendations for {user}");
        return;
    }
    for (book_id, score) in recommendations {
        let title = library.book(&book_id).map_or("", |book| book.title.as_str());
        println!("{score:>4}  {book_id}  {title}");
    }
}

/// Runs `list --by numeric`.
pub fn list_numeric(library: &LibraryService) {
    for (key, book_id) in library.list_by_numeric_key() {
        let title = library.book(&book_id).map_or("", |book| book.title.as_str());
        println!("{key:>15}  {book_id}  {title}");
    }
}

/// Runs `list --by title`.
pub fn list_titles(library: &LibraryService) {
    for (title, book_id) in library.list_by_title() {
        println!("{title}  [{book_id}]");
    }
}

/// Runs `genre`.
pub fn genre(library: &LibraryService, genre: &str) {
    let books = library.books_by_genre(genre);
    if books.is_empty() {
        println!("No books in genre \"{genre}\"");
    }
    for book in books {
        println!("{}  {} ({})", book.id, book.title, book.genre);
    }
}

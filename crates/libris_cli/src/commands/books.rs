//! Book commands.

use super::CommandResult;
use libris_core::{Book, BookId, BookUpdate, LibraryService, NewBook};
use std::fmt::Write;

/// Arguments of `add-book`.
#[derive(Debug)]
pub struct AddBook {
    /// Title.
    pub title: String,
    /// Authors in credited order.
    pub authors: Vec<String>,
    /// Genre label.
    pub genre: String,
    /// Publication date.
    pub published: String,
    /// Number of copies.
    pub copies: u32,
    /// Explicit ID.
    pub id: Option<String>,
}

/// Arguments of `modify-book`. Unset fields are left alone.
#[derive(Debug)]
pub struct Changes {
    /// New title.
    pub title: Option<String>,
    /// New authors; empty keeps the current ones.
    pub authors: Vec<String>,
    /// New genre.
    pub genre: Option<String>,
    /// New publication date.
    pub published: Option<String>,
    /// New number of copies.
    pub copies: Option<u32>,
}

impl Changes {
    fn into_update(self) -> BookUpdate {
        BookUpdate {
            title: self.title,
            authors: (!self.authors.is_empty()).then_some(self.authors),
            genre: self.genre,
            publication_date: self.published,
            total_copies: self.copies,
        }
    }
}

/// Runs `add-book`.
pub fn add(library: &mut LibraryService, request: AddBook) -> CommandResult {
    let mut new = NewBook::new(request.title, request.copies)
        .genre(request.genre)
        .published(request.published);
    new.authors = request.authors;
    new.id = request.id;

    let id = library.add_book(new)?;
    println!("Added book {id}");
    Ok(())
}

/// Runs `remove-book`.
pub fn remove(library: &mut LibraryService, id: &str) -> CommandResult {
    library.remove_book(&BookId::new(id))?;
    println!("Removed book {id}");
    Ok(())
}

/// Runs `modify-book`.
pub fn modify(library: &mut LibraryService, id: &str, changes: Changes) -> CommandResult {
    let update = changes.into_update();
    if update.is_empty() {
        return Err("nothing to modify: pass at least one field".into());
    }
    library.modify_book(&BookId::new(id), update)?;
    println!("Modified book {id}");
    Ok(())
}

/// Runs `show-book`.
pub fn show(library: &LibraryService, id: &str) -> CommandResult {
    let book = library
        .book(&BookId::new(id))
        .ok_or_else(|| format!("book not found: {id}"))?;
    print_book(library, book);
    Ok(())
}

/// Runs `show-book --key`.
pub fn show_by_key(library: &LibraryService, key: &str) -> CommandResult {
    let key: i64 = key
        .trim()
        .parse()
        .map_err(|_| format!("not a numeric key: {key}"))?;
    let book = library
        .book_by_numeric_key(key)
        .ok_or_else(|| format!("no book with numeric key {key}"))?;
    print_book(library, book);
    Ok(())
}

fn print_book(library: &LibraryService, book: &Book) {
    print!("{}", describe(book));
    if let Some(queue) = library.catalog().waitlist(&book.id) {
        let waiting: Vec<&str> = queue.iter().map(|user| user.as_str()).collect();
        println!("Waitlist:     {}", waiting.join(", "));
    }
}

/// Multi-line description of a book.
pub fn describe(book: &Book) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:           {}", book.id);
    let _ = writeln!(out, "Title:        {}", book.title);
    let _ = writeln!(out, "Authors:      {}", book.authors.join(", "));
    let _ = writeln!(out, "Genre:        {}", book.genre);
    let _ = writeln!(out, "Published:    {}", book.publication_date);
    let _ = writeln!(
        out,
        "Copies:       {} of {} available",
        book.available_copies, book.total_copies
    );
    out
}

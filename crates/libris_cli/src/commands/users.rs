//! User commands.

use super::CommandResult;
use libris_core::{LibraryService, NewUser, User, UserId};
use std::fmt::Write;

/// Runs `add-user`.
pub fn add(
    library: &mut LibraryService,
    name: String,
    email: String,
    id: Option<String>,
) -> CommandResult {
    let mut new = NewUser::new(name, email);
    new.id = id;
    let id = library.add_user(new)?;
    println!("Added user {id}");
    Ok(())
}

/// Runs `remove-user`.
pub fn remove(library: &mut LibraryService, id: &str) -> CommandResult {
    library.remove_user(&UserId::new(id))?;
    println!("Removed user {id}");
    Ok(())
}

/// Runs `show-user`.
pub fn show(library: &LibraryService, id: &str) -> CommandResult {
    let id = UserId::new(id);
    let user = library
        .user(&id)
        .ok_or_else(|| format!("user not found: {id}"))?;
    print!("{}", describe(library, user));
    Ok(())
}

/// Multi-line description of a user; titles are resolved when possible.
pub fn describe(library: &LibraryService, user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:           {}", user.id);
    let _ = writeln!(out, "Name:         {}", user.name);
    let _ = writeln!(out, "Email:        {}", user.email);
    let _ = writeln!(out, "Active loans: {}", user.active_loan_count);
    for book_id in &user.active_loans {
        let title = library.book(book_id).map_or("?", |book| book.title.as_str());
        let _ = writeln!(out, "  - {book_id} {title}");
    }
    let _ = writeln!(out, "Books read:   {}", user.read_history.len());
    for title in &user.read_history {
        let _ = writeln!(out, "  - {title}");
    }
    out
}

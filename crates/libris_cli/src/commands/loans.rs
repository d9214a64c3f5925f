//! Loan commands.

use super::CommandResult;
use libris_core::{BookId, LibraryService, LoanOutcome, UserId};

/// Runs `loan`.
pub fn loan(library: &mut LibraryService, user: &str, book: &str) -> CommandResult {
    match library.loan_book(&UserId::new(user), &BookId::new(book))? {
        LoanOutcome::Granted { loan_id } => println!("Loan {loan_id} granted"),
        LoanOutcome::Queued { position } => {
            println!("No copy available; {user} is number {position} on the waitlist");
        }
    }
    Ok(())
}

/// Runs `return`.
pub fn return_book(library: &mut LibraryService, user: &str, book: &str) -> CommandResult {
    let outcome = library.return_book(&UserId::new(user), &BookId::new(book))?;
    println!("Loan {} returned", outcome.loan_id);
    if let Some(promotion) = outcome.promoted {
        println!(
            "Copy passed to {} (loan {})",
            promotion.user_id, promotion.loan_id
        );
    }
    Ok(())
}

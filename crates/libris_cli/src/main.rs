//! Libris CLI
//!
//! Command-line front end for a Libris catalog stored in a directory of
//! JSON tables. Every invocation opens the catalog, runs one command and
//! writes the touched tables back.
//!
//! # Commands
//!
//! - `add-book`, `remove-book`, `modify-book`, `show-book` - Manage books
//! - `add-user`, `remove-user`, `show-user` - Manage users
//! - `loan`, `return` - Lend and return copies
//! - `search`, `recommend`, `list`, `genre` - Browse the catalog
//! - `inspect`, `verify` - Catalog statistics and consistency checks
//!
//! `--then-undo` reverts the command just run, since the undo log does not
//! outlive the process.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lending library catalog tools.
#[derive(Parser)]
#[command(name = "libris")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the catalog tables
    #[arg(global = true, short, long, default_value = "./libris-data")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Undo the command right after running it and save the result.
    /// The undo log lives only for one invocation, so this is the only way
    /// to undo from the command line
    #[arg(global = true, long)]
    then_undo: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Ordering for `list`.
#[derive(Clone, Copy, ValueEnum)]
enum ListOrder {
    /// Ascending numeric key derived from the book ID
    Numeric,
    /// Alphabetical by title
    Title,
}

/// Output format for `inspect`.
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book to the catalog
    AddBook {
        /// Book title
        #[arg(long)]
        title: String,

        /// Author (repeat for several)
        #[arg(long = "author")]
        authors: Vec<String>,

        /// Genre label
        #[arg(long, default_value = "")]
        genre: String,

        /// Publication date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        published: String,

        /// Number of copies
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Explicit book ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a book with its loans and waitlist
    RemoveBook {
        /// Book ID
        id: String,
    },

    /// Change the fields of a book
    ModifyBook {
        /// Book ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New author list (repeat for several)
        #[arg(long = "author")]
        authors: Vec<String>,

        /// New genre
        #[arg(long)]
        genre: Option<String>,

        /// New publication date
        #[arg(long)]
        published: Option<String>,

        /// New number of copies
        #[arg(long)]
        copies: Option<u32>,
    },

    /// Register a user
    AddUser {
        /// Display name
        #[arg(long)]
        name: String,

        /// Contact address
        #[arg(long)]
        email: String,

        /// Explicit user ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a user, returning their books
    RemoveUser {
        /// User ID
        id: String,
    },

    /// Lend a book to a user, or join its waitlist
    Loan {
        /// User ID
        user: String,
        /// Book ID
        book: String,
    },

    /// Return a borrowed book
    Return {
        /// User ID
        user: String,
        /// Book ID
        book: String,
    },

    /// Autocomplete titles and authors
    Search {
        /// Prefix to complete
        prefix: String,

        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Recommend books borrowed together with the user's loans
    Recommend {
        /// User ID
        user: String,

        /// Maximum number of recommendations
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only recommend books whose genre contains this text
        #[arg(short, long)]
        genre: Option<String>,
    },

    /// List books
    List {
        /// Ordering
        #[arg(long, value_enum, default_value = "numeric")]
        by: ListOrder,
    },

    /// List books of a genre
    Genre {
        /// Genre to match, ignoring case and punctuation
        genre: String,
    },

    /// Show a book
    ShowBook {
        /// Book ID, or its numeric key with --key
        id: String,

        /// Look the book up by numeric key
        #[arg(long)]
        key: bool,
    },

    /// Show a user
    ShowUser {
        /// User ID
        id: String,
    },

    /// Display catalog statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Check cross-table consistency
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Libris CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Libris Core v{}", libris_core::VERSION);
        return Ok(());
    }

    let mut library = commands::open_library(&cli.data_dir)?;
    match cli.command {
        Commands::AddBook {
            title,
            authors,
            genre,
            published,
            copies,
            id,
        } => {
            let request = commands::books::AddBook {
                title,
                authors,
                genre,
                published,
                copies,
                id,
            };
            commands::books::add(&mut library, request)?;
        }
        Commands::RemoveBook { id } => commands::books::remove(&mut library, &id)?,
        Commands::ModifyBook {
            id,
            title,
            authors,
            genre,
            published,
            copies,
        } => {
            let changes = commands::books::Changes {
                title,
                authors,
                genre,
                published,
                copies,
            };
            commands::books::modify(&mut library, &id, changes)?;
        }
        Commands::AddUser { name, email, id } => {
            commands::users::add(&mut library, name, email, id)?;
        }
        Commands::RemoveUser { id } => commands::users::remove(&mut library, &id)?,
        Commands::Loan { user, book } => commands::loans::loan(&mut library, &user, &book)?,
        Commands::Return { user, book } => commands::loans::return_book(&mut library, &user, &book)?,
        Commands::Search { prefix, limit } => commands::browse::search(&library, &prefix, limit),
        Commands::Recommend { user, limit, genre } => {
            commands::browse::recommend(&library, &user, limit, genre.as_deref());
        }
        Commands::List { by } => match by {
            ListOrder::Numeric => commands::browse::list_numeric(&library),
            ListOrder::Title => commands::browse::list_titles(&library),
        },
        Commands::Genre { genre } => commands::browse::genre(&library, &genre),
        Commands::ShowBook { id, key: false } => commands::books::show(&library, &id)?,
        Commands::ShowBook { id, key: true } => commands::books::show_by_key(&library, &id)?,
        Commands::ShowUser { id } => commands::users::show(&library, &id)?,
        Commands::Inspect { format } => {
            commands::inspect::run(&library, &cli.data_dir, matches!(format, Format::Json))?;
        }
        Commands::Verify => commands::inspect::verify(&library)?,
        Commands::Version => {}
    }

    if cli.then_undo {
        commands::undo_last(&mut library);
    }
    commands::report_persistence(&mut library)
}

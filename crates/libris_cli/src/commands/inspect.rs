//! Inspect and verify commands.

use super::CommandResult;
use libris_core::{CatalogStats, LibraryService};
use libris_storage::{FileBackend, StorageError, TableBackend};
use serde::Serialize;
use std::path::Path;

/// Catalog inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory.
    pub path: String,
    /// Stored tables with their sizes.
    pub tables: Vec<TableInfo>,
    /// Catalog and index statistics.
    pub stats: CatalogStats,
}

/// One stored table.
#[derive(Debug, Serialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Runs the inspect command.
pub fn run(library: &LibraryService, dir: &Path, json: bool) -> CommandResult {
    let backend = FileBackend::open(dir)?.with_extension(super::TABLE_EXTENSION);
    let tables = backend
        .table_names()?
        .into_iter()
        .map(|name| -> Result<TableInfo, StorageError> {
            let size = backend.table_size(&name)?;
            Ok(TableInfo { name, size })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = InspectResult {
        path: dir.display().to_string(),
        tables,
        stats: library.stats(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    let stats = &result.stats;
    println!("Libris Catalog Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Tables:");
    for table in &result.tables {
        println!("  {:<10} {} bytes", table.name, table.size);
    }
    println!();
    println!("Catalog:");
    println!("  Books:           {}", stats.books);
    println!("  Users:           {}", stats.users);
    println!("  Active loans:    {}", stats.active_loans);
    println!("  Loan records:    {}", stats.loan_records);
    println!("  Queued requests: {}", stats.queued_requests);
    println!();
    println!("Indexes:");
    println!(
        "  Prefix terms:    {} ({} trie nodes)",
        stats.prefix_terms, stats.prefix_nodes
    );
    println!(
        "  Ordered keys:    {} (height {})",
        stats.ordered_entries, stats.ordered_height
    );
    println!("  Graph edges:     {}", stats.graph_edges);
}

/// Runs the verify command.
pub fn verify(library: &LibraryService) -> CommandResult {
    let problems = library.catalog().verify();
    if problems.is_empty() {
        println!("✓ Catalog verification passed");
        return Ok(());
    }
    for problem in &problems {
        println!("  {problem}");
    }
    println!("✗ Catalog verification failed");
    Err(format!("{} inconsistencies found", problems.len()).into())
}

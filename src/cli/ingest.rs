use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{print_error, Session};
use crate::error::Result;
use crate::importer::{import_directory, ingest_path, FileImport, ImportStats};

fn print_stats(stats: &ImportStats) {
    println!(
        "{} read, {} skipped, {} added",
        stats.read,
        stats.skipped,
        stats.added.to_string().green()
    );
}

fn print_file(file: &FileImport) {
    println!("Account: {}", file.account_name);
    print_stats(&file.stats);
    if !file.rejected.is_empty() {
        println!("{}", format!("{} malformed row(s) rejected:", file.rejected.len()).yellow());
        for row in &file.rejected {
            println!("  line {}: {}", row.line, row.reason);
        }
    }
    if file.blacklisted > 0 {
        println!("{} row(s) dropped by blacklist", file.blacklisted);
    }
}

/// Ingests a single statement, or every `.csv` in the raw directory when the
/// user enters `raw`.
pub fn run(session: &mut Session) -> Result<()> {
    let input = session.prompt.input("Statement path (or 'raw' for the raw directory): ")?;
    let config_path = session.settings.import_config_path();

    if input.eq_ignore_ascii_case("raw") {
        let dir = session.settings.raw_dir();
        let batch = import_directory(&session.conn, &dir, &config_path)?;
        if batch.files.is_empty() {
            println!("No .csv files in {}.", dir.display());
            return Ok(());
        }
        let mut table = Table::new();
        table.set_header(vec!["File", "Account", "Read", "Skipped", "Added"]);
        for (path, result) in &batch.files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match result {
                Ok(file) => table.add_row(vec![
                    Cell::new(name),
                    Cell::new(&file.account_name),
                    Cell::new(file.stats.read),
                    Cell::new(file.stats.skipped),
                    Cell::new(file.stats.added),
                ]),
                Err(e) => table.add_row(vec![
                    Cell::new(name),
                    Cell::new(format!("failed: {e}")),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]),
            };
        }
        println!("{table}");
        print!("Total: ");
        print_stats(&batch.totals);
        return Ok(());
    }

    let path = PathBuf::from(crate::settings::expand_home(&input));
    match ingest_path(&session.conn, &path, &config_path) {
        Ok(file) => print_file(&file),
        Err(e) => print_error(&format!("importing {}", path.display()), &e),
    }
    Ok(())
}

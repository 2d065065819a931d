use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::accounts::{get_or_create_account, upsert_snapshot};
use crate::categorizer::RuleEngine;
use crate::error::{FortifiError, Result};
use crate::identity::{assign_daily_sequences, record_hash};
use crate::import_config::{load_import_config, ImportConfig, ImportFormat};
use crate::models::ParsedRecord;
use crate::parser::{parse_statement, RejectedRow};

/// `read` counts records that survived parsing and the blacklist; every one of
/// them ends up either `added` or `skipped`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub read: usize,
    pub skipped: usize,
    pub added: usize,
}

impl AddAssign for ImportStats {
    fn add_assign(&mut self, other: Self) {
        self.read += other.read;
        self.skipped += other.skipped;
        self.added += other.added;
    }
}

#[derive(Debug)]
pub struct FileImport {
    pub account_name: String,
    pub stats: ImportStats,
    pub rejected: Vec<RejectedRow>,
    pub blacklisted: usize,
}

#[derive(Debug, Default)]
pub struct BatchImport {
    pub files: Vec<(PathBuf, Result<FileImport>)>,
    pub totals: ImportStats,
}

enum RecordOutcome {
    Added,
    Duplicate,
}

pub fn transaction_exists(conn: &Connection, id: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM transactions WHERE id = ?1")?;
    Ok(stmt.exists([id])?)
}

fn import_record(
    conn: &Connection,
    account_id: i64,
    format: &ImportFormat,
    engine: &RuleEngine,
    record: &ParsedRecord,
) -> Result<RecordOutcome> {
    if format.track_balance {
        if let Some(balance) = record.balance {
            let snapshot_time = record.posted_at.format("%Y-%m-%d %H:%M:%S").to_string();
            upsert_snapshot(conn, account_id, &snapshot_time, balance)?;
        }
    }

    let category = engine.categorize(conn, &record.description, record.amount)?;

    let id = record_hash(record);
    if transaction_exists(conn, &id)? {
        debug!(id = &id[..8], description = %record.description, "duplicate transaction");
        return Ok(RecordOutcome::Duplicate);
    }
    conn.execute(
        "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            account_id,
            category.category_id,
            record.amount,
            record.date().format("%Y-%m-%d").to_string(),
            record.description,
        ],
    )?;
    Ok(RecordOutcome::Added)
}

/// Imports one statement file using the format its filename selects.
/// Per-record failures are logged and counted as skipped.
pub fn import_file(conn: &Connection, file_path: &Path, config: &ImportConfig) -> Result<FileImport> {
    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let format = config
        .find_format(&filename)
        .ok_or_else(|| FortifiError::UnknownFormat(filename.clone()))?;

    let account_id = get_or_create_account(conn, &format.account_name)?;
    let engine = RuleEngine::load(conn, format)?;
    let mut parsed = parse_statement(file_path, format)?;
    assign_daily_sequences(&mut parsed.records);

    let mut stats = ImportStats {
        read: parsed.records.len(),
        ..ImportStats::default()
    };
    let mut tx = conn.unchecked_transaction()?;
    for record in &parsed.records {
        // A failed record rolls back to its savepoint, leaving the rest of the file intact.
        let sp = tx.savepoint()?;
        match import_record(&sp, account_id, format, &engine, record) {
            Ok(outcome) => {
                sp.commit()?;
                match outcome {
                    RecordOutcome::Added => stats.added += 1,
                    RecordOutcome::Duplicate => stats.skipped += 1,
                }
            }
            Err(e) => {
                warn!(file = %filename, description = %record.description, error = %e, "failed to import record");
                stats.skipped += 1;
            }
        }
    }
    tx.commit()?;

    info!(
        file = %filename,
        account = %format.account_name,
        read = stats.read,
        added = stats.added,
        skipped = stats.skipped,
        "import finished"
    );
    Ok(FileImport {
        account_name: format.account_name.clone(),
        stats,
        rejected: parsed.rejected,
        blacklisted: parsed.blacklisted,
    })
}

/// Reads the import configuration fresh and imports one file.
pub fn ingest_path(conn: &Connection, file_path: &Path, config_path: &Path) -> Result<FileImport> {
    let config = load_import_config(config_path)?;
    import_file(conn, file_path, &config)
}

/// `.csv` files directly inside `dir`, sorted by name.
pub fn statement_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Imports every statement in `dir`. A file that fails does not stop the batch.
pub fn import_directory(conn: &Connection, dir: &Path, config_path: &Path) -> Result<BatchImport> {
    let mut batch = BatchImport::default();
    for path in statement_files(dir)? {
        let result = ingest_path(conn, &path, config_path);
        match &result {
            Ok(file) => batch.totals += file.stats,
            Err(e) => warn!(file = %path.display(), error = %e, "file import failed"),
        }
        batch.files.push((path, result));
    }
    Ok(batch)
}

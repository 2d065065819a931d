use chrono::NaiveDate;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{FortifiError, Result};
use crate::identity::{round2, transaction_hash};
use crate::importer::transaction_exists;
use crate::models::Transaction;

const TRANSACTION_COLUMNS: &str =
    "t.id, t.account_id, t.category_id, c.name, t.amount, t.transaction_date, t.description";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        amount: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
    })
}

fn is_short_id(candidate: &str) -> bool {
    Regex::new(r"^[0-9a-fA-F]{8}$")
        .map(|re| re.is_match(candidate))
        .unwrap_or(false)
}

fn stored_date(txn: &Transaction) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&txn.date, "%Y-%m-%d")
        .map_err(|_| FortifiError::Other(format!("stored date '{}' is not YYYY-MM-DD", txn.date)))
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Transaction> {
    conn.query_row(
        &format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t
             JOIN categories c ON c.id = t.category_id WHERE t.id = ?1"
        ),
        [id],
        row_to_transaction,
    )
    .optional()?
    .ok_or_else(|| FortifiError::NotFound(format!("transaction {id}")))
}

/// Transactions whose id starts with `prefix`. The prefix must be exactly
/// eight hex characters.
pub fn find_by_prefix(conn: &Connection, prefix: &str) -> Result<Vec<Transaction>> {
    let prefix = prefix.trim();
    if !is_short_id(prefix) {
        return Err(FortifiError::Validation(
            "transaction ID must be exactly 8 hex characters".to_string(),
        ));
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions t
         JOIN categories c ON c.id = t.category_id
         WHERE substr(t.id, 1, 8) = ?1 ORDER BY t.transaction_date, t.id"
    ))?;
    let rows = stmt
        .query_map([prefix.to_lowercase()], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Resolves a short id to exactly one transaction.
pub fn resolve_short_id(conn: &Connection, prefix: &str) -> Result<Transaction> {
    let mut matches = find_by_prefix(conn, prefix)?;
    match matches.len() {
        0 => Err(FortifiError::Validation(format!("no transaction matches ID '{}'", prefix.trim()))),
        1 => Ok(matches.remove(0)),
        n => Err(FortifiError::Validation(format!(
            "{n} transactions match ID '{}'",
            prefix.trim()
        ))),
    }
}

pub fn transactions_in_category(conn: &Connection, category_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions t
         JOIN categories c ON c.id = t.category_id
         WHERE t.category_id = ?1 ORDER BY t.transaction_date, t.id"
    ))?;
    let rows = stmt
        .query_map([category_id], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Transactions dated within `[start, end]` (inclusive, `YYYY-MM-DD`), oldest first.
pub fn transactions_between(conn: &Connection, start: &str, end: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions t
         JOIN categories c ON c.id = t.category_id
         WHERE t.transaction_date >= ?1 AND t.transaction_date <= ?2
         ORDER BY t.transaction_date, t.id"
    ))?;
    let rows = stmt
        .query_map([start, end], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub account_id: i64,
    pub category_id: i64,
}

/// Inserts a hand-entered transaction. Manual entries always hash with
/// sequence 0; a collision is rejected as a duplicate.
pub fn add_manual_transaction(conn: &Connection, new: &NewTransaction) -> Result<String> {
    let description = new.description.trim();
    let id = transaction_hash(new.date, new.amount, description, 0);
    if transaction_exists(conn, &id)? {
        return Err(FortifiError::Duplicate(id[..8].to_string()));
    }
    conn.execute(
        "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            new.account_id,
            new.category_id,
            new.amount,
            new.date.format("%Y-%m-%d").to_string(),
            description,
        ],
    )?;
    Ok(id)
}

/// Returns false when the transaction was already in that category.
pub fn change_category(conn: &Connection, id: &str, category_id: i64) -> Result<bool> {
    let txn = get_transaction(conn, id)?;
    if txn.category_id == category_id {
        return Ok(false);
    }
    conn.execute(
        "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
        params![category_id, id],
    )?;
    Ok(true)
}

pub fn delete_transaction(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(FortifiError::NotFound(format!("transaction {id}")));
    }
    Ok(())
}

pub fn delete_transactions_in_category(conn: &Connection, category_id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute("DELETE FROM transactions WHERE category_id = ?1", [category_id])?;
    tx.commit()?;
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub new_id: String,
    pub split_amount: f64,
    pub remaining: f64,
    pub sign_flipped: bool,
}

/// Carves `amount` off transaction `id` into a new transaction in
/// `category_id`. The new record takes the original's sign, its description
/// gets `" - note"` appended, and the original keeps the residual. Both writes
/// commit together.
pub fn split_transaction(
    conn: &Connection,
    id: &str,
    amount: f64,
    category_id: i64,
    note: Option<&str>,
) -> Result<SplitOutcome> {
    let original = get_transaction(conn, id)?;
    if original.amount == 0.0 {
        return Err(FortifiError::Validation("cannot split a zero-amount transaction".to_string()));
    }
    if amount == 0.0 || !amount.is_finite() {
        return Err(FortifiError::Validation("split amount must be non-zero".to_string()));
    }

    let sign_flipped = amount.signum() != original.amount.signum();
    let split_amount = if sign_flipped { -amount } else { amount };
    if split_amount.abs() >= original.amount.abs() {
        return Err(FortifiError::Validation(format!(
            "split amount must be smaller than the original amount ({:.2})",
            original.amount.abs()
        )));
    }

    let description = match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{} - {note}", original.description),
        None => original.description.clone(),
    };
    let date = stored_date(&original)?;
    let new_id = transaction_hash(date, split_amount, &description, 0);
    if transaction_exists(conn, &new_id)? {
        return Err(FortifiError::Duplicate(new_id[..8].to_string()));
    }

    let remaining = round2(original.amount - split_amount);
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![new_id, original.account_id, category_id, split_amount, original.date, description],
    )?;
    tx.execute(
        "UPDATE transactions SET amount = ?1 WHERE id = ?2",
        params![remaining, original.id],
    )?;
    tx.commit()?;

    Ok(SplitOutcome {
        new_id,
        split_amount,
        remaining,
        sign_flipped,
    })
}

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{FortifiError, Result};
use crate::models::{Account, AccountSnapshot};

pub fn get_or_create_account(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FortifiError::Validation("account name cannot be empty".to_string()));
    }
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO accounts (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT id, name, balance FROM accounts ORDER BY name")?;
    let accounts = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                balance: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

/// Records a balance observation. An identical (account, time, balance)
/// snapshot is not duplicated; its id is returned instead.
pub fn upsert_snapshot(
    conn: &Connection,
    account_id: i64,
    snapshot_time: &str,
    balance: f64,
) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM account_snapshots WHERE account_id = ?1 AND snapshot_time = ?2 AND balance = ?3",
            params![account_id, snapshot_time, balance],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO account_snapshots (account_id, snapshot_time, balance) VALUES (?1, ?2, ?3)",
        params![account_id, snapshot_time, balance],
    )?;
    let id = conn.last_insert_rowid();
    conn.execute(
        "UPDATE accounts SET
            balance = (SELECT balance FROM account_snapshots WHERE account_id = ?1
                       ORDER BY snapshot_time DESC, id DESC LIMIT 1),
            last_updated_at = datetime('now')
         WHERE id = ?1",
        [account_id],
    )?;
    Ok(id)
}

/// Snapshots for one account, oldest first.
pub fn snapshots(conn: &Connection, account_id: i64) -> Result<Vec<AccountSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, snapshot_time, balance FROM account_snapshots
         WHERE account_id = ?1 ORDER BY snapshot_time, id",
    )?;
    let rows = stmt
        .query_map([account_id], |row| {
            Ok(AccountSnapshot {
                id: row.get(0)?,
                account_id: row.get(1)?,
                snapshot_time: row.get(2)?,
                balance: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Accounts that have at least one snapshot, with the latest balance and its time.
pub fn latest_balances(conn: &Connection) -> Result<Vec<(String, f64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT a.name, s.balance, s.snapshot_time
         FROM accounts a
         JOIN account_snapshots s ON s.id = (
             SELECT id FROM account_snapshots WHERE account_id = a.id
             ORDER BY snapshot_time DESC, id DESC LIMIT 1
         )
         ORDER BY a.name",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_get_or_create_account_trims_and_reuses() {
        let (_dir, conn) = test_db();
        let a = get_or_create_account(&conn, " Checking ").unwrap();
        let b = get_or_create_account(&conn, "Checking").unwrap();
        assert_eq!(a, b);
        assert_eq!(list_accounts(&conn).unwrap().len(), 1);
        assert!(get_or_create_account(&conn, "   ").is_err());
    }

    #[test]
    fn test_upsert_snapshot_coalesces_exact_duplicates() {
        let (_dir, conn) = test_db();
        let acct = get_or_create_account(&conn, "Checking").unwrap();
        let a = upsert_snapshot(&conn, acct, "2025-06-01 00:00:00", 100.0).unwrap();
        let b = upsert_snapshot(&conn, acct, "2025-06-01 00:00:00", 100.0).unwrap();
        let c = upsert_snapshot(&conn, acct, "2025-06-01 00:00:00", 90.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(snapshots(&conn, acct).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_balance_tracks_newest_snapshot() {
        let (_dir, conn) = test_db();
        let acct = get_or_create_account(&conn, "Checking").unwrap();
        get_or_create_account(&conn, "Card").unwrap();
        upsert_snapshot(&conn, acct, "2025-06-02 00:00:00", 250.0).unwrap();
        upsert_snapshot(&conn, acct, "2025-06-01 00:00:00", 100.0).unwrap();
        let balances = latest_balances(&conn).unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].0, "Checking");
        assert_eq!(balances[0].1, 250.0);
        let stored: f64 = conn
            .query_row("SELECT balance FROM accounts WHERE id = ?1", [acct], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 250.0);
    }
}

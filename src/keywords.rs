use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::error::{FortifiError, Result};

/// Learned keyword rules, as consulted by the categorizer.
#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    pub exact: HashMap<String, i64>,
    /// Substring rules in the order they were first taught.
    pub includes: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Exact,
    Includes,
}

impl KeywordKind {
    fn table(self) -> &'static str {
        match self {
            KeywordKind::Exact => "exact_keywords",
            KeywordKind::Includes => "includes_keywords",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KeywordKind::Exact => "exact",
            KeywordKind::Includes => "includes",
        }
    }
}

/// A learned rule joined with its category name, for listing.
#[derive(Debug, Clone)]
pub struct LearnedRule {
    pub kind: KeywordKind,
    pub keyword: String,
    pub category_name: String,
}

pub fn load_keyword_rules(conn: &Connection) -> Result<KeywordRules> {
    let mut exact_stmt = conn.prepare("SELECT keyword, category_id FROM exact_keywords")?;
    let exact = exact_stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;

    let mut includes_stmt =
        conn.prepare("SELECT keyword, category_id FROM includes_keywords ORDER BY id")?;
    let includes: Vec<(String, i64)> = includes_stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(KeywordRules { exact, includes })
}

/// Inserts or retargets a rule. A retargeted rule keeps its position.
pub fn upsert_keyword(conn: &Connection, kind: KeywordKind, keyword: &str, category_id: i64) -> Result<()> {
    if keyword.is_empty() {
        return Err(FortifiError::Validation("keyword cannot be empty".to_string()));
    }
    conn.execute(
        &format!(
            "INSERT INTO {} (keyword, category_id) VALUES (?1, ?2)
             ON CONFLICT(keyword) DO UPDATE SET category_id = excluded.category_id",
            kind.table()
        ),
        params![keyword, category_id],
    )?;
    Ok(())
}

/// How many stored transactions a rule would re-categorise if taught now.
pub fn count_matches(conn: &Connection, kind: KeywordKind, keyword: &str) -> Result<usize> {
    let sql = match kind {
        KeywordKind::Exact => "SELECT count(*) FROM transactions WHERE description = ?1",
        KeywordKind::Includes => "SELECT count(*) FROM transactions WHERE instr(description, ?1) > 0",
    };
    let n: i64 = conn.query_row(sql, [keyword], |r| r.get(0))?;
    Ok(n as usize)
}

/// Saves the rule and applies it to every stored transaction it matches, in
/// one store transaction. Returns the number of transactions re-categorised.
pub fn teach_rule(conn: &Connection, kind: KeywordKind, keyword: &str, category_id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    upsert_keyword(&tx, kind, keyword, category_id)?;
    let updated = match kind {
        KeywordKind::Exact => tx.execute(
            "UPDATE transactions SET category_id = ?1 WHERE description = ?2",
            params![category_id, keyword],
        )?,
        KeywordKind::Includes => tx.execute(
            "UPDATE transactions SET category_id = ?1 WHERE instr(description, ?2) > 0",
            params![category_id, keyword],
        )?,
    };
    tx.commit()?;
    Ok(updated)
}

pub fn list_rules(conn: &Connection) -> Result<Vec<LearnedRule>> {
    let mut rules = Vec::new();
    for kind in [KeywordKind::Exact, KeywordKind::Includes] {
        let mut stmt = conn.prepare(&format!(
            "SELECT k.keyword, c.name FROM {} k
             JOIN categories c ON c.id = k.category_id ORDER BY k.id",
            kind.table()
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LearnedRule {
                    kind,
                    keyword: row.get(0)?,
                    category_name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rules.extend(rows);
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::get_or_create_category;
    use crate::db::test_db;

    fn add_txn(conn: &Connection, id: &str, description: &str, category_id: i64) {
        conn.execute("INSERT OR IGNORE INTO accounts (id, name) VALUES (1, 'Checking')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
             VALUES (?1, 1, ?2, -10.0, '2025-06-01', ?3)",
            params![id, category_id, description],
        )
        .unwrap();
    }

    fn category_of(conn: &Connection, id: &str) -> i64 {
        conn.query_row("SELECT category_id FROM transactions WHERE id = ?1", [id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_upsert_replaces_category_and_keeps_order() {
        let (_dir, conn) = test_db();
        let a = get_or_create_category(&conn, "A").unwrap();
        let b = get_or_create_category(&conn, "B").unwrap();
        upsert_keyword(&conn, KeywordKind::Includes, "ZETA", a).unwrap();
        upsert_keyword(&conn, KeywordKind::Includes, "ALPHA", a).unwrap();
        upsert_keyword(&conn, KeywordKind::Includes, "ZETA", b).unwrap();
        upsert_keyword(&conn, KeywordKind::Exact, "SHOP", a).unwrap();
        upsert_keyword(&conn, KeywordKind::Exact, "SHOP", b).unwrap();

        let rules = load_keyword_rules(&conn).unwrap();
        assert_eq!(rules.includes, vec![("ZETA".to_string(), b), ("ALPHA".to_string(), a)]);
        assert_eq!(rules.exact.get("SHOP"), Some(&b));
        assert_eq!(rules.exact.len(), 1);
    }

    #[test]
    fn test_teach_exact_is_retroactive() {
        let (_dir, conn) = test_db();
        let unc = get_or_create_category(&conn, "Uncategorized").unwrap();
        let shopping = get_or_create_category(&conn, "Shopping").unwrap();
        add_txn(&conn, "a", "AMAZON.COM", unc);
        add_txn(&conn, "b", "AMAZON.COM MKTPLACE", unc);
        assert_eq!(count_matches(&conn, KeywordKind::Exact, "AMAZON.COM").unwrap(), 1);
        let updated = teach_rule(&conn, KeywordKind::Exact, "AMAZON.COM", shopping).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(category_of(&conn, "a"), shopping);
        assert_eq!(category_of(&conn, "b"), unc);
    }

    #[test]
    fn test_teach_includes_is_case_sensitive_substring() {
        let (_dir, conn) = test_db();
        let unc = get_or_create_category(&conn, "Uncategorized").unwrap();
        let online = get_or_create_category(&conn, "Online").unwrap();
        add_txn(&conn, "a", "AMAZONMKT", unc);
        add_txn(&conn, "b", "PAY AMAZON", unc);
        add_txn(&conn, "c", "amazon prime", unc);
        assert_eq!(count_matches(&conn, KeywordKind::Includes, "AMAZON").unwrap(), 2);
        let updated = teach_rule(&conn, KeywordKind::Includes, "AMAZON", online).unwrap();
        assert_eq!(updated, 2);
        assert_eq!(category_of(&conn, "c"), unc);
        let rules = list_rules(&conn).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].category_name, "Online");
        assert_eq!(rules[0].kind, KeywordKind::Includes);
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let (_dir, conn) = test_db();
        let a = get_or_create_category(&conn, "A").unwrap();
        assert!(teach_rule(&conn, KeywordKind::Exact, "", a).is_err());
    }
}

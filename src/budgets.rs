use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::error::{FortifiError, Result};
use crate::models::{BudgetDefinition, Category, MonthlyInstance};
use crate::period::YearMonth;

fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(FortifiError::Validation("budget amount must be greater than zero".to_string()))
    }
}

fn ensure_definition(conn: &Connection, definition_id: i64) -> Result<()> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM budget_definitions WHERE id = ?1")?;
    if stmt.exists([definition_id])? {
        Ok(())
    } else {
        Err(FortifiError::NotFound(format!("budget #{definition_id}")))
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn list_definitions(conn: &Connection) -> Result<Vec<BudgetDefinition>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description FROM budget_definitions ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BudgetDefinition {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Categories bundled into a definition, by name. `transaction_count` is not
/// populated here.
pub fn definition_categories(conn: &Connection, definition_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name FROM budget_definition_categories bdc
         JOIN categories c ON c.id = bdc.category_id
         WHERE bdc.budget_definition_id = ?1 ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map([definition_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                transaction_count: 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Monthly instances of a definition, newest month first.
pub fn instances(conn: &Connection, definition_id: i64) -> Result<Vec<MonthlyInstance>> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_definition_id, budget_month, budget_amount
         FROM monthly_budget_instances WHERE budget_definition_id = ?1
         ORDER BY budget_month DESC",
    )?;
    let rows = stmt
        .query_map([definition_id], |row| {
            Ok(MonthlyInstance {
                id: row.get(0)?,
                definition_id: row.get(1)?,
                month: row.get(2)?,
                amount: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn instance_amount(conn: &Connection, definition_id: i64, month: YearMonth) -> Result<Option<f64>> {
    let amount = conn
        .query_row(
            "SELECT budget_amount FROM monthly_budget_instances
             WHERE budget_definition_id = ?1 AND budget_month = ?2",
            params![definition_id, month.to_string()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(amount)
}

/// Signed sum of the definition's categories' transactions in `month`.
/// Outflows are negative, so a normal budget's spending is <= 0.
pub fn budget_spending(conn: &Connection, definition_id: i64, month: YearMonth) -> Result<f64> {
    let spent = conn.query_row(
        "SELECT COALESCE(SUM(t.amount), 0.0) FROM transactions t
         WHERE t.category_id IN (
             SELECT category_id FROM budget_definition_categories WHERE budget_definition_id = ?1
         )
         AND strftime('%Y-%m', t.transaction_date) = ?2",
        params![definition_id, month.to_string()],
        |r| r.get(0),
    )?;
    Ok(spent)
}

// ---------------------------------------------------------------------------
// Definition lifecycle
// ---------------------------------------------------------------------------

/// Creates a definition, its category links and its first monthly instance in
/// one store transaction. Nothing is written unless every step succeeds.
pub fn create_budget(
    conn: &Connection,
    name: &str,
    description: &str,
    category_ids: &[i64],
    month: YearMonth,
    amount: f64,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FortifiError::Validation("budget name cannot be empty".to_string()));
    }
    if category_ids.is_empty() {
        return Err(FortifiError::Validation("a budget needs at least one category".to_string()));
    }
    validate_amount(amount)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO budget_definitions (name, description) VALUES (?1, ?2)",
        params![name, description.trim()],
    )?;
    let definition_id = tx.last_insert_rowid();
    for category_id in category_ids {
        tx.execute(
            "INSERT OR IGNORE INTO budget_definition_categories (budget_definition_id, category_id) VALUES (?1, ?2)",
            params![definition_id, category_id],
        )?;
    }
    tx.execute(
        "INSERT INTO monthly_budget_instances (budget_definition_id, budget_month, budget_amount) VALUES (?1, ?2, ?3)",
        params![definition_id, month.to_string(), amount],
    )?;
    tx.commit()?;
    Ok(definition_id)
}

/// Sets the amount for `month`, creating the instance if it does not exist.
/// Returns the previous amount, if any.
pub fn set_instance_amount(
    conn: &Connection,
    definition_id: i64,
    month: YearMonth,
    amount: f64,
) -> Result<Option<f64>> {
    validate_amount(amount)?;
    ensure_definition(conn, definition_id)?;
    let previous = instance_amount(conn, definition_id, month)?;
    conn.execute(
        "INSERT INTO monthly_budget_instances (budget_definition_id, budget_month, budget_amount)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(budget_definition_id, budget_month) DO UPDATE SET budget_amount = excluded.budget_amount",
        params![definition_id, month.to_string(), amount],
    )?;
    Ok(previous)
}

pub fn add_budget_category(conn: &Connection, definition_id: i64, category_id: i64) -> Result<()> {
    ensure_definition(conn, definition_id)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO budget_definition_categories (budget_definition_id, category_id) VALUES (?1, ?2)",
        params![definition_id, category_id],
    )?;
    if inserted == 0 {
        return Err(FortifiError::Validation("category is already part of this budget".to_string()));
    }
    Ok(())
}

/// Removes a category link. The last remaining category cannot be removed.
pub fn remove_budget_category(conn: &Connection, definition_id: i64, category_id: i64) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let linked: i64 = tx.query_row(
        "SELECT count(*) FROM budget_definition_categories WHERE budget_definition_id = ?1",
        [definition_id],
        |r| r.get(0),
    )?;
    if linked <= 1 {
        return Err(FortifiError::Validation(
            "cannot remove the last category from a budget".to_string(),
        ));
    }
    let removed = tx.execute(
        "DELETE FROM budget_definition_categories WHERE budget_definition_id = ?1 AND category_id = ?2",
        params![definition_id, category_id],
    )?;
    if removed == 0 {
        return Err(FortifiError::NotFound("category is not part of this budget".to_string()));
    }
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDeleteMode {
    /// Definition, category links and every monthly instance.
    Everything,
    /// Monthly instances only; the definition stays for future months.
    InstancesOnly,
    /// The definition, allowed only when it has no instances.
    DefinitionOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    pub instances_deleted: usize,
    pub definition_deleted: bool,
}

pub fn delete_budget(conn: &Connection, definition_id: i64, mode: BudgetDeleteMode) -> Result<DeleteSummary> {
    let tx = conn.unchecked_transaction()?;
    ensure_definition(&tx, definition_id)?;
    let summary = match mode {
        BudgetDeleteMode::Everything => {
            let instances_deleted = tx.execute(
                "DELETE FROM monthly_budget_instances WHERE budget_definition_id = ?1",
                [definition_id],
            )?;
            tx.execute("DELETE FROM budget_definitions WHERE id = ?1", [definition_id])?;
            DeleteSummary {
                instances_deleted,
                definition_deleted: true,
            }
        }
        BudgetDeleteMode::InstancesOnly => DeleteSummary {
            instances_deleted: tx.execute(
                "DELETE FROM monthly_budget_instances WHERE budget_definition_id = ?1",
                [definition_id],
            )?,
            definition_deleted: false,
        },
        BudgetDeleteMode::DefinitionOnly => {
            let remaining: i64 = tx.query_row(
                "SELECT count(*) FROM monthly_budget_instances WHERE budget_definition_id = ?1",
                [definition_id],
                |r| r.get(0),
            )?;
            if remaining > 0 {
                return Err(FortifiError::Validation(format!(
                    "budget still has {remaining} monthly instance(s); delete them first"
                )));
            }
            tx.execute("DELETE FROM budget_definitions WHERE id = ?1", [definition_id])?;
            DeleteSummary {
                instances_deleted: 0,
                definition_deleted: true,
            }
        }
    };
    tx.commit()?;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Roll-forward
// ---------------------------------------------------------------------------

/// For every definition with at least one instance, fills each month after
/// its latest instance up to and including `current` with that instance's
/// amount. A definition whose latest month cannot be read is logged and left
/// alone. Returns the number of instances created.
pub fn roll_forward(conn: &Connection, current: YearMonth) -> Result<usize> {
    let latest: Vec<(i64, String, f64)> = conn
        .prepare(
            "SELECT i.budget_definition_id, i.budget_month, i.budget_amount
             FROM monthly_budget_instances i
             WHERE i.budget_month = (
                 SELECT MAX(budget_month) FROM monthly_budget_instances
                 WHERE budget_definition_id = i.budget_definition_id
             )",
        )?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let tx = conn.unchecked_transaction()?;
    let mut created = 0usize;
    for (definition_id, month, amount) in latest {
        let last: YearMonth = match month.parse() {
            Ok(last) => last,
            Err(e) => {
                warn!(definition_id, month = %month, error = %e, "skipping budget with unreadable month");
                continue;
            }
        };
        for missing in last.months_until(current) {
            tx.execute(
                "INSERT INTO monthly_budget_instances (budget_definition_id, budget_month, budget_amount) VALUES (?1, ?2, ?3)",
                params![definition_id, missing.to_string(), amount],
            )?;
            created += 1;
        }
    }
    tx.commit()?;
    if created > 0 {
        info!(created, through = %current, "rolled budgets forward");
    }
    Ok(created)
}

// ---------------------------------------------------------------------------
// Status and history
// ---------------------------------------------------------------------------

/// Percent of `amount` consumed by `spent` (sign ignored).
pub fn percent_used(spent: f64, amount: f64) -> f64 {
    if amount > 0.0 {
        spent.abs() / amount * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct BudgetStatus {
    pub definition: BudgetDefinition,
    pub categories: Vec<String>,
    /// `None` when the definition has no instance for the month.
    pub amount: Option<f64>,
    pub spent: f64,
}

impl BudgetStatus {
    pub fn percent_used(&self) -> Option<f64> {
        self.amount.map(|a| percent_used(self.spent, a))
    }

    pub fn remaining(&self) -> Option<f64> {
        self.amount.map(|a| a - self.spent.abs())
    }

    pub fn within_budget(&self) -> Option<bool> {
        self.amount.map(|a| self.spent.abs() <= a)
    }
}

pub fn budget_status(conn: &Connection, month: YearMonth) -> Result<Vec<BudgetStatus>> {
    let mut lines = Vec::new();
    for definition in list_definitions(conn)? {
        let categories = definition_categories(conn, definition.id)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        let amount = instance_amount(conn, definition.id, month)?;
        let spent = budget_spending(conn, definition.id, month)?;
        lines.push(BudgetStatus {
            definition,
            categories,
            amount,
            spent,
        });
    }
    Ok(lines)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub month: String,
    pub amount: f64,
    pub spent: f64,
    pub percent: f64,
    pub within_budget: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub months: usize,
    pub within_budget: usize,
    pub over_budget: usize,
    pub average_spent: f64,
    pub average_percent: f64,
}

/// One entry per monthly instance, oldest first, with spending computed
/// against the definition's current category set.
pub fn budget_history(conn: &Connection, definition_id: i64) -> Result<(Vec<HistoryEntry>, HistorySummary)> {
    ensure_definition(conn, definition_id)?;
    let mut entries = Vec::new();
    for instance in instances(conn, definition_id)?.into_iter().rev() {
        let month: YearMonth = instance.month.parse()?;
        let spent = budget_spending(conn, definition_id, month)?;
        entries.push(HistoryEntry {
            month: instance.month,
            amount: instance.amount,
            spent,
            percent: percent_used(spent, instance.amount),
            within_budget: spent.abs() <= instance.amount,
        });
    }

    let mut summary = HistorySummary {
        months: entries.len(),
        ..HistorySummary::default()
    };
    if !entries.is_empty() {
        summary.within_budget = entries.iter().filter(|e| e.within_budget).count();
        summary.over_budget = entries.len() - summary.within_budget;
        let n = entries.len() as f64;
        summary.average_spent = entries.iter().map(|e| e.spent.abs()).sum::<f64>() / n;
        summary.average_percent = entries.iter().map(|e| e.percent).sum::<f64>() / n;
    }
    Ok((entries, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::get_or_create_category;
    use crate::db::test_db;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn add_txn(conn: &Connection, id: &str, category_id: i64, amount: f64, date: &str) {
        conn.execute("INSERT OR IGNORE INTO accounts (id, name) VALUES (1, 'Checking')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
             VALUES (?1, 1, ?2, ?3, ?4, 'X')",
            params![id, category_id, amount, date],
        )
        .unwrap();
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    fn months_of(conn: &Connection, definition_id: i64) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = instances(conn, definition_id)
            .unwrap()
            .into_iter()
            .map(|i| (i.month, i.amount))
            .collect();
        rows.reverse();
        rows
    }

    #[test]
    fn test_create_budget_writes_definition_links_and_instance() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let dining = get_or_create_category(&conn, "Dining").unwrap();
        let id = create_budget(&conn, " Eating ", "meals", &[food, dining], ym("2025-06"), 400.0).unwrap();
        let defs = list_definitions(&conn).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Eating");
        assert_eq!(definition_categories(&conn, id).unwrap().len(), 2);
        assert_eq!(instance_amount(&conn, id, ym("2025-06")).unwrap(), Some(400.0));
    }

    #[test]
    fn test_create_budget_validation() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        assert!(create_budget(&conn, "", "", &[food], ym("2025-06"), 10.0).is_err());
        assert!(create_budget(&conn, "Food", "", &[], ym("2025-06"), 10.0).is_err());
        assert!(create_budget(&conn, "Food", "", &[food], ym("2025-06"), 0.0).is_err());
        assert!(create_budget(&conn, "Food", "", &[food], ym("2025-06"), -5.0).is_err());
        assert_eq!(count(&conn, "SELECT count(*) FROM budget_definitions"), 0);
    }

    #[test]
    fn test_create_budget_rolls_back_on_failure() {
        let (_dir, conn) = test_db();
        let err = create_budget(&conn, "Ghost", "", &[9999], ym("2025-06"), 100.0);
        assert!(err.is_err());
        assert_eq!(count(&conn, "SELECT count(*) FROM budget_definitions"), 0);
        assert_eq!(count(&conn, "SELECT count(*) FROM monthly_budget_instances"), 0);
        assert_eq!(count(&conn, "SELECT count(*) FROM budget_definition_categories"), 0);
    }

    #[test]
    fn test_set_instance_amount_creates_or_overwrites() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let id = create_budget(&conn, "Food", "", &[food], ym("2025-06"), 400.0).unwrap();
        assert_eq!(set_instance_amount(&conn, id, ym("2025-06"), 450.0).unwrap(), Some(400.0));
        assert_eq!(set_instance_amount(&conn, id, ym("2025-07"), 300.0).unwrap(), None);
        assert_eq!(months_of(&conn, id), vec![("2025-06".to_string(), 450.0), ("2025-07".to_string(), 300.0)]);
        assert!(set_instance_amount(&conn, id, ym("2025-07"), 0.0).is_err());
        assert!(matches!(set_instance_amount(&conn, 999, ym("2025-07"), 1.0), Err(FortifiError::NotFound(_))));
    }

    #[test]
    fn test_change_categories() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let dining = get_or_create_category(&conn, "Dining").unwrap();
        let id = create_budget(&conn, "Food", "", &[food], ym("2025-06"), 400.0).unwrap();

        assert!(matches!(remove_budget_category(&conn, id, food), Err(FortifiError::Validation(_))));
        add_budget_category(&conn, id, dining).unwrap();
        assert!(matches!(add_budget_category(&conn, id, dining), Err(FortifiError::Validation(_))));
        remove_budget_category(&conn, id, food).unwrap();
        let names: Vec<String> = definition_categories(&conn, id).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Dining"]);
    }

    #[test]
    fn test_delete_modes() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let a = create_budget(&conn, "A", "", &[food], ym("2025-05"), 100.0).unwrap();
        set_instance_amount(&conn, a, ym("2025-06"), 100.0).unwrap();

        let err = delete_budget(&conn, a, BudgetDeleteMode::DefinitionOnly).unwrap_err();
        assert!(matches!(err, FortifiError::Validation(_)));

        let summary = delete_budget(&conn, a, BudgetDeleteMode::InstancesOnly).unwrap();
        assert_eq!(summary, DeleteSummary { instances_deleted: 2, definition_deleted: false });
        assert_eq!(list_definitions(&conn).unwrap().len(), 1);

        let summary = delete_budget(&conn, a, BudgetDeleteMode::DefinitionOnly).unwrap();
        assert!(summary.definition_deleted);
        assert_eq!(count(&conn, "SELECT count(*) FROM budget_definition_categories"), 0);

        let b = create_budget(&conn, "B", "", &[food], ym("2025-05"), 100.0).unwrap();
        let summary = delete_budget(&conn, b, BudgetDeleteMode::Everything).unwrap();
        assert_eq!(summary, DeleteSummary { instances_deleted: 1, definition_deleted: true });
        assert_eq!(count(&conn, "SELECT count(*) FROM budget_definitions"), 0);
        assert!(matches!(delete_budget(&conn, b, BudgetDeleteMode::Everything), Err(FortifiError::NotFound(_))));
    }

    #[test]
    fn test_roll_forward_fills_months_after_latest() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let id = create_budget(&conn, "Food", "", &[food], ym("2025-01"), 500.0).unwrap();
        set_instance_amount(&conn, id, ym("2025-03"), 600.0).unwrap();
        let created = roll_forward(&conn, ym("2025-06")).unwrap();
        assert_eq!(created, 3);
        assert_eq!(
            months_of(&conn, id),
            vec![
                ("2025-01".to_string(), 500.0),
                ("2025-03".to_string(), 600.0),
                ("2025-04".to_string(), 600.0),
                ("2025-05".to_string(), 600.0),
                ("2025-06".to_string(), 600.0),
            ]
        );
        assert_eq!(roll_forward(&conn, ym("2025-06")).unwrap(), 0);
    }

    #[test]
    fn test_roll_forward_skips_empty_and_future_definitions() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let empty = create_budget(&conn, "Empty", "", &[food], ym("2025-01"), 1.0).unwrap();
        delete_budget(&conn, empty, BudgetDeleteMode::InstancesOnly).unwrap();
        let future = create_budget(&conn, "Future", "", &[food], ym("2025-09"), 50.0).unwrap();
        assert_eq!(roll_forward(&conn, ym("2025-06")).unwrap(), 0);
        assert!(instances(&conn, empty).unwrap().is_empty());
        assert_eq!(instances(&conn, future).unwrap().len(), 1);
    }

    #[test]
    fn test_roll_forward_across_year_boundary() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let id = create_budget(&conn, "Food", "", &[food], ym("2024-11"), 75.0).unwrap();
        assert_eq!(roll_forward(&conn, ym("2025-02")).unwrap(), 3);
        assert_eq!(instance_amount(&conn, id, ym("2025-01")).unwrap(), Some(75.0));
    }

    #[test]
    fn test_spending_and_status() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let dining = get_or_create_category(&conn, "Dining").unwrap();
        let salary = get_or_create_category(&conn, "Salary").unwrap();
        let shopping = get_or_create_category(&conn, "Shopping").unwrap();
        let id = create_budget(&conn, "Eating", "", &[food, dining], ym("2025-06"), 400.0).unwrap();
        add_txn(&conn, "a", food, -150.0, "2025-06-03");
        add_txn(&conn, "b", dining, -125.0, "2025-06-20");
        add_txn(&conn, "c", salary, 2000.0, "2025-06-15");
        add_txn(&conn, "d", shopping, -80.0, "2025-06-16");
        add_txn(&conn, "e", food, -999.0, "2025-05-31");

        assert_eq!(budget_spending(&conn, id, ym("2025-06")).unwrap(), -275.0);
        let status = budget_status(&conn, ym("2025-06")).unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].spent, -275.0);
        assert_eq!(status[0].percent_used(), Some(68.75));
        assert_eq!(status[0].remaining(), Some(125.0));
        assert_eq!(status[0].within_budget(), Some(true));
        assert_eq!(status[0].categories, vec!["Dining", "Food"]);

        let july = budget_status(&conn, ym("2025-07")).unwrap();
        assert_eq!(july[0].amount, None);
        assert_eq!(july[0].remaining(), None);
    }

    #[test]
    fn test_budget_history_summary() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let id = create_budget(&conn, "Food", "", &[food], ym("2025-05"), 100.0).unwrap();
        set_instance_amount(&conn, id, ym("2025-06"), 100.0).unwrap();
        add_txn(&conn, "a", food, -50.0, "2025-05-10");
        add_txn(&conn, "b", food, -150.0, "2025-06-10");

        let (entries, summary) = budget_history(&conn, id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].month, "2025-05");
        assert!(entries[0].within_budget);
        assert!(!entries[1].within_budget);
        assert_eq!(entries[1].percent, 150.0);
        assert_eq!(summary.months, 2);
        assert_eq!(summary.within_budget, 1);
        assert_eq!(summary.over_budget, 1);
        assert_eq!(summary.average_spent, 100.0);
        assert_eq!(summary.average_percent, 100.0);
    }

    #[test]
    fn test_roll_forward_skips_definition_with_bad_month() {
        let (_dir, conn) = test_db();
        let food = get_or_create_category(&conn, "Food").unwrap();
        let good = create_budget(&conn, "Good", "", &[food], ym("2025-04"), 100.0).unwrap();
        let bad = create_budget(&conn, "Legacy", "", &[food], ym("2025-04"), 50.0).unwrap();
        conn.execute(
            "UPDATE monthly_budget_instances SET budget_month = '2025-1' WHERE budget_definition_id = ?1",
            [bad],
        )
        .unwrap();

        assert_eq!(roll_forward(&conn, ym("2025-06")).unwrap(), 2);
        assert_eq!(instances(&conn, good).unwrap().len(), 3);
        assert_eq!(instances(&conn, bad).unwrap().len(), 1);
    }
}

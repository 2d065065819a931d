use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use crate::accounts::snapshots;
use crate::error::Result;
use crate::ledger::transactions_between;
use crate::models::Transaction;
use crate::period::YearMonth;

fn sorted_totals(totals: BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut rows: Vec<(String, f64)> = totals.into_iter().collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

// ---------------------------------------------------------------------------
// Month breakdown
// ---------------------------------------------------------------------------

pub struct MonthBreakdown {
    pub month: YearMonth,
    pub transactions: Vec<Transaction>,
    pub income: f64,
    pub spend: f64,
    /// Per-category net, most negative first.
    pub category_totals: Vec<(String, f64)>,
}

impl MonthBreakdown {
    pub fn net(&self) -> f64 {
        self.income + self.spend
    }
}

pub fn month_breakdown(conn: &Connection, month: YearMonth) -> Result<MonthBreakdown> {
    let start = format!("{month}-01");
    let end = format!("{month}-31");
    let transactions = transactions_between(conn, &start, &end)?;

    let mut income = 0.0;
    let mut spend = 0.0;
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for t in &transactions {
        if t.amount < 0.0 {
            spend += t.amount;
        } else {
            income += t.amount;
        }
        *totals.entry(t.category_name.clone()).or_insert(0.0) += t.amount;
    }

    Ok(MonthBreakdown {
        month,
        transactions,
        income,
        spend,
        category_totals: sorted_totals(totals),
    })
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

pub struct Stats {
    pub months: usize,
    pub total_income: f64,
    /// Sum of outflows, negative.
    pub total_spend: f64,
    /// Per-category total divided by the number of months with data.
    pub category_monthly_average: Vec<(String, f64)>,
}

impl Stats {
    pub fn average_income(&self) -> f64 {
        self.total_income / self.months.max(1) as f64
    }

    pub fn average_spend(&self) -> f64 {
        self.total_spend / self.months.max(1) as f64
    }
}

/// Statistics for one calendar year, or all time when `year` is `None`.
/// Returns `None` when there are no transactions in range.
pub fn stats(conn: &Connection, year: Option<i32>) -> Result<Option<Stats>> {
    let (start, end) = match year {
        Some(y) => (format!("{y:04}-01-01"), format!("{y:04}-12-31")),
        None => ("0000-01-01".to_string(), "9999-12-31".to_string()),
    };
    let mut stmt = conn.prepare(
        "SELECT t.amount, c.name, substr(t.transaction_date, 1, 7)
         FROM transactions t JOIN categories c ON c.id = t.category_id
         WHERE t.transaction_date >= ?1 AND t.transaction_date <= ?2",
    )?;
    let rows: Vec<(f64, String, String)> = stmt
        .query_map(params![start, end], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut months: Vec<&str> = rows.iter().map(|r| r.2.as_str()).collect();
    months.sort_unstable();
    months.dedup();
    let month_count = months.len();

    let mut total_income = 0.0;
    let mut total_spend = 0.0;
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (amount, category, _) in &rows {
        if *amount < 0.0 {
            total_spend += amount;
        } else {
            total_income += amount;
        }
        *totals.entry(category.clone()).or_insert(0.0) += amount;
    }
    for total in totals.values_mut() {
        *total /= month_count as f64;
    }

    Ok(Some(Stats {
        months: month_count,
        total_income,
        total_spend,
        category_monthly_average: sorted_totals(totals),
    }))
}

// ---------------------------------------------------------------------------
// Category timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub month: String,
    pub total: f64,
    /// Change from the previous month with data; `None` for the first month.
    pub vs_previous: Option<f64>,
    pub vs_average: f64,
}

pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub average: f64,
}

pub fn category_timeline(conn: &Connection, category_id: i64) -> Result<Timeline> {
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', transaction_date) AS month, SUM(amount)
         FROM transactions WHERE category_id = ?1
         GROUP BY month ORDER BY month",
    )?;
    let months: Vec<(String, f64)> = stmt
        .query_map([category_id], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let average = if months.is_empty() {
        0.0
    } else {
        months.iter().map(|(_, total)| total).sum::<f64>() / months.len() as f64
    };
    let mut entries = Vec::with_capacity(months.len());
    let mut previous: Option<f64> = None;
    for (month, total) in months {
        entries.push(TimelineEntry {
            month,
            total,
            vs_previous: previous.map(|p| total - p),
            vs_average: total - average,
        });
        previous = Some(total);
    }
    Ok(Timeline { entries, average })
}

// ---------------------------------------------------------------------------
// Account balance history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBalance {
    pub month: String,
    pub starting: f64,
    pub ending: f64,
    /// Ending balance minus the previous month's ending balance; `None` for
    /// the first month.
    pub change: Option<f64>,
}

pub struct BalanceHistory {
    pub months: Vec<MonthlyBalance>,
}

impl BalanceHistory {
    pub fn total_change(&self) -> Option<f64> {
        match (self.months.first(), self.months.last()) {
            (Some(first), Some(last)) if self.months.len() > 1 => Some(last.ending - first.starting),
            _ => None,
        }
    }

    pub fn average_monthly_change(&self) -> Option<f64> {
        self.total_change()
            .map(|total| total / (self.months.len() - 1) as f64)
    }
}

/// Groups an account's snapshots by month: first and last balance of each
/// month, plus the month-over-month change of the ending balance.
pub fn balance_history(conn: &Connection, account_id: i64) -> Result<BalanceHistory> {
    let mut grouped: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for snapshot in snapshots(conn, account_id)? {
        let month = snapshot.snapshot_time.chars().take(7).collect::<String>();
        grouped
            .entry(month)
            .and_modify(|(_, ending)| *ending = snapshot.balance)
            .or_insert((snapshot.balance, snapshot.balance));
    }

    let mut months = Vec::with_capacity(grouped.len());
    let mut previous_ending: Option<f64> = None;
    for (month, (starting, ending)) in grouped {
        months.push(MonthlyBalance {
            month,
            starting,
            ending,
            change: previous_ending.map(|p| ending - p),
        });
        previous_ending = Some(ending);
    }
    Ok(BalanceHistory { months })
}

/// Accounts that have recorded at least one balance snapshot.
pub fn accounts_with_balances(conn: &Connection) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name FROM accounts a
         WHERE EXISTS (SELECT 1 FROM account_snapshots s WHERE s.account_id = a.id)
         ORDER BY a.name",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{get_or_create_account, upsert_snapshot};
    use crate::categories::get_or_create_category;
    use crate::db::test_db;

    fn add_txn(conn: &Connection, id: &str, category: &str, amount: f64, date: &str) {
        let account = get_or_create_account(conn, "Checking").unwrap();
        let category = get_or_create_category(conn, category).unwrap();
        conn.execute(
            "INSERT INTO transactions (id, account_id, category_id, amount, transaction_date, description)
             VALUES (?1, ?2, ?3, ?4, ?5, 'X')",
            params![id, account, category, amount, date],
        )
        .unwrap();
    }

    fn seed(conn: &Connection) {
        add_txn(conn, "a", "Food", -100.0, "2025-05-02");
        add_txn(conn, "b", "Salary", 3000.0, "2025-05-15");
        add_txn(conn, "c", "Food", -50.0, "2025-06-01");
        add_txn(conn, "d", "Food", -25.0, "2025-06-30");
        add_txn(conn, "e", "Salary", 3000.0, "2025-06-15");
        add_txn(conn, "f", "Food", -40.0, "2024-12-31");
    }

    #[test]
    fn test_month_breakdown() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let report = month_breakdown(&conn, "2025-06".parse().unwrap()).unwrap();
        assert_eq!(report.transactions.len(), 3);
        assert_eq!(report.income, 3000.0);
        assert_eq!(report.spend, -75.0);
        assert_eq!(report.net(), 2925.0);
        assert_eq!(report.category_totals[0], ("Food".to_string(), -75.0));
        assert_eq!(report.transactions[0].id, "c");
    }

    #[test]
    fn test_stats_for_year_and_all_time() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let year = stats(&conn, Some(2025)).unwrap().unwrap();
        assert_eq!(year.months, 2);
        assert_eq!(year.total_income, 6000.0);
        assert_eq!(year.total_spend, -175.0);
        assert_eq!(year.average_spend(), -87.5);
        assert_eq!(year.category_monthly_average[0], ("Food".to_string(), -87.5));

        let all = stats(&conn, None).unwrap().unwrap();
        assert_eq!(all.months, 3);
        assert!(stats(&conn, Some(2019)).unwrap().is_none());
    }

    #[test]
    fn test_category_timeline_deltas() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let food = get_or_create_category(&conn, "Food").unwrap();
        let timeline = category_timeline(&conn, food).unwrap();
        let months: Vec<&str> = timeline.entries.iter().map(|e| e.month.as_str()).collect();
        assert_eq!(months, vec!["2024-12", "2025-05", "2025-06"]);
        assert_eq!(timeline.average, -215.0 / 3.0);
        assert_eq!(timeline.entries[0].vs_previous, None);
        assert_eq!(timeline.entries[1].vs_previous, Some(-60.0));
        assert_eq!(timeline.entries[2].vs_previous, Some(25.0));
    }

    #[test]
    fn test_balance_history_groups_by_month() {
        let (_dir, conn) = test_db();
        let acct = get_or_create_account(&conn, "Checking").unwrap();
        upsert_snapshot(&conn, acct, "2025-05-01 00:00:00", 1000.0).unwrap();
        upsert_snapshot(&conn, acct, "2025-05-20 00:00:00", 1200.0).unwrap();
        upsert_snapshot(&conn, acct, "2025-06-03 00:00:00", 1100.0).unwrap();
        upsert_snapshot(&conn, acct, "2025-06-28 00:00:00", 1500.0).unwrap();

        let history = balance_history(&conn, acct).unwrap();
        assert_eq!(
            history.months,
            vec![
                MonthlyBalance { month: "2025-05".to_string(), starting: 1000.0, ending: 1200.0, change: None },
                MonthlyBalance { month: "2025-06".to_string(), starting: 1100.0, ending: 1500.0, change: Some(300.0) },
            ]
        );
        assert_eq!(history.total_change(), Some(500.0));
        assert_eq!(history.average_monthly_change(), Some(500.0));
        assert_eq!(accounts_with_balances(&conn).unwrap(), vec![(acct, "Checking".to_string())]);
    }
}

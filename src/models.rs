use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    /// Balance from the latest snapshot; 0 until one is recorded.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub id: i64,
    pub account_id: i64,
    pub snapshot_time: String,
    pub balance: f64,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub transaction_count: i64,
}

/// A stored transaction joined with its category name.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub account_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub amount: f64,
    pub date: String,
    pub description: String,
}

impl Transaction {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Intermediate representation from the statement parser before DB insert.
/// `posted_at` is midnight when the statement carries no time of day.
/// `daily_sequence` is 0 until the sequence assigner runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub posted_at: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub balance: Option<f64>,
    pub daily_sequence: u32,
}

impl ParsedRecord {
    pub fn date(&self) -> NaiveDate {
        self.posted_at.date()
    }
}

#[derive(Debug, Clone)]
pub struct BudgetDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyInstance {
    pub id: i64,
    pub definition_id: i64,
    pub month: String,
    pub amount: f64,
}

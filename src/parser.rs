use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{FortifiError, Result};
use crate::import_config::{ColumnMapping, ImportFormat};
use crate::models::ParsedRecord;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Parses a statement amount. Accepts `$`, thousands separators and
/// parenthesised negatives; anything else that is not a number is `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a statement timestamp with a strftime pattern. A pattern without a
/// time of day yields midnight.
pub fn parse_timestamp(raw: &str, pattern: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, pattern).ok().or_else(|| {
        NaiveDate::parse_from_str(raw, pattern)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    balance: Option<usize>,
}

impl Columns {
    fn resolve(header: &StringRecord, mapping: &ColumnMapping) -> Result<Self> {
        let names: Vec<&str> = header
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let find = |wanted: &str| -> Result<usize> {
            names
                .iter()
                .position(|n| *n == wanted.trim())
                .ok_or_else(|| FortifiError::MissingColumn(wanted.to_string()))
        };
        let balance = match mapping.balance.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(name) => Some(find(name)?),
            None => None,
        };
        Ok(Self {
            date: find(&mapping.date)?,
            description: find(&mapping.description)?,
            amount: find(&mapping.amount)?,
            balance,
        })
    }

    fn width(&self) -> usize {
        [self.date, self.description, self.amount, self.balance.unwrap_or(0)]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("expected at least {expected} columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("cannot parse date '{0}'")]
    BadDate(String),
    #[error("cannot parse amount '{0}'")]
    BadAmount(String),
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: RowError,
}

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<ParsedRecord>,
    pub rejected: Vec<RejectedRow>,
    pub blacklisted: usize,
}

enum RowResult {
    Record(ParsedRecord),
    Blacklisted(String),
}

fn parse_row(
    row: &StringRecord,
    columns: &Columns,
    format: &ImportFormat,
) -> std::result::Result<RowResult, RowError> {
    if row.len() < columns.width() {
        return Err(RowError::TooFewColumns {
            expected: columns.width(),
            found: row.len(),
        });
    }
    let field = |i: usize| row.get(i).unwrap_or("").trim();

    let raw_date = field(columns.date);
    let posted_at = parse_timestamp(raw_date, &format.date_format)
        .ok_or_else(|| RowError::BadDate(raw_date.to_string()))?;

    let raw_amount = field(columns.amount);
    let amount = parse_amount(raw_amount)
        .ok_or_else(|| RowError::BadAmount(raw_amount.to_string()))?
        * format.amount_multiplier;

    let balance = columns.balance.and_then(|i| {
        let raw = field(i);
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_amount(raw);
        if parsed.is_none() {
            warn!(value = raw, "ignoring unparseable balance");
        }
        parsed
    });

    let description = field(columns.description).to_string();
    if format.is_blacklisted(&description) {
        return Ok(RowResult::Blacklisted(description));
    }

    Ok(RowResult::Record(ParsedRecord {
        posted_at,
        description,
        amount,
        balance,
        daily_sequence: 0,
    }))
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn parse_statement(path: &Path, format: &ImportFormat) -> Result<ParseOutcome> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file), format)
}

/// Reads the header row, resolves the mapped columns, then parses every data
/// row. Bad rows are logged and collected in `rejected`; only a missing
/// header, a missing mapped column, or a file with no data rows is an error.
pub fn parse_reader<R: Read>(reader: R, format: &ImportFormat) -> Result<ParseOutcome> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = rdr.records();

    let header = match rows.next() {
        Some(header) => header?,
        None => return Err(FortifiError::Validation("file is empty".to_string())),
    };
    let columns = Columns::resolve(&header, &format.column_mapping)?;

    let mut outcome = ParseOutcome::default();
    let mut data_rows = 0usize;
    for (i, result) in rows.enumerate() {
        let line = i + 2;
        data_rows += 1;
        let parsed = match result {
            Ok(row) => parse_row(&row, &columns, format),
            Err(e) => Err(RowError::Unreadable(e.to_string())),
        };
        match parsed {
            Ok(RowResult::Record(record)) => outcome.records.push(record),
            Ok(RowResult::Blacklisted(description)) => {
                info!(line, description = %description, "skipping blacklisted transaction");
                outcome.blacklisted += 1;
            }
            Err(reason) => {
                warn!(line, %reason, "skipping malformed row");
                outcome.rejected.push(RejectedRow { line, reason });
            }
        }
    }

    if data_rows == 0 {
        return Err(FortifiError::Validation("file has a header but no data rows".to_string()));
    }
    Ok(outcome)
}

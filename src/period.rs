use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};

use crate::error::FortifiError;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Months strictly after `self` up to and including `end`.
    pub fn months_until(self, end: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut cursor = self.next();
        while cursor <= end {
            months.push(cursor);
            cursor = cursor.next();
        }
        months
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = FortifiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FortifiError::Validation(format!("invalid month '{s}', expected YYYY-MM"));
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ym("2025-06").to_string(), "2025-06");
        assert_eq!(ym(" 1999-12 "), YearMonth { year: 1999, month: 12 });
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("2025-6".parse::<YearMonth>().is_err());
        assert!("June".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_next_rolls_over_year() {
        assert_eq!(ym("2024-12").next(), ym("2025-01"));
        assert_eq!(ym("2025-01").next(), ym("2025-02"));
    }

    #[test]
    fn test_months_until_excludes_start_includes_end() {
        let months = ym("2025-03").months_until(ym("2025-06"));
        let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["2025-04", "2025-05", "2025-06"]);
        assert!(ym("2025-06").months_until(ym("2025-06")).is_empty());
        assert!(ym("2025-07").months_until(ym("2025-06")).is_empty());
    }

    #[test]
    fn test_label() {
        assert_eq!(ym("2025-06").label(), "June 2025");
    }
}

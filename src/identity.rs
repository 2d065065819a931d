use std::collections::HashMap;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::ParsedRecord;

/// Rounds to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Equality after rounding both sides to cents.
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a * 100.0).round() == (b * 100.0).round()
}

fn record_key(date: NaiveDate, amount: f64, description: &str) -> String {
    format!("{}|{:.2}|{}", date.format("%Y-%m-%d"), amount, description)
}

/// Numbers records sharing (date, amount to cents, description) 1, 2, 3... in
/// the order they appear. Record order is left untouched.
pub fn assign_daily_sequences(records: &mut [ParsedRecord]) {
    let mut counters: HashMap<String, u32> = HashMap::new();
    for record in records.iter_mut() {
        let counter = counters
            .entry(record_key(record.date(), record.amount, &record.description))
            .or_insert(0);
        *counter += 1;
        record.daily_sequence = *counter;
    }
}

/// SHA-256 over `YYYY-MM-DD|AMOUNT_2DP|DESCRIPTION|SEQUENCE`, lowercase hex.
pub fn transaction_hash(date: NaiveDate, amount: f64, description: &str, sequence: u32) -> String {
    let key = format!("{}|{sequence}", record_key(date, amount, description));
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn record_hash(record: &ParsedRecord) -> String {
    transaction_hash(record.date(), record.amount, &record.description, record.daily_sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, amount: f64, description: &str) -> ParsedRecord {
        ParsedRecord {
            posted_at: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: description.to_string(),
            amount,
            balance: None,
            daily_sequence: 0,
        }
    }

    #[test]
    fn test_hash_matches_known_digest() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            transaction_hash(date, -4.25, "COFFEE", 1),
            "ce0e3812d15d85b9cd02649bea4ed058ad57305f8e0eaaeb6a74271bf60ce51c"
        );
        assert_eq!(
            transaction_hash(date, -4.25, "COFFEE", 2),
            "fb892bad1bdc3148805ac44304231260fdbb55b70124aee19ee6d79174f10c97"
        );
    }

    #[test]
    fn test_hash_rounds_amount_to_cents() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            transaction_hash(date, -4.25, "COFFEE", 1),
            transaction_hash(date, -4.2500001, "COFFEE", 1)
        );
    }

    #[test]
    fn test_sequences_count_within_group_in_encounter_order() {
        let mut records = vec![
            record("2025-06-01", -4.25, "COFFEE"),
            record("2025-06-01", -12.00, "LUNCH"),
            record("2025-06-01", -4.25, "COFFEE"),
            record("2025-06-02", -4.25, "COFFEE"),
            record("2025-06-01", -4.25, "COFFEE"),
        ];
        assign_daily_sequences(&mut records);
        let seqs: Vec<u32> = records.iter().map(|r| r.daily_sequence).collect();
        assert_eq!(seqs, vec![1, 1, 2, 1, 3]);
        assert_eq!(records[1].description, "LUNCH");
    }

    #[test]
    fn test_colliding_records_get_distinct_hashes() {
        let mut records = vec![
            record("2025-06-01", -4.25, "COFFEE"),
            record("2025-06-01", -4.25, "COFFEE"),
            record("2025-06-01", -4.26, "COFFEE"),
            record("2025-06-01", -4.25, "COFFEE "),
        ];
        assign_daily_sequences(&mut records);
        let mut hashes: Vec<String> = records.iter().map(record_hash).collect();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    fn test_amounts_match_rounds_both_sides() {
        assert!(amounts_match(-9.99, -9.990000001));
        assert!(amounts_match(-9.994, -9.99));
        assert!(!amounts_match(-9.99, -20.0));
        assert_eq!(round2(-4.2500001), -4.25);
    }
}

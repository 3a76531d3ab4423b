//! Recurring payment detection
//!
//! Finds expenses that repeat roughly monthly with a stable amount, such as
//! subscriptions and rent. Transactions are grouped by a normalized note.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringParams {
    /// Minimum number of payments before a pattern counts
    pub min_occurrences: usize,
    /// Allowed relative deviation of each amount from the group mean
    pub amount_tolerance: f64,
    /// Accepted range for the mean number of days between payments
    pub min_interval_days: f64,
    pub max_interval_days: f64,
}

impl Default for RecurringParams {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            amount_tolerance: 0.05,
            min_interval_days: 25.0,
            max_interval_days: 35.0,
        }
    }
}

impl RecurringParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_occurrences < 2 {
            return Err(Error::InvalidParameter(
                "min_occurrences must be at least 2".into(),
            ));
        }
        if !self.amount_tolerance.is_finite() || self.amount_tolerance <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "amount_tolerance must be positive, got {}",
                self.amount_tolerance
            )));
        }
        if !(self.min_interval_days.is_finite() && self.max_interval_days.is_finite())
            || self.min_interval_days < 0.0
            || self.min_interval_days > self.max_interval_days
        {
            return Err(Error::InvalidParameter(format!(
                "interval range {}..={} days is invalid",
                self.min_interval_days, self.max_interval_days
            )));
        }
        Ok(())
    }
}

/// A group of expenses that looks like a recurring payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringCandidate {
    /// Normalized note shared by the group
    pub description: String,
    pub occurrences: usize,
    /// Mean expense magnitude
    pub average_amount: f64,
    pub average_interval_days: f64,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub next_expected: Option<NaiveDate>,
    /// Category of the earliest payment
    pub category_id: Option<i64>,
    pub transaction_ids: Vec<i64>,
}

/// Lowercases a note and strips digits, punctuation and extra whitespace
struct NoteNormalizer {
    strip: Regex,
}

impl NoteNormalizer {
    fn new() -> Result<Self> {
        Ok(Self {
            strip: Regex::new(r"[^\p{L}\s]+")?,
        })
    }

    fn normalize(&self, note: &str) -> String {
        let lower = note.to_lowercase();
        self.strip
            .replace_all(&lower, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn candidate(
    description: String,
    mut payments: Vec<&Transaction>,
    params: &RecurringParams,
) -> Option<RecurringCandidate> {
    if payments.len() < params.min_occurrences {
        return None;
    }

    let amounts: Vec<f64> = payments.iter().map(|tx| tx.magnitude()).collect();
    let average_amount = stats::mean(&amounts);
    if average_amount < 0.01 {
        return None;
    }
    let consistent = amounts
        .iter()
        .all(|a| (a - average_amount).abs() / average_amount < params.amount_tolerance);
    if !consistent {
        return None;
    }

    payments.sort_by_key(|tx| (tx.date, tx.id));
    let intervals: Vec<f64> = payments
        .windows(2)
        .map(|pair| (pair[1].date - pair[0].date).num_days() as f64)
        .collect();
    let average_interval_days = stats::mean(&intervals);
    if average_interval_days < params.min_interval_days
        || average_interval_days > params.max_interval_days
    {
        return None;
    }

    let first = payments.first()?;
    let last = payments.last()?;
    Some(RecurringCandidate {
        description,
        occurrences: payments.len(),
        average_amount,
        average_interval_days,
        first_seen: first.date,
        last_seen: last.date,
        next_expected: last
            .date
            .checked_add_signed(Duration::days(average_interval_days.round() as i64)),
        category_id: first.category_id,
        transaction_ids: payments.iter().map(|tx| tx.id).collect(),
    })
}

/// Detect roughly monthly expenses with stable amounts
///
/// Expenses with an empty note (after normalization) are ignored. Results
/// are sorted by average amount, largest first.
pub fn detect_recurring(
    transactions: &[Transaction],
    params: &RecurringParams,
) -> Result<Vec<RecurringCandidate>> {
    params.validate()?;
    let normalizer = NoteNormalizer::new()?;

    let mut groups: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_expense()) {
        let key = normalizer.normalize(&tx.note);
        if !key.is_empty() {
            groups.entry(key).or_default().push(tx);
        }
    }

    let group_count = groups.len();
    let mut candidates: Vec<RecurringCandidate> = groups
        .into_iter()
        .filter_map(|(description, payments)| candidate(description, payments, params))
        .collect();

    candidates.sort_by(|a, b| {
        b.average_amount
            .total_cmp(&a.average_amount)
            .then_with(|| a.description.cmp(&b.description))
    });

    debug!(
        groups = group_count,
        recurring = candidates.len(),
        "Recurring payment detection complete"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn noted(id: i64, on: &str, amount: f64, note: &str) -> Transaction {
        tx(id, on, amount, Some(FOOD)).with_note(note)
    }

    #[test]
    fn test_normalizer_strips_digits_and_punctuation() {
        let normalizer = NoteNormalizer::new().unwrap();
        assert_eq!(normalizer.normalize("NETFLIX.COM #4471 "), "netflix com");
        assert_eq!(normalizer.normalize("Gym  - Jan 2024"), "gym jan");
        assert_eq!(normalizer.normalize("12345"), "");
    }

    #[test]
    fn test_monthly_subscription_detected() {
        let transactions = vec![
            noted(1, "2024-01-15", -15.99, "Netflix 0115"),
            noted(2, "2024-02-15", -15.99, "NETFLIX 0215"),
            noted(3, "2024-03-16", -16.49, "netflix 0316"),
            noted(4, "2024-03-02", -42.00, "Corner cafe"),
        ];

        let found = detect_recurring(&transactions, &RecurringParams::default()).unwrap();

        assert_eq!(found.len(), 1);
        let netflix = &found[0];
        assert_eq!(netflix.description, "netflix");
        assert_eq!(netflix.occurrences, 3);
        assert_eq!(netflix.transaction_ids, vec![1, 2, 3]);
        assert_eq!(netflix.first_seen, date(2024, 1, 15));
        assert_eq!(netflix.last_seen, date(2024, 3, 16));
        assert!((netflix.average_interval_days - 30.5).abs() < 1e-9);
        assert_eq!(netflix.category_id, Some(FOOD));
        assert!(netflix.next_expected.is_some());
    }

    #[test]
    fn test_unstable_amounts_rejected() {
        let transactions = vec![
            noted(1, "2024-01-10", -30.0, "Grocer"),
            noted(2, "2024-02-10", -55.0, "Grocer"),
            noted(3, "2024-03-10", -41.0, "Grocer"),
        ];
        assert!(detect_recurring(&transactions, &RecurringParams::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_weekly_cadence_rejected() {
        let transactions = vec![
            noted(1, "2024-01-01", -9.0, "Lunch box"),
            noted(2, "2024-01-08", -9.0, "Lunch box"),
            noted(3, "2024-01-15", -9.0, "Lunch box"),
        ];
        assert!(detect_recurring(&transactions, &RecurringParams::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_income_and_short_groups_ignored() {
        let transactions = vec![
            noted(1, "2024-01-01", 2000.0, "Payroll"),
            noted(2, "2024-02-01", 2000.0, "Payroll"),
            noted(3, "2024-03-01", 2000.0, "Payroll"),
            noted(4, "2024-01-05", -10.0, "Cloud storage"),
            noted(5, "2024-02-05", -10.0, "Cloud storage"),
        ];
        assert!(detect_recurring(&transactions, &RecurringParams::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let params = RecurringParams {
            min_interval_days: 40.0,
            ..RecurringParams::default()
        };
        assert!(matches!(
            detect_recurring(&[], &params),
            Err(Error::InvalidParameter(_))
        ));
        let params = RecurringParams {
            amount_tolerance: 0.0,
            ..RecurringParams::default()
        };
        assert!(detect_recurring(&[], &params).is_err());
    }
}

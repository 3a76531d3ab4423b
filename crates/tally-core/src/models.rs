//! Domain models for Tally

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether a transaction moves money out or in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded transaction
///
/// `amount` is signed: negative for expenses, positive for income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Rule that generated this transaction, if any. Never interpreted here.
    #[serde(default)]
    pub recurring_rule: Option<String>,
}

impl Transaction {
    pub fn new(id: i64, date: NaiveDate, amount: f64, category_id: Option<i64>) -> Self {
        Self {
            id,
            date,
            amount,
            category_id,
            tags: BTreeSet::new(),
            note: String::new(),
            payment_method: None,
            recurring_rule: None,
        }
    }

    /// Build from an unsigned amount plus an explicit kind
    pub fn from_kind(
        id: i64,
        date: NaiveDate,
        kind: TransactionKind,
        magnitude: f64,
        category_id: Option<i64>,
    ) -> Self {
        let amount = match kind {
            TransactionKind::Expense => -magnitude.abs(),
            TransactionKind::Income => magnitude.abs(),
        };
        Self::new(id, date, amount, category_id)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> TransactionKind {
        if self.amount < 0.0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    /// Unsigned amount
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    /// Reject records that carry no analytical signal
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "transaction {} has a non-finite amount",
                self.id
            )));
        }
        if self.amount == 0.0 {
            return Err(Error::InvalidData(format!(
                "transaction {} has a zero amount",
                self.id
            )));
        }
        Ok(())
    }
}

/// A spending category, optionally nested under a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Monthly budget for this category (covers its descendants)
    #[serde(default)]
    pub budget: Option<f64>,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            budget: None,
        }
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }
}

// ========== Aggregation Models ==========

/// Scope of a bucket: everything, uncategorized only, or one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum CategoryKey {
    All,
    Uncategorized,
    Category(i64),
}

impl CategoryKey {
    pub fn from_category_id(category_id: Option<i64>) -> Self {
        match category_id {
            Some(id) => Self::Category(id),
            None => Self::Uncategorized,
        }
    }

    pub fn category_id(&self) -> Option<i64> {
        match self {
            Self::Category(id) => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Uncategorized => write!(f, "uncategorized"),
            Self::Category(id) => write!(f, "{}", id),
        }
    }
}

/// Time bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// First day of the period containing `date`
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Month => date.with_day(1).expect("Day 1 always valid"),
            Self::Year => date.with_ordinal(1).expect("Ordinal 1 always valid"),
        }
    }

    /// First day of the period after the one containing `date`
    ///
    /// Returns None past the end of the supported calendar.
    pub fn next_period_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        let start = self.period_start(date);
        match self {
            Self::Day => start.succ_opt(),
            Self::Month => {
                if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                }
            }
            Self::Year => NaiveDate::from_ymd_opt(start.year() + 1, 1, 1),
        }
    }

    /// Human-readable period label ("2024-01-05", "2024-01", "2024")
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::Month => date.format("%Y-%m").to_string(),
            Self::Year => date.format("%Y").to_string(),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            _ => Err(format!(
                "Unknown granularity: {} (valid: day, month, year)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| Error::InvalidRange(format!("malformed date '{}': {}", s, e)))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// The calendar month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        let start = Granularity::Month.period_start(date);
        let end = Granularity::Month
            .next_period_start(date)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Ranges can be built with struct syntax, so queries re-check this
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::InvalidRange(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Aggregated totals for one period, optionally scoped to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub period: String,
    pub period_start: NaiveDate,
    pub category: CategoryKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Net sum (income minus expenses)
    pub total: f64,
    /// Sum of expenses only (zero or negative)
    pub expense_total: f64,
    /// Sum of income only (zero or positive)
    pub income_total: f64,
    pub count: usize,
    /// Net total divided by count, zero for empty periods
    pub mean: f64,
    /// Cumulative net total of this scope up to and including this period
    pub running_total: f64,
}

impl Bucket {
    /// Expense total as a positive number
    pub fn expense_magnitude(&self) -> f64 {
        self.expense_total.abs()
    }
}

/// Net, expense and income totals of a transaction set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub net: f64,
    pub expense: f64,
    pub income: f64,
    pub count: usize,
}

// ========== Trend Models ==========

/// Percentage change that is undefined when the base is zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentChange {
    Value(f64),
    /// Previous value was zero; callers must render this explicitly
    Undefined,
}

impl PercentChange {
    /// `change / base * 100`, undefined on a zero base
    pub fn between(base: f64, change: f64) -> Self {
        if base == 0.0 {
            Self::Undefined
        } else {
            Self::Value(change / base * 100.0)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl std::fmt::Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{:+.1}%", v),
            Self::Undefined => write!(f, "n/a"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub absolute: f64,
    pub percent: PercentChange,
}

/// One point of a trend series (every bucket after the first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub period_start: NaiveDate,
    pub total: f64,
    pub previous_total: f64,
    pub delta: Delta,
    pub rolling_mean: f64,
    pub rolling_stddev: f64,
    /// Window actually used after clamping to available history
    pub rolling_window: usize,
}

// ========== Distribution Models ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionLabel {
    Category {
        key: CategoryKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Collapsed categories below the minimum share
    Other { collapsed: usize },
}

impl DistributionLabel {
    pub fn display_name(&self) -> String {
        match self {
            Self::Category {
                name: Some(name), ..
            } => name.clone(),
            Self::Category {
                key: CategoryKey::Uncategorized,
                ..
            } => "Uncategorized".to_string(),
            Self::Category { key, .. } => format!("Category {}", key),
            Self::Other { .. } => "Other".to_string(),
        }
    }
}

/// A category's share of expense in a period or range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub rank: usize,
    pub label: DistributionLabel,
    /// Expense magnitude
    pub amount: f64,
    pub share_percent: f64,
    pub transaction_count: usize,
}

// ========== Anomaly Models ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    /// Absolute amount above mean + k * stddev
    ExceedsCategoryNorm,
    /// Absolute amount below a positive mean - k * stddev
    BelowCategoryNorm,
    /// History has no spread and the amount exceeds mean * k
    ExceedsFlatHistory,
}

impl AnomalyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExceedsCategoryNorm => "exceeds_category_norm",
            Self::BelowCategoryNorm => "below_category_norm",
            Self::ExceedsFlatHistory => "exceeds_flat_history",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ExceedsCategoryNorm => "amount exceeds category norm",
            Self::BelowCategoryNorm => "amount falls below category norm",
            Self::ExceedsFlatHistory => "amount exceeds an unvarying category history",
        }
    }
}

impl std::fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction flagged as unusual for its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub transaction_id: i64,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub amount: f64,
    /// Signed z-score against the history excluding this transaction
    pub score: f64,
    pub reason: AnomalyReason,
    /// Mean absolute amount of the history
    pub history_mean: f64,
    pub history_stddev: f64,
    pub sample_size: usize,
}

/// A day with unusually many transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFlag {
    pub date: NaiveDate,
    pub count: usize,
    pub threshold: f64,
    /// Mean count of the other active days
    pub average: f64,
    pub score: f64,
}

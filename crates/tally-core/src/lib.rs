//! Tally Core Library
//!
//! Analytics engine for the Tally personal expense tracker:
//! - Aggregation of transactions into day/month/year buckets with category roll-up
//! - Period-over-period trends with rolling statistics
//! - Category share distribution
//! - Leave-one-out anomaly detection
//! - Day-of-week totals and category × weekday matrices
//! - Period comparison, expense forecasts, budget status and recurring payments
//! - Snapshot loading (JSON and CSV export) and TOML report defaults
//!
//! Every report is a pure function of an immutable snapshot plus parameters.

pub mod aggregate;
pub mod anomaly;
pub mod budget;
pub mod categories;
pub mod compare;
pub mod config;
pub mod distribution;
pub mod error;
pub mod forecast;
pub mod models;
pub mod recurring;
pub mod snapshot;
pub mod stats;
pub mod trend;
pub mod weekday;

/// Fixture builders shared by unit, integration and CLI tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{aggregate, periods, summarize, AggregateQuery, CategoryFilter, CategoryGrouping};
pub use anomaly::{
    detect_all_anomalies, detect_anomalies, detect_frequency_anomalies, evaluate, AnomalyParams,
};
pub use budget::{budget_status, unbudgeted_spending, BudgetLevel, BudgetStatus, UnbudgetedSpending};
pub use categories::CategoryTree;
pub use compare::{compare_periods, CategoryChange, PeriodComparison, PeriodSummary};
pub use config::AnalyticsConfig;
pub use distribution::distribution;
pub use error::{Error, Result};
pub use forecast::{forecast, forecast_by_category, Confidence, Forecast, ForecastPoint, TrendDirection};
pub use models::{
    AnomalyFlag, AnomalyReason, Bucket, Category, CategoryKey, DateRange, Delta,
    DistributionEntry, DistributionLabel, FrequencyFlag, Granularity, PercentChange, Totals,
    Transaction, TransactionKind, TrendPoint,
};
pub use recurring::{detect_recurring, RecurringCandidate, RecurringParams};
pub use snapshot::Snapshot;
pub use trend::trend;
pub use weekday::{by_weekday, weekday_matrix, weekday_name, WeekdayRow, WeekdayTotals};

//! Core command utilities
//!
//! This module contains:
//! - `Session` - Snapshot, category tree and config loaded once per run
//! - `open_session` - Shared utility to load the snapshot and config
//! - Argument resolution helpers (periods, months, categories)

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use tally_core::{AnalyticsConfig, CategoryTree, DateRange, Snapshot};

use crate::cli::PeriodArgs;

/// Everything a report command needs
pub struct Session {
    pub snapshot: Snapshot,
    pub tree: CategoryTree,
    pub config: AnalyticsConfig,
    /// Print JSON instead of tables
    pub json: bool,
}

impl Session {
    pub fn new(snapshot: Snapshot, config: AnalyticsConfig, json: bool) -> Result<Self> {
        let tree = snapshot.tree().context("Invalid category tree in snapshot")?;
        Ok(Self {
            snapshot,
            tree,
            config,
            json,
        })
    }

    /// First day of the latest month with activity, or the current month
    pub fn latest_month(&self) -> NaiveDate {
        let latest = self
            .snapshot
            .transactions
            .iter()
            .map(|tx| tx.date)
            .max()
            .unwrap_or_else(|| Utc::now().date_naive());
        DateRange::month_of(latest).start
    }

    /// First to last transaction date, None for an empty snapshot
    pub fn activity_range(&self) -> Option<DateRange> {
        let dates = self.snapshot.transactions.iter().map(|tx| tx.date);
        let first = dates.clone().min()?;
        let last = dates.max()?;
        DateRange::new(first, last).ok()
    }

    /// Explicit range, or the whole activity range so that series
    /// keep empty periods as zero buckets
    pub fn series_range(&self, range: Option<DateRange>) -> Option<DateRange> {
        range.or_else(|| self.activity_range())
    }
}

/// Load the snapshot and analytics config
pub fn open_session(
    snapshot_path: &Path,
    config_path: Option<&Path>,
    json: bool,
) -> Result<Session> {
    let snapshot = Snapshot::load(snapshot_path)
        .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;
    let config = AnalyticsConfig::load(config_path).context("Failed to load analytics config")?;
    Session::new(snapshot, config, json)
}

/// Print any report as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

/// Resolve period arguments to a date range; `all` means no range
pub fn resolve_period(args: &PeriodArgs) -> Result<Option<DateRange>> {
    resolve_period_at(args, Utc::now().date_naive())
}

pub fn resolve_period_at(args: &PeriodArgs, today: NaiveDate) -> Result<Option<DateRange>> {
    match (args.from.as_deref(), args.to.as_deref()) {
        (Some(from), Some(to)) => {
            return DateRange::parse(from, to)
                .map(Some)
                .context("Invalid --from/--to dates (use YYYY-MM-DD)");
        }
        (Some(_), None) | (None, Some(_)) => bail!("--from and --to must be given together"),
        (None, None) => {}
    }

    let this_month = DateRange::month_of(today).start;
    let range = match args.period.to_lowercase().as_str() {
        "all" => return Ok(None),
        "this-month" => DateRange::new(this_month, today),
        "last-month" => {
            let last_day = this_month.pred_opt().context("Date out of range")?;
            DateRange::new(DateRange::month_of(last_day).start, last_day)
        }
        "this-year" => {
            let from = today.with_ordinal(1).context("Date out of range")?;
            DateRange::new(from, today)
        }
        "last-30-days" => DateRange::new(today - Duration::days(30), today),
        "last-90-days" => DateRange::new(today - Duration::days(90), today),
        "last-12-months" => {
            let from = NaiveDate::from_ymd_opt(today.year() - 1, today.month(), 1)
                .context("Date out of range")?;
            DateRange::new(from, today)
        }
        _ => bail!(
            "Unknown period: {}. Available: all, this-month, last-month, this-year, last-30-days, last-90-days, last-12-months",
            args.period
        ),
    }?;
    Ok(Some(range))
}

/// Parse `YYYY-MM` into the first day of that month
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}' (use YYYY-MM)", s))
}

/// Resolve a category given as a numeric id or a path such as "Food > Groceries"
pub fn resolve_category(tree: &CategoryTree, value: &str) -> Result<i64> {
    if let Ok(id) = value.trim().parse::<i64>() {
        tree.require(id)?;
        return Ok(id);
    }
    match tree.find_by_path(value) {
        Some(id) => Ok(id),
        None => bail!("Category not found: {}", value),
    }
}

/// Display name for an optional category id
pub fn category_label(tree: &CategoryTree, category_id: Option<i64>) -> String {
    match category_id {
        Some(id) => tree.path(id).unwrap_or_else(|| format!("#{}", id)),
        None => "Uncategorized".to_string(),
    }
}

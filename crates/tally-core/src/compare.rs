//! Period comparison
//!
//! Income, expense and net of two date ranges side by side, with a
//! per-category breakdown of expense changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{aggregate, summarize, AggregateQuery, CategoryGrouping};
use crate::categories::CategoryTree;
use crate::error::Result;
use crate::models::{CategoryKey, DateRange, Delta, Granularity, PercentChange, Transaction};

/// Growth over the previous period, in percent, that marks a notable increase
pub const INCREASE_PERCENT: f64 = 30.0;

/// Current-period expense a category needs before an increase is notable
pub const INCREASE_MIN_AMOUNT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub range: DateRange,
    pub income: f64,
    /// Expense magnitude
    pub expense: f64,
    pub net: f64,
    pub count: usize,
}

/// Expense of one category in both periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryChange {
    pub key: CategoryKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub current: f64,
    pub previous: f64,
    pub change: Delta,
    /// Spent before and grew past both increase thresholds
    pub notable_increase: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub income: Delta,
    pub expense: Delta,
    pub net: Delta,
    /// Sorted by absolute change, largest first
    pub categories: Vec<CategoryChange>,
}

impl PeriodComparison {
    /// Categories whose spending grew notably, largest change first
    pub fn increases(&self) -> impl Iterator<Item = &CategoryChange> {
        self.categories.iter().filter(|c| c.notable_increase)
    }
}

fn is_notable_increase(previous: f64, current: f64) -> bool {
    previous > 0.0
        && current > INCREASE_MIN_AMOUNT
        && current > previous * (1.0 + INCREASE_PERCENT / 100.0)
}

/// Change from `previous` to `current`, percent measured against `|previous|`
fn delta(previous: f64, current: f64) -> Delta {
    let absolute = current - previous;
    Delta {
        absolute,
        percent: PercentChange::between(previous.abs(), absolute),
    }
}

fn summary(transactions: &[Transaction], range: DateRange) -> PeriodSummary {
    let totals = summarize(transactions.iter().filter(|tx| range.contains(tx.date)));
    PeriodSummary {
        range,
        income: totals.income,
        expense: totals.expense.abs(),
        net: totals.net,
        count: totals.count,
    }
}

/// Expense magnitude per category key over a range
fn expense_by_key(
    transactions: &[Transaction],
    tree: &CategoryTree,
    range: DateRange,
    grouping: CategoryGrouping,
) -> Result<BTreeMap<CategoryKey, (Option<String>, f64)>> {
    let query = AggregateQuery::new(Granularity::Year)
        .with_range(range)
        .with_grouping(grouping);

    let mut by_key: BTreeMap<CategoryKey, (Option<String>, f64)> = BTreeMap::new();
    for bucket in aggregate(transactions, tree, &query)? {
        let entry = by_key
            .entry(bucket.category)
            .or_insert_with(|| (bucket.category_name.clone(), 0.0));
        entry.1 += bucket.expense_magnitude();
    }
    Ok(by_key)
}

/// Compare two date ranges
pub fn compare_periods(
    transactions: &[Transaction],
    tree: &CategoryTree,
    current: DateRange,
    previous: DateRange,
    grouping: CategoryGrouping,
) -> Result<PeriodComparison> {
    current.validate()?;
    previous.validate()?;

    let current_summary = summary(transactions, current);
    let previous_summary = summary(transactions, previous);

    let now = expense_by_key(transactions, tree, current, grouping)?;
    let before = expense_by_key(transactions, tree, previous, grouping)?;

    let mut keys: Vec<CategoryKey> = now.keys().chain(before.keys()).copied().collect();
    keys.sort();
    keys.dedup();

    let mut categories: Vec<CategoryChange> = keys
        .into_iter()
        .filter_map(|key| {
            let (name_now, current) = now.get(&key).cloned().unwrap_or_default();
            let (name_before, previous) = before.get(&key).cloned().unwrap_or_default();
            if current == 0.0 && previous == 0.0 {
                return None;
            }
            Some(CategoryChange {
                key,
                name: name_now.or(name_before),
                current,
                previous,
                change: delta(previous, current),
                notable_increase: is_notable_increase(previous, current),
            })
        })
        .collect();

    categories.sort_by(|a, b| {
        b.change
            .absolute
            .abs()
            .total_cmp(&a.change.absolute.abs())
            .then_with(|| a.key.cmp(&b.key))
    });

    debug!(
        current = %current,
        previous = %previous,
        grouping = %grouping,
        categories = categories.len(),
        "Period comparison complete"
    );

    Ok(PeriodComparison {
        income: delta(previous_summary.income, current_summary.income),
        expense: delta(previous_summary.expense, current_summary.expense),
        net: delta(previous_summary.net, current_summary.net),
        current: current_summary,
        previous: previous_summary,
        categories,
    })
}

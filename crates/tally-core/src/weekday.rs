//! Day-of-week breakdowns
//!
//! Totals per weekday and a category × weekday expense matrix. Both reuse an
//! `AggregateQuery` for range, filter and grouping; its granularity is ignored.

use std::collections::BTreeMap;

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::AggregateQuery;
use crate::categories::CategoryTree;
use crate::error::Result;
use crate::models::{CategoryKey, Transaction};

/// Monday first, matching `Weekday::num_days_from_monday`
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Net, expense and income of every transaction that fell on one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayTotals {
    pub weekday: Weekday,
    pub total: f64,
    /// Expense magnitude
    pub expense: f64,
    pub income: f64,
    pub count: usize,
    /// Net total / count, 0 for days without transactions
    pub mean: f64,
}

/// Expense magnitudes of one category key, Monday to Sunday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayRow {
    pub category: CategoryKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub expense: [f64; 7],
    pub total: f64,
}

impl WeekdayRow {
    pub fn on(&self, day: Weekday) -> f64 {
        self.expense[day.num_days_from_monday() as usize]
    }
}

fn day_index(tx: &Transaction) -> usize {
    tx.date.weekday().num_days_from_monday() as usize
}

/// Totals for each weekday, always seven entries starting on Monday
///
/// Grouping is ignored: every matching transaction is counted once.
pub fn by_weekday(
    transactions: &[Transaction],
    tree: &CategoryTree,
    query: &AggregateQuery,
) -> Result<Vec<WeekdayTotals>> {
    query.validate(tree)?;

    let mut days: Vec<WeekdayTotals> = WEEKDAYS
        .iter()
        .map(|&weekday| WeekdayTotals {
            weekday,
            total: 0.0,
            expense: 0.0,
            income: 0.0,
            count: 0,
            mean: 0.0,
        })
        .collect();

    for tx in transactions.iter().filter(|tx| query.includes(tx, tree)) {
        let day = &mut days[day_index(tx)];
        day.total += tx.amount;
        if tx.is_expense() {
            day.expense += tx.magnitude();
        } else {
            day.income += tx.amount;
        }
        day.count += 1;
    }
    for day in days.iter_mut().filter(|d| d.count > 0) {
        day.mean = day.total / day.count as f64;
    }

    debug!(
        transactions = days.iter().map(|d| d.count).sum::<usize>(),
        "Weekday totals computed"
    );
    Ok(days)
}

/// Expense per category key and weekday
///
/// Rows follow the query's grouping (or its filter scope without one) and
/// are sorted by total expense, largest first. Income never contributes.
pub fn weekday_matrix(
    transactions: &[Transaction],
    tree: &CategoryTree,
    query: &AggregateQuery,
) -> Result<Vec<WeekdayRow>> {
    query.validate(tree)?;

    let mut cells: BTreeMap<CategoryKey, [f64; 7]> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.is_expense() && query.includes(tx, tree))
    {
        let index = day_index(tx);
        for key in query.keys_for(tx, tree) {
            cells.entry(key).or_insert([0.0; 7])[index] += tx.magnitude();
        }
    }

    let mut rows: Vec<WeekdayRow> = cells
        .into_iter()
        .map(|(category, expense)| WeekdayRow {
            category,
            category_name: category
                .category_id()
                .and_then(|id| tree.name(id))
                .map(str::to_string),
            total: expense.iter().sum(),
            expense,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    debug!(rows = rows.len(), "Weekday matrix computed");
    Ok(rows)
}

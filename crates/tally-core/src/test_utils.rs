//! Test utilities for tally-core
//!
//! Fixture builders for category trees and transaction snapshots, shared by
//! unit tests, integration tests and the CLI tests.

use chrono::NaiveDate;

use crate::categories::CategoryTree;
use crate::models::{Category, Transaction};

pub const FOOD: i64 = 1;
pub const SALARY: i64 = 2;
pub const HOUSING: i64 = 3;
pub const RESTAURANTS: i64 = 11;
pub const GROCERIES: i64 = 12;

/// Build a date, panicking on invalid input (tests only)
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Parse a `YYYY-MM-DD` date (tests only)
pub fn ymd(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Shorthand transaction builder
pub fn tx(id: i64, on: &str, amount: f64, category_id: Option<i64>) -> Transaction {
    Transaction::new(id, ymd(on), amount, category_id)
}

/// Categories used across tests
///
/// ```text
/// 1 Food (budget 400)
///   11 Restaurants
///   12 Groceries
/// 2 Salary
/// 3 Housing (budget 1200)
/// ```
pub fn sample_categories() -> Vec<Category> {
    vec![
        Category::new(FOOD, "Food", None).with_budget(400.0),
        Category::new(SALARY, "Salary", None),
        Category::new(HOUSING, "Housing", None).with_budget(1200.0),
        Category::new(RESTAURANTS, "Restaurants", Some(FOOD)),
        Category::new(GROCERIES, "Groceries", Some(FOOD)),
    ]
}

pub fn sample_tree() -> CategoryTree {
    CategoryTree::new(sample_categories()).unwrap()
}

/// A quarter of household activity (Jan to Mar 2024)
pub fn sample_transactions() -> Vec<Transaction> {
    vec![
        tx(1, "2024-01-01", 2000.0, Some(SALARY)),
        tx(2, "2024-01-05", -50.0, Some(GROCERIES)),
        tx(3, "2024-01-20", -30.0, Some(RESTAURANTS)),
        tx(4, "2024-01-03", -1200.0, Some(HOUSING)),
        tx(5, "2024-02-01", 2000.0, Some(SALARY)),
        tx(6, "2024-02-07", -80.0, Some(GROCERIES)),
        tx(7, "2024-02-14", -70.0, Some(RESTAURANTS)),
        tx(8, "2024-02-03", -1200.0, Some(HOUSING)),
        tx(9, "2024-03-01", 2100.0, Some(SALARY)),
        tx(10, "2024-03-09", -95.0, Some(GROCERIES)),
        tx(11, "2024-03-03", -1200.0, Some(HOUSING)),
        tx(12, "2024-03-18", -12.5, None),
    ]
}

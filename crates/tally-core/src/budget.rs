//! Budget Status
//!
//! Monthly spend against category budgets. A budget covers its category and
//! every descendant, so a parent budget sees spending filed under children.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categories::CategoryTree;
use crate::error::{Error, Result};
use crate::models::{DateRange, Transaction};

/// Default percent of budget at which a warning is raised
pub const DEFAULT_WARN_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    OnTrack,
    Warning,
    Over,
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::Warning => "warning",
            Self::Over => "over",
        }
    }
}

impl std::fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category_id: i64,
    pub name: String,
    pub budget: f64,
    /// Expense magnitude for the month, descendants included
    pub spent: f64,
    /// Negative once over budget
    pub remaining: f64,
    pub percent_used: f64,
    pub level: BudgetLevel,
}

/// Spending in a top-level category that has no budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbudgetedSpending {
    pub category_id: i64,
    pub name: String,
    pub spent: f64,
}

fn rolled_up_spend(
    transactions: &[Transaction],
    tree: &CategoryTree,
    range: &DateRange,
    category_id: i64,
) -> f64 {
    transactions
        .iter()
        .filter(|tx| tx.is_expense() && range.contains(tx.date))
        .filter(|tx| {
            tx.category_id
                .is_some_and(|id| tree.is_within(id, category_id))
        })
        .map(Transaction::magnitude)
        .sum()
}

fn positive_budget(budget: Option<f64>) -> Option<f64> {
    budget.filter(|b| b.is_finite() && *b > 0.0)
}

/// Status of every budgeted category for the month containing `month`
///
/// Sorted by percent used, highest first.
pub fn budget_status(
    transactions: &[Transaction],
    tree: &CategoryTree,
    month: NaiveDate,
    warn_percent: f64,
) -> Result<Vec<BudgetStatus>> {
    if !warn_percent.is_finite() || warn_percent <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "warning threshold must be a positive percent, got {}",
            warn_percent
        )));
    }

    let range = DateRange::month_of(month);
    let mut statuses: Vec<BudgetStatus> = tree
        .iter()
        .filter_map(|category| {
            let budget = positive_budget(category.budget)?;
            let spent = rolled_up_spend(transactions, tree, &range, category.id);
            let percent_used = spent / budget * 100.0;
            let level = if spent > budget {
                BudgetLevel::Over
            } else if percent_used > warn_percent {
                BudgetLevel::Warning
            } else {
                BudgetLevel::OnTrack
            };
            Some(BudgetStatus {
                category_id: category.id,
                name: category.name.clone(),
                budget,
                spent,
                remaining: budget - spent,
                percent_used,
                level,
            })
        })
        .collect();

    statuses.sort_by(|a, b| {
        b.percent_used
            .total_cmp(&a.percent_used)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    debug!(
        month = %range,
        budgets = statuses.len(),
        over = statuses.iter().filter(|s| s.level == BudgetLevel::Over).count(),
        "Budget status computed"
    );
    Ok(statuses)
}

/// Top-level categories without a budget whose monthly spend exceeds `min_amount`
pub fn unbudgeted_spending(
    transactions: &[Transaction],
    tree: &CategoryTree,
    month: NaiveDate,
    min_amount: f64,
) -> Result<Vec<UnbudgetedSpending>> {
    if !min_amount.is_finite() || min_amount < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "minimum amount must be a non-negative number, got {}",
            min_amount
        )));
    }

    let range = DateRange::month_of(month);
    let mut rows: Vec<UnbudgetedSpending> = tree
        .roots()
        .into_iter()
        .filter_map(|id| {
            let category = tree.get(id)?;
            if positive_budget(category.budget).is_some() {
                return None;
            }
            let spent = rolled_up_spend(transactions, tree, &range, id);
            (spent > min_amount).then(|| UnbudgetedSpending {
                category_id: id,
                name: category.name.clone(),
                spent,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.spent.total_cmp(&a.spent));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::test_utils::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_parent_budget_includes_children() {
        let tree = sample_tree();
        let statuses =
            budget_status(&sample_transactions(), &tree, date(2024, 2, 10), DEFAULT_WARN_PERCENT)
                .unwrap();

        assert_eq!(statuses.len(), 2);

        // Housing at exactly 100% is a warning, not over
        let housing = &statuses[0];
        assert_eq!(housing.category_id, HOUSING);
        assert!((housing.percent_used - 100.0).abs() < EPS);
        assert_eq!(housing.level, BudgetLevel::Warning);
        assert_eq!(housing.remaining, 0.0);

        // Groceries 80 + Restaurants 70
        let food = &statuses[1];
        assert_eq!(food.category_id, FOOD);
        assert!((food.spent - 150.0).abs() < EPS);
        assert!((food.remaining - 250.0).abs() < EPS);
        assert_eq!(food.level, BudgetLevel::OnTrack);
    }

    #[test]
    fn test_over_budget() {
        let tree = sample_tree();
        let mut transactions = sample_transactions();
        transactions.push(tx(50, "2024-03-20", -400.0, Some(RESTAURANTS)));

        let statuses = budget_status(&transactions, &tree, date(2024, 3, 1), 90.0).unwrap();

        let food = statuses.iter().find(|s| s.category_id == FOOD).unwrap();
        assert!((food.spent - 495.0).abs() < EPS);
        assert_eq!(food.level, BudgetLevel::Over);
        assert!(food.remaining < 0.0);
        assert_eq!(statuses[0].category_id, FOOD);
    }

    #[test]
    fn test_warn_threshold_is_configurable() {
        let tree = sample_tree();
        let statuses = budget_status(&sample_transactions(), &tree, date(2024, 2, 1), 30.0).unwrap();
        let food = statuses.iter().find(|s| s.category_id == FOOD).unwrap();
        assert_eq!(food.level, BudgetLevel::Warning);
    }

    #[test]
    fn test_invalid_warn_threshold() {
        let tree = sample_tree();
        assert!(matches!(
            budget_status(&[], &tree, date(2024, 1, 1), 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(budget_status(&[], &tree, date(2024, 1, 1), f64::NAN).is_err());
    }

    #[test]
    fn test_income_does_not_count_as_spend() {
        let tree = sample_tree();
        let transactions = vec![tx(1, "2024-01-02", 500.0, Some(GROCERIES))];
        let statuses = budget_status(&transactions, &tree, date(2024, 1, 1), 90.0).unwrap();
        assert!(statuses.iter().all(|s| s.spent == 0.0));
    }

    #[test]
    fn test_unbudgeted_top_level_spending() {
        let mut categories = sample_categories();
        categories.push(Category::new(4, "Travel", None));
        categories.push(Category::new(41, "Flights", Some(4)));
        categories.push(Category::new(5, "Gifts", None));
        let tree = CategoryTree::new(categories).unwrap();

        let transactions = vec![
            tx(1, "2024-05-02", -320.0, Some(41)),
            tx(2, "2024-05-03", -80.0, Some(4)),
            tx(3, "2024-05-04", -20.0, Some(5)),
            tx(4, "2024-05-05", -900.0, Some(GROCERIES)),
            tx(5, "2024-04-30", -999.0, Some(4)),
        ];

        let rows = unbudgeted_spending(&transactions, &tree, date(2024, 5, 15), 50.0).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Travel");
        assert!((rows[0].spent - 400.0).abs() < EPS);

        assert!(unbudgeted_spending(&transactions, &tree, date(2024, 5, 15), -1.0).is_err());
    }
}

//! Budget command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{
    budget_status, unbudgeted_spending, BudgetLevel, BudgetStatus, DateRange, UnbudgetedSpending,
};

use super::core::Session;
use super::truncate;

#[derive(Serialize)]
struct BudgetReport {
    month: DateRange,
    budgets: Vec<BudgetStatus>,
    unbudgeted: Vec<UnbudgetedSpending>,
}

pub fn cmd_budgets(session: &Session, month: NaiveDate) -> Result<()> {
    let transactions = &session.snapshot.transactions;
    let budgets = budget_status(transactions, &session.tree, month, session.config.warn_percent)
        .context("Budget status failed")?;
    let unbudgeted = unbudgeted_spending(
        transactions,
        &session.tree,
        month,
        session.config.unbudgeted_min_amount,
    )?;
    let range = DateRange::month_of(month);

    if session.json {
        return super::print_json(&BudgetReport {
            month: range,
            budgets,
            unbudgeted,
        });
    }

    println!();
    println!("💰 Budgets for {}", month.format("%B %Y"));
    println!("   ─────────────────────────────────────────────────────────────");

    if budgets.is_empty() {
        println!("   No categories have a budget.");
    } else {
        println!(
            "     {:22} │ {:>10} │ {:>10} │ {:>10} │ {:>6}",
            "Category", "Budget", "Spent", "Remaining", "Used"
        );
        println!("   ─────────────────────────┼────────────┼────────────┼────────────┼────────");
        for status in &budgets {
            let icon = match status.level {
                BudgetLevel::OnTrack => "✅",
                BudgetLevel::Warning => "⚠️",
                BudgetLevel::Over => "🚨",
            };
            println!(
                "   {} {:22} │ {:>10.2} │ {:>10.2} │ {:>10.2} │ {:>5.0}%",
                icon,
                truncate(&status.name, 22),
                status.budget,
                status.spent,
                status.remaining,
                status.percent_used
            );
        }

        let total_budget: f64 = budgets.iter().map(|b| b.budget).sum();
        let total_spent: f64 = budgets.iter().map(|b| b.spent).sum();
        println!();
        println!(
            "   Total: ${:.2} of ${:.2} budgeted",
            total_spent, total_budget
        );
    }

    if !unbudgeted.is_empty() {
        println!();
        println!("   Spending without a budget:");
        for item in &unbudgeted {
            println!("   • {:22} ${:>10.2}", truncate(&item.name, 22), item.spent);
        }
    }

    Ok(())
}

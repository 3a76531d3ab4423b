//! Day-of-week report

use anyhow::{Context, Result};
use tally_core::{
    by_weekday, weekday_matrix, weekday_name, AggregateQuery, CategoryFilter, DateRange,
};

use super::core::{category_label, resolve_category, Session};
use super::reports::parse_grouping;
use super::truncate;

fn weekday_query(
    session: &Session,
    range: Option<DateRange>,
    category: Option<&str>,
) -> Result<AggregateQuery> {
    let mut query = AggregateQuery::monthly();
    if let Some(range) = range {
        query = query.with_range(range);
    }
    if let Some(category) = category {
        let id = resolve_category(&session.tree, category)?;
        query = query.with_filter(CategoryFilter::RollUp(id));
    }
    Ok(query)
}

/// Weekday totals, or a matrix grouped at `matrix_group` when given
pub fn cmd_weekdays(
    session: &Session,
    range: Option<DateRange>,
    category: Option<&str>,
    matrix_group: Option<&str>,
) -> Result<()> {
    let query = weekday_query(session, range, category)?;
    match matrix_group {
        Some(group) => print_matrix(session, query.with_grouping(parse_grouping(group)?)),
        None => print_totals(session, query),
    }
}

fn print_totals(session: &Session, query: AggregateQuery) -> Result<()> {
    let days = by_weekday(&session.snapshot.transactions, &session.tree, &query)
        .context("Weekday breakdown failed")?;

    if session.json {
        return super::print_json(&days);
    }

    println!();
    println!("📅 Spending by Weekday");
    println!("   ─────────────────────────────────────────────────────────────");

    if days.iter().all(|d| d.count == 0) {
        println!("   No transactions found.");
        return Ok(());
    }

    let busiest = days.iter().map(|d| d.expense).fold(0.0_f64, f64::max);
    println!(
        "   {:10} │ {:>10} │ {:>10} │ {:>10} │ {:>5}",
        "Day", "Expenses", "Income", "Net", "Count"
    );
    println!("   ───────────┼────────────┼────────────┼────────────┼───────");
    for day in &days {
        let marker = if busiest > 0.0 && day.expense == busiest { " ⬅" } else { "" };
        println!(
            "   {:10} │ {:>10.2} │ {:>10.2} │ {:>10.2} │ {:>5}{}",
            weekday_name(day.weekday),
            day.expense,
            day.income,
            day.total,
            day.count,
            marker
        );
    }

    Ok(())
}

fn print_matrix(session: &Session, query: AggregateQuery) -> Result<()> {
    let rows = weekday_matrix(&session.snapshot.transactions, &session.tree, &query)
        .context("Weekday breakdown failed")?;

    if session.json {
        return super::print_json(&rows);
    }

    println!();
    println!("📅 Expense by Category and Weekday");
    println!("   ─────────────────────────────────────────────────────────────");

    if rows.is_empty() {
        println!("   No spending found.");
        return Ok(());
    }

    println!(
        "   {:20} │ {:>8} │ {:>8} │ {:>8} │ {:>8} │ {:>8} │ {:>8} │ {:>8} │ {:>10}",
        "Category", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Total"
    );
    for row in &rows {
        let cells: Vec<String> = row.expense.iter().map(|v| format!("{:>8.2}", v)).collect();
        println!(
            "   {:20} │ {} │ {:>10.2}",
            truncate(&category_label(&session.tree, row.category.category_id()), 20),
            cells.join(" │ "),
            row.total
        );
    }

    Ok(())
}

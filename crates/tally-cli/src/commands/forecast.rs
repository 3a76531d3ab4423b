//! Forecast command implementations

use anyhow::{Context, Result};
use tally_core::{
    aggregate, forecast, forecast_by_category, AggregateQuery, CategoryFilter, CategoryGrouping,
    Confidence, Forecast,
};

use super::core::{category_label, resolve_category, Session};

/// Forecasts over a gap-free monthly series (empty months count as zero)
pub fn forecasts(
    session: &Session,
    horizon: usize,
    category: Option<&str>,
    by_category: bool,
) -> Result<Vec<Forecast>> {
    let mut query = AggregateQuery::monthly();
    if let Some(range) = session.series_range(None) {
        query = query.with_range(range);
    }

    let result = if by_category {
        query = query.with_grouping(CategoryGrouping::TopLevel);
        let buckets = aggregate(&session.snapshot.transactions, &session.tree, &query)?;
        forecast_by_category(&buckets, horizon)
    } else {
        if let Some(category) = category {
            let id = resolve_category(&session.tree, category)?;
            query = query.with_filter(CategoryFilter::RollUp(id));
        }
        let buckets = aggregate(&session.snapshot.transactions, &session.tree, &query)?;
        forecast(&buckets, horizon).map(|f| vec![f])
    };
    result.context("Forecast failed")
}

pub fn cmd_forecast(
    session: &Session,
    months: Option<usize>,
    category: Option<&str>,
    by_category: bool,
) -> Result<()> {
    let horizon = months.unwrap_or(session.config.forecast_horizon);
    let forecasts = forecasts(session, horizon, category, by_category)?;

    if session.json {
        return super::print_json(&forecasts);
    }

    println!();
    println!("🔮 Expense Forecast ({} months)", horizon);
    println!("   ─────────────────────────────────────────────────────────────");

    if forecasts.is_empty() {
        println!("   No category has enough monthly history to forecast.");
        return Ok(());
    }

    for fc in &forecasts {
        print_forecast(session, fc);
    }

    Ok(())
}

fn print_forecast(session: &Session, fc: &Forecast) {
    let scope = match fc.category.category_id() {
        Some(id) => category_label(&session.tree, Some(id)),
        None => "All spending".to_string(),
    };
    let confidence_icon = match fc.confidence {
        Confidence::High => "🟢",
        Confidence::Medium => "🟡",
        Confidence::Low => "🔴",
    };

    println!();
    println!("   {}", scope);
    if let Some(note) = &fc.note {
        println!("      {}", note);
        return;
    }
    println!(
        "      {} {} confidence (r² = {:.2}), {} by ${:.2}/month over {} months",
        confidence_icon,
        fc.confidence,
        fc.r_squared,
        fc.direction.as_str(),
        fc.slope.abs(),
        fc.periods_analyzed
    );
    for point in &fc.predictions {
        println!("      {:10} │ ${:>10.2}", point.period, point.amount);
    }
}

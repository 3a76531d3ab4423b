//! Report command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::{
    aggregate, compare_periods, distribution, summarize, trend, AggregateQuery, Bucket,
    CategoryFilter, CategoryGrouping, DateRange, DistributionLabel, Granularity, TrendPoint,
};

use super::core::{category_label, resolve_category, Session};
use super::truncate;

fn range_label(range: Option<&DateRange>) -> String {
    match range {
        Some(range) => range.to_string(),
        None => "all time".to_string(),
    }
}

pub fn parse_granularity(value: &str) -> Result<Granularity> {
    value.parse::<Granularity>().map_err(anyhow::Error::msg)
}

pub fn parse_grouping(value: &str) -> Result<CategoryGrouping> {
    value.parse::<CategoryGrouping>().map_err(anyhow::Error::msg)
}

pub fn cmd_summary(session: &Session, range: Option<DateRange>) -> Result<()> {
    let totals = summarize(
        session
            .snapshot
            .transactions
            .iter()
            .filter(|tx| range.map_or(true, |r| r.contains(tx.date))),
    );

    if session.json {
        return super::print_json(&totals);
    }

    println!();
    println!("📊 Summary");
    println!("   Period: {}", range_label(range.as_ref()));
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Income:       {:>12.2}", totals.income);
    println!("   Expenses:     {:>12.2}", totals.expense.abs());
    println!("   Net:          {:>12.2}", totals.net);
    println!("   Transactions: {:>12}", totals.count);

    Ok(())
}

pub struct AggregateArgs<'a> {
    pub granularity: &'a str,
    pub range: Option<DateRange>,
    pub category: Option<&'a str>,
    pub rollup: bool,
    pub uncategorized: bool,
    pub group: Option<&'a str>,
}

pub fn cmd_aggregate(session: &Session, args: AggregateArgs<'_>) -> Result<()> {
    let mut query = AggregateQuery::new(parse_granularity(args.granularity)?);
    if let Some(range) = args.range {
        query = query.with_range(range);
    }
    if args.uncategorized {
        query = query.with_filter(CategoryFilter::Uncategorized);
    } else if let Some(category) = args.category {
        let id = resolve_category(&session.tree, category)?;
        query = query.with_filter(if args.rollup {
            CategoryFilter::RollUp(id)
        } else {
            CategoryFilter::Exact(id)
        });
    }
    if let Some(group) = args.group {
        query = query.with_grouping(parse_grouping(group)?);
    }

    let buckets = aggregate(&session.snapshot.transactions, &session.tree, &query)
        .context("Aggregation failed")?;

    if session.json {
        return super::print_json(&buckets);
    }

    println!();
    println!("🗓️  Totals by {}", query.granularity);
    println!("   Period: {}", range_label(query.range.as_ref()));
    println!("   ─────────────────────────────────────────────────────────────");

    if buckets.is_empty() {
        println!("   No transactions found.");
        return Ok(());
    }

    println!(
        "   {:10} │ {:22} │ {:>10} │ {:>10} │ {:>10} │ {:>5}",
        "Period", "Category", "Income", "Expenses", "Net", "Count"
    );
    println!("   ───────────┼────────────────────────┼────────────┼────────────┼────────────┼───────");

    for bucket in &buckets {
        println!(
            "   {:10} │ {:22} │ {:>10.2} │ {:>10.2} │ {:>10.2} │ {:>5}",
            bucket.period,
            truncate(&bucket_scope(session, bucket), 22),
            bucket.income_total,
            bucket.expense_magnitude(),
            bucket.total,
            bucket.count
        );
    }

    Ok(())
}

fn bucket_scope(session: &Session, bucket: &Bucket) -> String {
    match bucket.category {
        tally_core::CategoryKey::All => "All".to_string(),
        key => category_label(&session.tree, key.category_id()),
    }
}

/// Trend points over a gap-free series (empty periods count as zero)
pub fn trend_points(
    session: &Session,
    granularity: &str,
    range: Option<DateRange>,
    category: Option<&str>,
    window: usize,
) -> Result<Vec<TrendPoint>> {
    let mut query = AggregateQuery::new(parse_granularity(granularity)?);
    if let Some(range) = session.series_range(range) {
        query = query.with_range(range);
    }
    if let Some(category) = category {
        let id = resolve_category(&session.tree, category)?;
        query = query.with_filter(CategoryFilter::RollUp(id));
    }

    let buckets = aggregate(&session.snapshot.transactions, &session.tree, &query)?;
    trend(&buckets, window).context("Trend analysis failed")
}

pub fn cmd_trend(
    session: &Session,
    granularity: &str,
    range: Option<DateRange>,
    category: Option<&str>,
    window: Option<usize>,
) -> Result<()> {
    let window = window.unwrap_or(session.config.trend_window);
    let points = trend_points(session, granularity, range, category, window)?;
    let granularity = parse_granularity(granularity)?;
    let range = session.series_range(range);

    if session.json {
        return super::print_json(&points);
    }

    println!();
    println!("📈 Trend ({}, window {})", granularity, window);
    if let Some(category) = category {
        println!("   Category: {}", category);
    }
    println!("   Period: {}", range_label(range.as_ref()));
    println!("   ─────────────────────────────────────────────────────────────");

    if points.is_empty() {
        println!("   Not enough periods for a trend.");
        return Ok(());
    }

    println!(
        "   {:10} │ {:>10} │ {:>10} │ {:>8} │ {:>10} │ {:>10}",
        "Period", "Net", "Change", "%", "Mean", "Std Dev"
    );
    println!("   ───────────┼────────────┼────────────┼──────────┼────────────┼────────────");

    for point in &points {
        println!(
            "   {:10} │ {:>10.2} │ {:>+10.2} │ {:>8} │ {:>10.2} │ {:>10.2}",
            point.period,
            point.total,
            point.delta.absolute,
            point.delta.percent.to_string(),
            point.rolling_mean,
            point.rolling_stddev
        );
    }

    Ok(())
}

pub fn cmd_distribution(
    session: &Session,
    range: Option<DateRange>,
    group: &str,
    min_share: Option<f64>,
) -> Result<()> {
    let min_share = min_share.unwrap_or(session.config.min_share_percent);
    let mut query = AggregateQuery::monthly().with_grouping(parse_grouping(group)?);
    if let Some(range) = range {
        query = query.with_range(range);
    }

    let buckets = aggregate(&session.snapshot.transactions, &session.tree, &query)?;
    let entries = distribution(&buckets, min_share).context("Distribution failed")?;

    if session.json {
        return super::print_json(&entries);
    }

    println!();
    println!("🥧 Spending Distribution");
    println!("   Period: {}", range_label(query.range.as_ref()));
    println!("   ─────────────────────────────────────────────────────────────");

    if entries.is_empty() {
        println!("   No spending found in this period.");
        return Ok(());
    }

    let total: f64 = entries.iter().map(|e| e.amount).sum();
    println!("   Total: ${:.2}", total);
    println!();
    println!(
        "   {:3} │ {:28} │ {:>10} │ {:>6} │ {:>5}",
        "#", "Category", "Amount", "%", "Count"
    );
    println!("   ────┼──────────────────────────────┼────────────┼────────┼───────");

    for entry in &entries {
        let name = match &entry.label {
            DistributionLabel::Category { key, .. } => category_label(&session.tree, key.category_id()),
            DistributionLabel::Other { collapsed } => format!("Other ({} categories)", collapsed),
        };
        println!(
            "   {:>3} │ {:28} │ {:>10.2} │ {:>5.1}% │ {:>5}",
            entry.rank,
            truncate(&name, 28),
            entry.amount,
            entry.share_percent,
            entry.transaction_count
        );
    }

    Ok(())
}

pub fn cmd_compare(
    session: &Session,
    month: NaiveDate,
    against: Option<NaiveDate>,
    group: &str,
) -> Result<()> {
    let current = DateRange::month_of(month);
    let previous = match against {
        Some(date) => DateRange::month_of(date),
        None => {
            let before = current.start.pred_opt().context("Date out of range")?;
            DateRange::month_of(before)
        }
    };

    let cmp = compare_periods(
        &session.snapshot.transactions,
        &session.tree,
        current,
        previous,
        parse_grouping(group)?,
    )
    .context("Comparison failed")?;

    if session.json {
        return super::print_json(&cmp);
    }

    println!();
    println!("⚖️  Period Comparison");
    println!("   Current:  {}", cmp.current.range);
    println!("   Previous: {}", cmp.previous.range);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:10} │ {:>10} │ {:>10} │ {:>10} │ {:>8}",
        "", "Previous", "Current", "Change", "%"
    );
    println!("   ───────────┼────────────┼────────────┼────────────┼──────────");
    for (label, previous, current, delta) in [
        ("Income", cmp.previous.income, cmp.current.income, &cmp.income),
        ("Expenses", cmp.previous.expense, cmp.current.expense, &cmp.expense),
        ("Net", cmp.previous.net, cmp.current.net, &cmp.net),
    ] {
        println!(
            "   {:10} │ {:>10.2} │ {:>10.2} │ {:>+10.2} │ {:>8}",
            label,
            previous,
            current,
            delta.absolute,
            delta.percent.to_string()
        );
    }

    if cmp.categories.is_empty() {
        return Ok(());
    }

    println!();
    println!("   Expense by category:");
    println!(
        "   {:24} │ {:>10} │ {:>10} │ {:>10} │ {:>8}",
        "Category", "Previous", "Current", "Change", "%"
    );
    println!("   ─────────────────────────┼────────────┼────────────┼────────────┼──────────");
    for row in &cmp.categories {
        println!(
            "   {:24} │ {:>10.2} │ {:>10.2} │ {:>+10.2} │ {:>8}{}",
            truncate(&category_label(&session.tree, row.key.category_id()), 24),
            row.previous,
            row.current,
            row.change.absolute,
            row.change.percent.to_string(),
            if row.notable_increase { " ⚠️" } else { "" }
        );
    }

    let increases: Vec<_> = cmp.increases().collect();
    if !increases.is_empty() {
        println!();
        println!("   ⚠️  Spending increases:");
        for row in increases {
            println!(
                "      {} is up {} ({:.2} → {:.2})",
                category_label(&session.tree, row.key.category_id()),
                row.change.percent,
                row.previous,
                row.current
            );
        }
    }

    Ok(())
}

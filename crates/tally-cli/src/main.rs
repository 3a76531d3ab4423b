//! Tally CLI - Spending analytics for exported expense data
//!
//! Usage:
//!   tally -s export.csv summary              Income, expense and net totals
//!   tally -s tally.json trend -c Food        Month-over-month trend for a category
//!   tally anomalies -k 2.5                   Flag unusual transactions
//!   tally budgets --month 2024-02            Budget status for a month
//!   tally weekdays --by-category             Spending by day of week

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let session = commands::open_session(&cli.snapshot, cli.config.as_deref(), cli.json)?;
    debug!(
        snapshot = %cli.snapshot.display(),
        transactions = session.snapshot.transactions.len(),
        categories = session.tree.len(),
        "Snapshot loaded"
    );

    match cli.command {
        Commands::Summary { period } => {
            commands::cmd_summary(&session, commands::resolve_period(&period)?)
        }
        Commands::Aggregate {
            granularity,
            period,
            category,
            rollup,
            uncategorized,
            group,
        } => commands::cmd_aggregate(
            &session,
            commands::AggregateArgs {
                granularity: &granularity,
                range: commands::resolve_period(&period)?,
                category: category.as_deref(),
                rollup,
                uncategorized,
                group: group.as_deref(),
            },
        ),
        Commands::Trend {
            granularity,
            period,
            category,
            window,
        } => commands::cmd_trend(
            &session,
            &granularity,
            commands::resolve_period(&period)?,
            category.as_deref(),
            window,
        ),
        Commands::Distribution {
            period,
            group,
            min_share,
        } => commands::cmd_distribution(
            &session,
            commands::resolve_period(&period)?,
            &group,
            min_share,
        ),
        Commands::Weekdays {
            period,
            category,
            by_category,
            group,
        } => commands::cmd_weekdays(
            &session,
            commands::resolve_period(&period)?,
            category.as_deref(),
            by_category.then_some(group.as_str()),
        ),
        Commands::Anomalies {
            category,
            k,
            min_samples,
            frequency,
        } => commands::cmd_anomalies(&session, category.as_deref(), k, min_samples, frequency),
        Commands::Compare {
            month,
            against,
            group,
        } => {
            let month = match month {
                Some(m) => commands::parse_month(&m)?,
                None => session.latest_month(),
            };
            let against = against.as_deref().map(commands::parse_month).transpose()?;
            commands::cmd_compare(&session, month, against, &group)
        }
        Commands::Forecast {
            months,
            category,
            by_category,
        } => commands::cmd_forecast(&session, months, category.as_deref(), by_category),
        Commands::Budgets { month } => {
            let month = match month {
                Some(m) => commands::parse_month(&m)?,
                None => session.latest_month(),
            };
            commands::cmd_budgets(&session, month)
        }
        Commands::Recurring => commands::cmd_recurring(&session),
        Commands::Categories => commands::cmd_categories(&session),
    }
}

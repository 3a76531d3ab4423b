//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tally - Understand where your money goes
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Spending analytics for exported expense data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Snapshot file: JSON snapshot or CSV export
    #[arg(short, long, default_value = "tally.json", global = true)]
    pub snapshot: PathBuf,

    /// Analytics config override (TOML)
    ///
    /// Defaults to <data dir>/tally/analytics.toml when present,
    /// otherwise the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Date range selection shared by report commands
#[derive(Args, Debug, Clone)]
pub struct PeriodArgs {
    /// Time period: all, this-month, last-month, this-year, last-30-days, last-90-days, last-12-months
    #[arg(long, default_value = "all")]
    pub period: String,

    /// Custom start date (YYYY-MM-DD) - overrides period
    #[arg(long)]
    pub from: Option<String>,

    /// Custom end date (YYYY-MM-DD) - overrides period
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Income, expense and net totals
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Totals per time bucket
    Aggregate {
        /// Bucket size: day, month, year
        #[arg(short, long, default_value = "month")]
        granularity: String,

        #[command(flatten)]
        period: PeriodArgs,

        /// Restrict to a category (path like "Food > Groceries" or id)
        #[arg(short, long)]
        category: Option<String>,

        /// Include the category's subcategories
        #[arg(long, requires = "category")]
        rollup: bool,

        /// Restrict to uncategorized transactions
        #[arg(long, conflicts_with = "category")]
        uncategorized: bool,

        /// Break buckets down by category: leaf, top-level, with-ancestors
        #[arg(long)]
        group: Option<String>,
    },

    /// Period-over-period changes with rolling statistics
    Trend {
        /// Bucket size: day, month, year
        #[arg(short, long, default_value = "month")]
        granularity: String,

        #[command(flatten)]
        period: PeriodArgs,

        /// Restrict to a category (subcategories included)
        #[arg(short, long)]
        category: Option<String>,

        /// Rolling window in periods (defaults to config)
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Category share of expense
    Distribution {
        #[command(flatten)]
        period: PeriodArgs,

        /// Category level: leaf, top-level, with-ancestors
        #[arg(long, default_value = "top-level")]
        group: String,

        /// Collapse categories below this percent into "Other" (defaults to config)
        #[arg(long)]
        min_share: Option<f64>,
    },

    /// Spending by day of week
    Weekdays {
        #[command(flatten)]
        period: PeriodArgs,

        /// Restrict to a category (subcategories included)
        #[arg(short, long)]
        category: Option<String>,

        /// Show a category × weekday expense matrix
        #[arg(long)]
        by_category: bool,

        /// Matrix category level: leaf, top-level, with-ancestors
        #[arg(long, default_value = "top-level")]
        group: String,
    },

    /// Flag unusual transactions
    Anomalies {
        /// Only this category (all categories when omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Standard deviations before flagging (defaults to config)
        #[arg(short)]
        k: Option<f64>,

        /// Minimum history size (defaults to config)
        #[arg(long)]
        min_samples: Option<usize>,

        /// Also flag days with unusually many transactions
        #[arg(long)]
        frequency: bool,
    },

    /// Compare two months
    Compare {
        /// Month to examine (YYYY-MM, defaults to the latest month in the snapshot)
        #[arg(long)]
        month: Option<String>,

        /// Month to compare against (YYYY-MM, defaults to the month before)
        #[arg(long)]
        against: Option<String>,

        /// Category level: leaf, top-level, with-ancestors
        #[arg(long, default_value = "top-level")]
        group: String,
    },

    /// Project monthly expense forward
    Forecast {
        /// Months to project (defaults to config)
        #[arg(short, long)]
        months: Option<usize>,

        /// Forecast a single category (subcategories included)
        #[arg(short, long, conflicts_with = "by_category")]
        category: Option<String>,

        /// Forecast every category with enough history
        #[arg(long)]
        by_category: bool,
    },

    /// Spending against category budgets
    Budgets {
        /// Month to check (YYYY-MM, defaults to the latest month in the snapshot)
        #[arg(long)]
        month: Option<String>,
    },

    /// Detect recurring payments such as subscriptions
    Recurring,

    /// Show the category tree
    Categories,
}

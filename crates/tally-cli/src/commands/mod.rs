//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Session loading and shared argument helpers
//! - `reports` - Summary, aggregate, trend, distribution and compare reports
//! - `anomalies` - Unusual transaction and busy-day detection
//! - `forecast` - Monthly expense projections
//! - `budgets` - Budget status and unbudgeted spending
//! - `recurring` - Recurring payment detection
//! - `categories` - Category tree listing
//! - `weekdays` - Day-of-week breakdowns

pub mod anomalies;
pub mod budgets;
pub mod categories;
pub mod core;
pub mod forecast;
pub mod recurring;
pub mod reports;
pub mod weekdays;

// Re-export command functions for main.rs
pub use anomalies::*;
pub use budgets::*;
pub use categories::*;
pub use core::*;
pub use forecast::*;
pub use recurring::*;
pub use reports::*;
pub use weekdays::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

//! Recurring payment command implementations

use anyhow::{Context, Result};
use tally_core::detect_recurring;

use super::core::{category_label, Session};
use super::truncate;

pub fn cmd_recurring(session: &Session) -> Result<()> {
    let params = &session.config.recurring;
    let candidates = detect_recurring(&session.snapshot.transactions, params)
        .context("Recurring payment detection failed")?;

    if session.json {
        return super::print_json(&candidates);
    }

    println!();
    println!("🔁 Recurring Payments");
    println!("   ─────────────────────────────────────────────────────────────");

    if candidates.is_empty() {
        println!(
            "   None found (needs {}+ similar charges {:.0}-{:.0} days apart).",
            params.min_occurrences, params.min_interval_days, params.max_interval_days
        );
        return Ok(());
    }

    for candidate in &candidates {
        let next = candidate
            .next_expected
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "   {:24} │ ${:>8.2} │ every {:>4.1} days │ {:>2}x │ next {}",
            truncate(&candidate.description, 24),
            candidate.average_amount,
            candidate.average_interval_days,
            candidate.occurrences,
            next
        );
        println!(
            "   {:24} │ {} since {}",
            "",
            category_label(&session.tree, candidate.category_id),
            candidate.first_seen
        );
    }

    let monthly: f64 = candidates.iter().map(|c| c.average_amount).sum();
    println!();
    println!("   Total: ${:.2}/month", monthly);

    Ok(())
}

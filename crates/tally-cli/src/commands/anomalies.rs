//! Anomaly command implementations

use anyhow::{Context, Result};
use serde::Serialize;
use tally_core::{
    detect_all_anomalies, detect_anomalies, detect_frequency_anomalies, AnomalyFlag,
    AnomalyParams, FrequencyFlag,
};

use super::core::{category_label, resolve_category, Session};
use super::truncate;

#[derive(Serialize)]
struct AnomalyReport<'a> {
    params: &'a AnomalyParams,
    transactions: &'a [AnomalyFlag],
    #[serde(skip_serializing_if = "Option::is_none")]
    busy_days: Option<&'a [FrequencyFlag]>,
}

pub fn cmd_anomalies(
    session: &Session,
    category: Option<&str>,
    k: Option<f64>,
    min_samples: Option<usize>,
    frequency: bool,
) -> Result<()> {
    let defaults = session.config.anomaly;
    let params = AnomalyParams::new(
        k.unwrap_or(defaults.k),
        min_samples.unwrap_or(defaults.min_samples),
    );
    let transactions = &session.snapshot.transactions;

    let flags = match category {
        Some(category) => {
            let id = resolve_category(&session.tree, category)?;
            detect_anomalies(transactions, &session.tree, id, &params)
        }
        None => detect_all_anomalies(transactions, &params),
    }
    .context("Anomaly detection failed")?;

    let busy_days = if frequency {
        Some(detect_frequency_anomalies(transactions, &params)?)
    } else {
        None
    };

    if session.json {
        return super::print_json(&AnomalyReport {
            params: &params,
            transactions: &flags,
            busy_days: busy_days.as_deref(),
        });
    }

    println!();
    println!("🔍 Unusual Transactions (k = {}, min samples = {})", params.k, params.min_samples);
    println!("   ─────────────────────────────────────────────────────────────");

    if flags.is_empty() {
        println!("   Nothing unusual found.");
    } else {
        println!(
            "   {:>6} │ {:10} │ {:22} │ {:>10} │ {:>7} │ {:>10}",
            "ID", "Date", "Category", "Amount", "Score", "Typical"
        );
        println!("   ───────┼────────────┼────────────────────────┼────────────┼─────────┼────────────");
        for flag in &flags {
            println!(
                "   {:>6} │ {:10} │ {:22} │ {:>10.2} │ {:>+7.2} │ {:>10.2}",
                flag.transaction_id,
                flag.date,
                truncate(&category_label(&session.tree, flag.category_id), 22),
                flag.amount,
                flag.score,
                flag.history_mean
            );
        }
        println!();
        println!("   {} flagged", flags.len());
    }

    if let Some(days) = &busy_days {
        println!();
        println!("📅 Busy Days");
        println!("   ─────────────────────────────────────────────────────────────");
        if days.is_empty() {
            println!("   No unusually busy days.");
        }
        for day in days {
            println!(
                "   {} │ {:>3} transactions │ typical {:.1} │ threshold {:.1}",
                day.date, day.count, day.average, day.threshold
            );
        }
    }

    Ok(())
}

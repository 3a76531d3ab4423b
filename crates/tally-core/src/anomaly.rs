//! Anomaly Detector
//!
//! Scores transactions against the history of their own category and flags
//! statistical outliers. Every transaction is judged against a history that
//! excludes itself (leave-one-out); including the target would pull the mean
//! toward it and hide outliers in small samples.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categories::CategoryTree;
use crate::error::{Error, Result};
use crate::models::{AnomalyFlag, AnomalyReason, FrequencyFlag, Transaction};
use crate::stats::Summary;

/// Detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyParams {
    /// Standard deviations from the mean before a value is flagged
    pub k: f64,
    /// Minimum history size; smaller histories never flag
    pub min_samples: usize,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            k: 2.0,
            min_samples: 5,
        }
    }
}

impl AnomalyParams {
    pub fn new(k: f64, min_samples: usize) -> Self {
        Self { k, min_samples }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() || self.k < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "k must be a non-negative number, got {}",
                self.k
            )));
        }
        if self.min_samples == 0 {
            return Err(Error::InvalidParameter(
                "min_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where a value sits relative to a history
struct Verdict {
    reason: AnomalyReason,
    /// Deviation in standard deviations (or mean multiples for flat histories)
    score: f64,
}

/// Spread at or below this fraction of the mean counts as a flat history
const FLAT_TOLERANCE: f64 = 1e-6;

/// Compare a non-negative value against the summary of its peers
fn judge(value: f64, history: &Summary, params: &AnomalyParams) -> Option<Verdict> {
    if history.count < params.min_samples {
        return None;
    }

    let stddev = history.stddev();
    if stddev > history.mean.abs() * FLAT_TOLERANCE {
        let upper = history.mean + params.k * stddev;
        let lower = history.mean - params.k * stddev;
        let reason = if value > upper {
            AnomalyReason::ExceedsCategoryNorm
        } else if lower > 0.0 && value < lower {
            AnomalyReason::BelowCategoryNorm
        } else {
            return None;
        };
        Some(Verdict {
            reason,
            score: (value - history.mean) / stddev,
        })
    } else if history.mean > 0.0 && value > history.mean && value > history.mean * params.k {
        Some(Verdict {
            reason: AnomalyReason::ExceedsFlatHistory,
            score: (value - history.mean) / history.mean,
        })
    } else {
        None
    }
}

fn flag(target: &Transaction, history: &Summary, params: &AnomalyParams) -> Option<AnomalyFlag> {
    let verdict = judge(target.magnitude(), history, params)?;
    // Scores are judged on magnitudes; re-sign them so an unusually large
    // expense reads as a large negative deviation
    let sign = if target.is_expense() { -1.0 } else { 1.0 };
    Some(AnomalyFlag {
        transaction_id: target.id,
        category_id: target.category_id,
        date: target.date,
        amount: target.amount,
        score: sign * verdict.score,
        reason: verdict.reason,
        history_mean: history.mean,
        history_stddev: history.stddev(),
        sample_size: history.count,
    })
}

/// Decide whether `target` is unusual given its category history
///
/// Entries of `history` sharing the target's id are ignored.
pub fn evaluate(
    target: &Transaction,
    history: &[Transaction],
    params: &AnomalyParams,
) -> Result<Option<AnomalyFlag>> {
    params.validate()?;
    let summary = Summary::from_values(
        history
            .iter()
            .filter(|tx| tx.id != target.id)
            .map(Transaction::magnitude),
    );
    Ok(flag(target, &summary, params))
}

/// Leave-one-out evaluation of every member of one category group
///
/// Each history is summarized from the other members in group order, so a
/// batch verdict is bit-identical to `evaluate` on the same data.
fn flag_group(members: &[&Transaction], params: &AnomalyParams) -> Vec<AnomalyFlag> {
    members
        .iter()
        .filter_map(|tx| {
            let others = Summary::from_values(
                members
                    .iter()
                    .filter(|other| other.id != tx.id)
                    .map(|other| other.magnitude()),
            );
            flag(tx, &others, params)
        })
        .collect()
}

fn sort_flags(flags: &mut [AnomalyFlag]) {
    flags.sort_by(|a, b| {
        b.score
            .abs()
            .total_cmp(&a.score.abs())
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });
}

/// Flag outliers within one category, each judged against all the others
pub fn detect_anomalies(
    transactions: &[Transaction],
    tree: &CategoryTree,
    category_id: i64,
    params: &AnomalyParams,
) -> Result<Vec<AnomalyFlag>> {
    params.validate()?;
    tree.require(category_id)?;

    let members: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.category_id == Some(category_id))
        .collect();

    let mut flags = flag_group(&members, params);
    sort_flags(&mut flags);

    debug!(
        category_id,
        sample = members.len(),
        flagged = flags.len(),
        k = params.k,
        "Anomaly detection complete"
    );
    Ok(flags)
}

/// Run category anomaly detection over every category, uncategorized included
pub fn detect_all_anomalies(
    transactions: &[Transaction],
    params: &AnomalyParams,
) -> Result<Vec<AnomalyFlag>> {
    params.validate()?;

    let mut groups: BTreeMap<Option<i64>, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups.entry(tx.category_id).or_default().push(tx);
    }

    let mut flags: Vec<AnomalyFlag> = groups
        .values()
        .flat_map(|members| flag_group(members, params))
        .collect();
    sort_flags(&mut flags);

    debug!(
        groups = groups.len(),
        flagged = flags.len(),
        "Anomaly detection complete for all categories"
    );
    Ok(flags)
}

/// Flag days with unusually many transactions compared to the other active days
pub fn detect_frequency_anomalies(
    transactions: &[Transaction],
    params: &AnomalyParams,
) -> Result<Vec<FrequencyFlag>> {
    params.validate()?;

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for tx in transactions {
        *per_day.entry(tx.date).or_default() += 1;
    }

    let full = Summary::from_values(per_day.values().map(|&c| c as f64));
    let flags: Vec<FrequencyFlag> = per_day
        .iter()
        .filter_map(|(&date, &count)| {
            let others = full.without(count as f64);
            let verdict = judge(count as f64, &others, params)?;
            if verdict.reason == AnomalyReason::BelowCategoryNorm {
                return None;
            }
            let threshold = if verdict.reason == AnomalyReason::ExceedsFlatHistory {
                others.mean * params.k.max(1.0)
            } else {
                others.mean + params.k * others.stddev()
            };
            Some(FrequencyFlag {
                date,
                count,
                threshold,
                average: others.mean,
                score: verdict.score,
            })
        })
        .collect();

    debug!(
        active_days = per_day.len(),
        flagged = flags.len(),
        "Frequency anomaly detection complete"
    );
    Ok(flags)
}

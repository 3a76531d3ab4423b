//! Distribution Analyzer
//!
//! Expense share per category for one period or a whole range. Income never
//! enters the denominator.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Bucket, CategoryKey, DistributionEntry, DistributionLabel};

/// Default collapse threshold, in percent
pub const DEFAULT_MIN_SHARE_PERCENT: f64 = 1.0;

#[derive(Debug, Default)]
struct Share {
    name: Option<String>,
    amount: f64,
    count: usize,
}

/// Rank categories by share of total expense
///
/// Buckets spanning several periods are summed per category first.
/// Categories whose share is below `min_share_percent` collapse into a
/// single `Other` entry appended after the named entries.
pub fn distribution(buckets: &[Bucket], min_share_percent: f64) -> Result<Vec<DistributionEntry>> {
    if !min_share_percent.is_finite() || !(0.0..=100.0).contains(&min_share_percent) {
        return Err(Error::InvalidParameter(format!(
            "minimum share must be between 0 and 100 percent, got {}",
            min_share_percent
        )));
    }
    if buckets.iter().any(|b| b.category == CategoryKey::All) {
        return Err(Error::InvalidParameter(
            "distribution needs category-keyed buckets".into(),
        ));
    }

    let mut shares: BTreeMap<CategoryKey, Share> = BTreeMap::new();
    for bucket in buckets {
        let share = shares.entry(bucket.category).or_default();
        if share.name.is_none() {
            share.name = bucket.category_name.clone();
        }
        share.amount += bucket.expense_magnitude();
        share.count += bucket.count;
    }
    shares.retain(|_, share| share.amount > 0.0);

    let total: f64 = shares.values().map(|s| s.amount).sum();
    if total <= 0.0 {
        debug!(buckets = buckets.len(), "No expense to distribute");
        return Ok(vec![]);
    }

    let mut named: Vec<(CategoryKey, Share, f64)> = Vec::new();
    let mut other_amount = 0.0;
    let mut other_count = 0;
    let mut collapsed = 0;

    for (key, share) in shares {
        let percent = share.amount / total * 100.0;
        if percent < min_share_percent {
            other_amount += share.amount;
            other_count += share.count;
            collapsed += 1;
        } else {
            named.push((key, share, percent));
        }
    }

    // Stable sort keeps category-key order among equal shares
    named.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut entries: Vec<DistributionEntry> = named
        .into_iter()
        .map(|(key, share, percent)| DistributionEntry {
            rank: 0,
            label: DistributionLabel::Category {
                key,
                name: share.name,
            },
            amount: share.amount,
            share_percent: percent,
            transaction_count: share.count,
        })
        .collect();

    if collapsed > 0 {
        entries.push(DistributionEntry {
            rank: 0,
            label: DistributionLabel::Other { collapsed },
            amount: other_amount,
            share_percent: other_amount / total * 100.0,
            transaction_count: other_count,
        });
    }

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    debug!(
        entries = entries.len(),
        collapsed,
        total_expense = total,
        "Distribution computed"
    );
    Ok(entries)
}

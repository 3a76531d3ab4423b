//! Trend Analyzer
//!
//! Period-over-period deltas plus rolling mean and standard deviation over a
//! bucket series produced by the aggregator.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Bucket, Delta, PercentChange, TrendPoint};
use crate::stats;

/// Default rolling window, in periods
pub const DEFAULT_WINDOW: usize = 3;

/// Compute a trend point for every bucket after the first
///
/// The buckets must form one series (a single category key) ordered by
/// period. Fewer than two buckets yield an empty trend.
pub fn trend(buckets: &[Bucket], window: usize) -> Result<Vec<TrendPoint>> {
    if window == 0 {
        return Err(Error::InvalidParameter(
            "trend window must be at least 1".into(),
        ));
    }

    let scopes: BTreeSet<_> = buckets.iter().map(|b| b.category).collect();
    if scopes.len() > 1 {
        return Err(Error::InvalidParameter(format!(
            "trend needs a single-scope series, got {} category keys",
            scopes.len()
        )));
    }

    if buckets.len() < 2 {
        debug!(buckets = buckets.len(), "Not enough points for a trend");
        return Ok(vec![]);
    }

    let totals: Vec<f64> = buckets.iter().map(|b| b.total).collect();

    let points: Vec<TrendPoint> = buckets
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = i + 1;
            let absolute = current.total - previous.total;

            let rolling_window = window.min(index + 1);
            let history = &totals[index + 1 - rolling_window..=index];

            TrendPoint {
                period: current.period.clone(),
                period_start: current.period_start,
                total: current.total,
                previous_total: previous.total,
                delta: Delta {
                    absolute,
                    percent: PercentChange::between(previous.total, absolute),
                },
                rolling_mean: stats::mean(history),
                rolling_stddev: stats::stddev(history),
                rolling_window,
            }
        })
        .collect();

    debug!(points = points.len(), window, "Trend computed");
    Ok(points)
}

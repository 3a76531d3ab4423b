//! Expense Forecast
//!
//! Projects monthly expense forward with a least-squares line over the
//! expense magnitude of a bucket series. Confidence comes from the fit's R².

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Bucket, CategoryKey, Granularity};
use crate::stats::LinearFit;

/// Fewer points than this yield no predictions
pub const MIN_HISTORY: usize = 3;

/// Default number of months projected
pub const DEFAULT_HORIZON: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared > 0.7 {
            Self::High
        } else if r_squared < 0.3 {
            Self::Low
        } else {
            Self::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Self::Increasing
        } else if slope < 0.0 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Stable => "stable",
            Self::Decreasing => "decreasing",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Projected expense for one future month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: String,
    pub period_start: NaiveDate,
    /// Expense magnitude, never negative
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub category: CategoryKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub predictions: Vec<ForecastPoint>,
    pub confidence: Confidence,
    pub r_squared: f64,
    /// Change in expense per month
    pub slope: f64,
    pub direction: TrendDirection,
    pub periods_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn check_horizon(periods_ahead: usize) -> Result<()> {
    if periods_ahead == 0 {
        return Err(Error::InvalidParameter(
            "forecast horizon must be at least 1 period".into(),
        ));
    }
    Ok(())
}

/// Fit one series; the caller guarantees a single category key
fn project(category: CategoryKey, buckets: &[&Bucket], periods_ahead: usize) -> Forecast {
    let category_name = buckets.iter().find_map(|b| b.category_name.clone());
    let ys: Vec<f64> = buckets.iter().map(|b| b.expense_magnitude()).collect();

    let fit = match LinearFit::fit(&ys) {
        Some(fit) if ys.len() >= MIN_HISTORY => fit,
        _ => {
            return Forecast {
                category,
                category_name,
                predictions: vec![],
                confidence: Confidence::Low,
                r_squared: 0.0,
                slope: 0.0,
                direction: TrendDirection::Stable,
                periods_analyzed: ys.len(),
                note: Some(format!(
                    "Need at least {} months of data for a forecast",
                    MIN_HISTORY
                )),
            };
        }
    };

    let mut predictions = Vec::with_capacity(periods_ahead);
    let mut cursor = buckets.last().map(|b| b.period_start);
    for step in 0..periods_ahead {
        let Some(start) = cursor.and_then(|d| Granularity::Month.next_period_start(d)) else {
            break;
        };
        let x = (ys.len() + step) as f64;
        predictions.push(ForecastPoint {
            period: Granularity::Month.label(start),
            period_start: start,
            amount: fit.predict(x).max(0.0),
        });
        cursor = Some(start);
    }

    Forecast {
        category,
        category_name,
        predictions,
        confidence: Confidence::from_r_squared(fit.r_squared),
        r_squared: fit.r_squared,
        slope: fit.slope,
        direction: TrendDirection::from_slope(fit.slope),
        periods_analyzed: ys.len(),
        note: None,
    }
}

/// Forecast a single-scope monthly series `periods_ahead` months forward
pub fn forecast(buckets: &[Bucket], periods_ahead: usize) -> Result<Forecast> {
    check_horizon(periods_ahead)?;

    let mut keys = buckets.iter().map(|b| b.category);
    let category = keys.next().unwrap_or(CategoryKey::All);
    if keys.any(|key| key != category) {
        return Err(Error::InvalidParameter(
            "forecast needs a single-scope series; use forecast_by_category".into(),
        ));
    }

    let series: Vec<&Bucket> = buckets.iter().collect();
    let result = project(category, &series, periods_ahead);

    debug!(
        points = series.len(),
        periods_ahead,
        confidence = %result.confidence,
        "Forecast computed"
    );
    Ok(result)
}

/// Forecast every category of a category-keyed series that has enough history
///
/// Categories without any expense are skipped.
pub fn forecast_by_category(buckets: &[Bucket], periods_ahead: usize) -> Result<Vec<Forecast>> {
    check_horizon(periods_ahead)?;

    let mut series: BTreeMap<CategoryKey, Vec<&Bucket>> = BTreeMap::new();
    for bucket in buckets {
        series.entry(bucket.category).or_default().push(bucket);
    }

    let forecasts: Vec<Forecast> = series
        .into_iter()
        .filter(|(_, points)| {
            points.len() >= MIN_HISTORY && points.iter().any(|b| b.expense_magnitude() > 0.0)
        })
        .map(|(key, points)| project(key, &points, periods_ahead))
        .collect();

    debug!(
        categories = forecasts.len(),
        periods_ahead,
        "Category forecasts computed"
    );
    Ok(forecasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateQuery, CategoryGrouping};
    use crate::test_utils::*;

    const EPS: f64 = 1e-9;

    fn expense_bucket(month: u32, expense: f64) -> Bucket {
        let start = date(2024, month, 1);
        Bucket {
            period: Granularity::Month.label(start),
            period_start: start,
            category: CategoryKey::All,
            category_name: None,
            total: -expense,
            expense_total: -expense,
            income_total: 0.0,
            count: 1,
            mean: -expense,
            running_total: 0.0,
        }
    }

    #[test]
    fn test_linear_growth_projects_forward() {
        let buckets = vec![
            expense_bucket(1, 100.0),
            expense_bucket(2, 200.0),
            expense_bucket(3, 300.0),
        ];
        let result = forecast(&buckets, 2).unwrap();

        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.predictions[0].period, "2024-04");
        assert!((result.predictions[0].amount - 400.0).abs() < EPS);
        assert_eq!(result.predictions[1].period, "2024-05");
        assert!((result.predictions[1].amount - 500.0).abs() < EPS);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.direction, TrendDirection::Increasing);
        assert!(result.note.is_none());
    }

    #[test]
    fn test_predictions_clamped_at_zero() {
        let buckets = vec![
            expense_bucket(1, 300.0),
            expense_bucket(2, 200.0),
            expense_bucket(3, 100.0),
        ];
        let result = forecast(&buckets, 3).unwrap();

        assert_eq!(result.direction, TrendDirection::Decreasing);
        assert!(result.predictions.iter().all(|p| p.amount == 0.0));
    }

    #[test]
    fn test_short_history_gives_low_confidence_note() {
        let buckets = vec![expense_bucket(1, 100.0), expense_bucket(2, 120.0)];
        let result = forecast(&buckets, 3).unwrap();

        assert!(result.predictions.is_empty());
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.periods_analyzed, 2);
        assert!(result.note.is_some());

        assert!(forecast(&[], 3).unwrap().predictions.is_empty());
    }

    #[test]
    fn test_flat_series_is_stable_low_confidence() {
        let buckets = vec![
            expense_bucket(1, 50.0),
            expense_bucket(2, 50.0),
            expense_bucket(3, 50.0),
        ];
        let result = forecast(&buckets, 1).unwrap();
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.confidence, Confidence::Low);
        assert!((result.predictions[0].amount - 50.0).abs() < EPS);
    }

    #[test]
    fn test_zero_horizon_rejected() {
        assert!(matches!(forecast(&[], 0), Err(Error::InvalidParameter(_))));
        assert!(forecast_by_category(&[], 0).is_err());
    }

    #[test]
    fn test_mixed_series_rejected() {
        let mut other = expense_bucket(2, 10.0);
        other.category = CategoryKey::Category(FOOD);
        let result = forecast(&[expense_bucket(1, 10.0), other], 1);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_by_category_needs_three_expense_months() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_grouping(CategoryGrouping::Leaf);
        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();

        let forecasts = forecast_by_category(&buckets, 1).unwrap();

        // Restaurants has two months, uncategorized one, Salary no expense
        let keys: Vec<CategoryKey> = forecasts.iter().map(|f| f.category).collect();
        assert_eq!(
            keys,
            vec![CategoryKey::Category(HOUSING), CategoryKey::Category(GROCERIES)]
        );

        let housing = &forecasts[0];
        assert!((housing.predictions[0].amount - 1200.0).abs() < EPS);
        assert_eq!(housing.direction, TrendDirection::Stable);

        let groceries = &forecasts[1];
        assert_eq!(groceries.category_name.as_deref(), Some("Groceries"));
        assert!((groceries.slope - 22.5).abs() < EPS);
        assert!((groceries.predictions[0].amount - 120.0).abs() < EPS);
        assert_eq!(groceries.predictions[0].period, "2024-04");
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_r_squared(0.95), Confidence::High);
        assert_eq!(Confidence::from_r_squared(0.5), Confidence::Medium);
        assert_eq!(Confidence::from_r_squared(0.1), Confidence::Low);
    }
}

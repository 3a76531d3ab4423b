//! Analytics configuration
//!
//! Loads report defaults from TOML with the following priority:
//! 1. Explicit override path (e.g. `--config`)
//! 2. User override at `<data dir>/tally/analytics.toml`
//! 3. Embedded default config
//!
//! Override files may be partial; missing keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anomaly::AnomalyParams;
use crate::budget::DEFAULT_WARN_PERCENT;
use crate::distribution::DEFAULT_MIN_SHARE_PERCENT;
use crate::error::{Error, Result};
use crate::forecast::DEFAULT_HORIZON;
use crate::recurring::RecurringParams;
use crate::trend::DEFAULT_WINDOW;

/// Default config embedded at compile time
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Report defaults used when a caller does not pass explicit parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub trend_window: usize,
    pub min_share_percent: f64,
    pub anomaly: AnomalyParams,
    pub warn_percent: f64,
    pub unbudgeted_min_amount: f64,
    pub forecast_horizon: usize,
    pub recurring: RecurringParams,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_WINDOW,
            min_share_percent: DEFAULT_MIN_SHARE_PERCENT,
            anomaly: AnomalyParams::default(),
            warn_percent: DEFAULT_WARN_PERCENT,
            unbudgeted_min_amount: 100.0,
            forecast_horizon: DEFAULT_HORIZON,
            recurring: RecurringParams::default(),
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("analytics.toml"))
}

impl AnalyticsConfig {
    /// Load configuration (override first, then embedded default)
    ///
    /// An explicit path must exist; the default override location is optional.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let (content, source) = match override_path {
            Some(path) => (fs::read_to_string(path)?, path.display().to_string()),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => (fs::read_to_string(&path)?, path.display().to_string()),
                None => (DEFAULT_CONFIG.to_string(), "embedded".to_string()),
            },
        };

        let config = Self::from_toml_str(&content)?;
        debug!(source = %source, "Analytics config loaded");
        Ok(config)
    }

    /// The embedded default config
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Parse TOML, apply it over the built-in defaults and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = raw.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trend_window == 0 {
            return Err(Error::InvalidParameter(
                "trend.window must be at least 1".into(),
            ));
        }
        if !self.min_share_percent.is_finite() || !(0.0..=100.0).contains(&self.min_share_percent) {
            return Err(Error::InvalidParameter(format!(
                "distribution.min_share_percent must be between 0 and 100, got {}",
                self.min_share_percent
            )));
        }
        self.anomaly.validate()?;
        if !self.warn_percent.is_finite() || self.warn_percent <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "budget.warn_percent must be positive, got {}",
                self.warn_percent
            )));
        }
        if !self.unbudgeted_min_amount.is_finite() || self.unbudgeted_min_amount < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "budget.unbudgeted_min_amount must be non-negative, got {}",
                self.unbudgeted_min_amount
            )));
        }
        if self.forecast_horizon == 0 {
            return Err(Error::InvalidParameter(
                "forecast.horizon must be at least 1".into(),
            ));
        }
        self.recurring.validate()
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    trend: Option<RawTrend>,
    distribution: Option<RawDistribution>,
    anomaly: Option<RawAnomaly>,
    budget: Option<RawBudget>,
    forecast: Option<RawForecast>,
    recurring: Option<RawRecurring>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTrend {
    window: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDistribution {
    min_share_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAnomaly {
    k: Option<f64>,
    min_samples: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBudget {
    warn_percent: Option<f64>,
    unbudgeted_min_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawForecast {
    horizon: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecurring {
    min_occurrences: Option<usize>,
    amount_tolerance: Option<f64>,
    min_interval_days: Option<f64>,
    max_interval_days: Option<f64>,
}

impl RawConfig {
    fn apply(self, mut config: AnalyticsConfig) -> AnalyticsConfig {
        if let Some(trend) = self.trend {
            config.trend_window = trend.window.unwrap_or(config.trend_window);
        }
        if let Some(distribution) = self.distribution {
            config.min_share_percent = distribution
                .min_share_percent
                .unwrap_or(config.min_share_percent);
        }
        if let Some(anomaly) = self.anomaly {
            config.anomaly.k = anomaly.k.unwrap_or(config.anomaly.k);
            config.anomaly.min_samples = anomaly.min_samples.unwrap_or(config.anomaly.min_samples);
        }
        if let Some(budget) = self.budget {
            config.warn_percent = budget.warn_percent.unwrap_or(config.warn_percent);
            config.unbudgeted_min_amount = budget
                .unbudgeted_min_amount
                .unwrap_or(config.unbudgeted_min_amount);
        }
        if let Some(forecast) = self.forecast {
            config.forecast_horizon = forecast.horizon.unwrap_or(config.forecast_horizon);
        }
        if let Some(recurring) = self.recurring {
            let params = &mut config.recurring;
            params.min_occurrences = recurring.min_occurrences.unwrap_or(params.min_occurrences);
            params.amount_tolerance = recurring.amount_tolerance.unwrap_or(params.amount_tolerance);
            params.min_interval_days = recurring
                .min_interval_days
                .unwrap_or(params.min_interval_days);
            params.max_interval_days = recurring
                .max_interval_days
                .unwrap_or(params.max_interval_days);
        }
        config
    }
}

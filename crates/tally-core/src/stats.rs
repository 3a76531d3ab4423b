//! Descriptive statistics shared by the analyzers
//!
//! Standard deviations are sample deviations (n - 1 denominator) and are
//! zero for fewer than two values.

/// Arithmetic mean, zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation
pub fn stddev(values: &[f64]) -> f64 {
    Summary::from_values(values.iter().copied()).stddev()
}

/// Running count/mean/M2 (Welford) that supports removing one value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    m2: f64,
}

impl Summary {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut summary = Self::default();
        for value in values {
            summary.push(value);
        }
        summary
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Summary of the same values with one occurrence of `value` removed
    ///
    /// `value` must have been pushed into this summary.
    pub fn without(&self, value: f64) -> Self {
        match self.count {
            0 => *self,
            1 => Self::default(),
            n => {
                let remaining = n - 1;
                let mean = (self.mean * n as f64 - value) / remaining as f64;
                let m2 = self.m2 - (value - self.mean) * (value - mean);
                Self {
                    count: remaining,
                    mean,
                    // cancellation can leave a tiny negative residue
                    m2: m2.max(0.0),
                }
            }
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Ordinary least squares fit of `y` against `0..n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    /// Returns None for an empty series
    pub fn fit(ys: &[f64]) -> Option<Self> {
        if ys.is_empty() {
            return None;
        }

        let n = ys.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = mean(ys);

        let (numerator, denominator) = ys.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

        let (slope, intercept) = if denominator == 0.0 {
            (0.0, y_mean)
        } else {
            let slope = numerator / denominator;
            (slope, y_mean - slope * x_mean)
        };

        let ss_total: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_residual: f64 = ys
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
            .sum();
        let r_squared = if ss_total == 0.0 {
            0.0
        } else {
            1.0 - ss_residual / ss_total
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
        assert_eq!(stddev(&[5.0]), 0.0);
        // sample stddev of 2,4,4,4,5,5,7,9 is sqrt(32/7)
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((stddev(&values) - (32.0f64 / 7.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn test_summary_without_matches_direct_computation() {
        let values = [35.0, 40.0, 45.0, 38.0, 42.0, 40.0, 200.0];
        let full = Summary::from_values(values.iter().copied());

        for (i, &target) in values.iter().enumerate() {
            let rest: Vec<f64> = values
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, v)| *v)
                .collect();
            let loo = full.without(target);
            assert_eq!(loo.count, rest.len());
            assert!((loo.mean - mean(&rest)).abs() < 1e-9);
            assert!((loo.stddev() - stddev(&rest)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_summary_without_small_counts() {
        let one = Summary::from_values([3.0]);
        assert_eq!(one.without(3.0), Summary::default());
        assert_eq!(Summary::default().without(1.0).count, 0);
    }

    #[test]
    fn test_linear_fit() {
        let fit = LinearFit::fit(&[100.0, 110.0, 120.0, 130.0]).unwrap();
        assert!((fit.slope - 10.0).abs() < EPS);
        assert!((fit.intercept - 100.0).abs() < EPS);
        assert!((fit.r_squared - 1.0).abs() < EPS);
        assert!((fit.predict(4.0) - 140.0).abs() < EPS);

        let flat = LinearFit::fit(&[50.0, 50.0, 50.0]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r_squared, 0.0);

        let single = LinearFit::fit(&[7.0]).unwrap();
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.intercept, 7.0);

        assert!(LinearFit::fit(&[]).is_none());
    }
}

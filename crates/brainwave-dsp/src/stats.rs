//! Statistical comparison of two band-power series
//!
//! Outlier-cleaned Welch two-sample t-test between the same band of two
//! recordings, with an effect-size summary and a one-line verdict.

use brainwave_core::{EngineError, EngineResult};
use serde::Serialize;

/// Two-sided significance threshold (fixed, not configuration)
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Immutable outcome of one band comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub band_name: String,
    pub mean_a: f64,
    pub mean_b: f64,
    /// `(mean_b - mean_a) / mean_a * 100`; 0 when `mean_a` is 0
    pub percent_change: f64,
    /// Welch t statistic with B as the first operand, so its sign reads
    /// "B relative to A"
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub conclusion: String,
}

/// Compares band-power series from two recordings
#[derive(Debug, Clone)]
pub struct StatisticalAnalyzer {
    std_dev_threshold: f64,
}

impl Default for StatisticalAnalyzer {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl StatisticalAnalyzer {
    pub fn new(std_dev_threshold: f64) -> Self {
        Self { std_dev_threshold }
    }

    /// Standard z-score outlier removal: drops values farther than
    /// `threshold` population standard deviations from the mean, bounds
    /// inclusive
    pub fn remove_outliers(&self, series: &[f64]) -> Vec<f64> {
        if series.is_empty() {
            return Vec::new();
        }

        let n = series.len() as f64;
        let mean = series.iter().sum::<f64>() / n;
        let std = (series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let lower = mean - self.std_dev_threshold * std;
        let upper = mean + self.std_dev_threshold * std;

        series
            .iter()
            .filter(|&&v| v >= lower && v <= upper)
            .cloned()
            .collect()
    }

    /// Compare two series of power values for one band.
    ///
    /// Both series are cleaned independently; fewer than 2 surviving
    /// points on either side is reported as `InsufficientData` rather than
    /// a panic. The t-test does not assume equal variances.
    pub fn compare_bands(
        &self,
        band_name: &str,
        data_a: &[f64],
        data_b: &[f64],
    ) -> EngineResult<ComparisonResult> {
        let clean_a = self.remove_outliers(data_a);
        let clean_b = self.remove_outliers(data_b);

        let shortest = clean_a.len().min(clean_b.len());
        if shortest < 2 {
            return Err(EngineError::InsufficientData {
                required: 2,
                actual: shortest,
            });
        }

        let (t_statistic, p_value) = welch_t_test(&clean_b, &clean_a);

        let mean_a = clean_a.iter().sum::<f64>() / clean_a.len() as f64;
        let mean_b = clean_b.iter().sum::<f64>() / clean_b.len() as f64;
        let percent_change = if mean_a != 0.0 {
            (mean_b - mean_a) / mean_a * 100.0
        } else {
            0.0
        };

        let significant = p_value < SIGNIFICANCE_LEVEL;
        let conclusion = if significant {
            let direction = if mean_b > mean_a { "HIGHER" } else { "LOWER" };
            format!(
                "Recording B has significantly {} {} power.",
                direction, band_name
            )
        } else {
            "No significant difference.".to_string()
        };

        Ok(ComparisonResult {
            band_name: band_name.to_string(),
            mean_a,
            mean_b,
            percent_change,
            t_statistic,
            p_value,
            significant,
            conclusion,
        })
    }
}

/// Welch's two-sample t-test (unequal variances), two-sided.
///
/// Returns `(t, p)` with the statistic's sign following
/// `mean(x) - mean(y)`. Both samples must hold at least 2 points.
pub fn welch_t_test(x: &[f64], y: &[f64]) -> (f64, f64) {
    let nx = x.len() as f64;
    let ny = y.len() as f64;
    let mean_x = x.iter().sum::<f64>() / nx;
    let mean_y = y.iter().sum::<f64>() / ny;
    let var_x = sample_variance(x, mean_x);
    let var_y = sample_variance(y, mean_y);

    let se_sq = var_x / nx + var_y / ny;
    if se_sq <= 0.0 {
        // Degenerate samples with zero spread
        return if mean_x == mean_y {
            (0.0, 1.0)
        } else if mean_x > mean_y {
            (f64::INFINITY, 0.0)
        } else {
            (f64::NEG_INFINITY, 0.0)
        };
    }

    let t = (mean_x - mean_y) / se_sq.sqrt();

    // Welch-Satterthwaite degrees of freedom
    let df = se_sq * se_sq
        / ((var_x / nx).powi(2) / (nx - 1.0) + (var_y / ny).powi(2) / (ny - 1.0));

    // Two-sided p-value: P(|T| > t) = I_{df/(df+t^2)}(df/2, 1/2)
    let p = regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    (t, p.clamp(0.0, 1.0))
}

fn sample_variance(data: &[f64], mean: f64) -> f64 {
    data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (data.len() as f64 - 1.0)
}

/// Regularized incomplete beta function I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = libm::lgamma(a + b) - libm::lgamma(a) - libm::lgamma(b)
        + a * x.ln()
        + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fast on one side of the split point
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lentz's algorithm for the incomplete beta continued fraction
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 1e-14;
    const TINY: f64 = 1e-30;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let numerator = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + numerator * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + numerator / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let numerator = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + numerator * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + numerator / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}

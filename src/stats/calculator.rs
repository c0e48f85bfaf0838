//! Statistics Calculator Module
//! Handles descriptive statistics, quartiles, histograms and correlations.

use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Whisker reach in multiples of the interquartile range.
pub const WHISKER_IQR: f64 = 1.5;

/// Descriptive statistics for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
}

impl Default for DescriptiveStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p25: f64::NAN,
            p75: f64::NAN,
        }
    }
}

/// Column summary in the shape of a dataframe `describe()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

impl From<DescriptiveStats> for ColumnSummary {
    fn from(s: DescriptiveStats) -> Self {
        Self {
            count: s.count,
            mean: s.mean,
            std: s.std,
            min: s.min,
            p25: s.p25,
            p50: s.median,
            p75: s.p75,
            max: s.max,
        }
    }
}

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: usize,
}

/// One equal-width histogram bin. `end` is exclusive except for the last bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> DescriptiveStats {
        let n = values.len();
        if n == 0 {
            return DescriptiveStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.mean();
        // Sample variance (ddof = 1); undefined for a single observation.
        let variance = values.variance();

        DescriptiveStats {
            count: n,
            mean,
            median: Self::percentile(&sorted, 50.0),
            std: variance.sqrt(),
            variance,
            min: sorted[0],
            max: sorted[n - 1],
            p25: Self::percentile(&sorted, 25.0),
            p75: Self::percentile(&sorted, 75.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Arithmetic mean, NaN for an empty slice.
    pub fn mean(values: &[f64]) -> f64 {
        values.mean()
    }

    /// Median, NaN for an empty slice.
    pub fn median(values: &[f64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self::percentile(&sorted, 50.0)
    }

    /// Summarize many columns in parallel, keyed by column name.
    pub fn describe_columns(columns: Vec<(String, Vec<f64>)>) -> BTreeMap<String, ColumnSummary> {
        columns
            .par_iter()
            .map(|(name, values)| {
                let summary = ColumnSummary::from(Self::compute_descriptive_stats(values));
                (name.clone(), summary)
            })
            .collect()
    }

    /// Quartiles and whiskers for a box plot. `None` for an empty group.
    pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = Self::percentile(&sorted, 25.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= low_fence)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= high_fence)
            .unwrap_or(q3);
        let outliers = sorted
            .iter()
            .filter(|&&v| v < low_fence || v > high_fence)
            .count();

        Some(BoxStats {
            count: sorted.len(),
            min: sorted[0],
            q1,
            median: Self::percentile(&sorted, 50.0),
            q3,
            max: sorted[sorted.len() - 1],
            whisker_low,
            whisker_high,
            outliers,
        })
    }

    /// Equal-width histogram spanning the data range.
    pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
        if values.is_empty() || bins == 0 {
            return Vec::new();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A constant series gets a unit-wide range centred on the value.
        let (lo, hi) = if max > min {
            (min, max)
        } else {
            (min - 0.5, max + 0.5)
        };
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: lo + width * i as f64,
                end: lo + width * (i + 1) as f64,
                count,
            })
            .collect()
    }

    /// Pearson correlation over pairwise-complete observations.
    pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y)
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .unzip();

        if xs.len() < 2 {
            return f64::NAN;
        }

        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }

        let r = xs.iter().covariance(ys.iter()) / (sx * sy);
        r.clamp(-1.0, 1.0)
    }

    /// Symmetric correlation matrix; each off-diagonal pair runs on rayon.
    ///
    /// The diagonal is exactly 1.0 for any column that varies, NaN otherwise.
    pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
        let n = columns.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();

        let coefficients: Vec<((usize, usize), f64)> = pairs
            .par_iter()
            .map(|&(i, j)| ((i, j), Self::pearson(&columns[i], &columns[j])))
            .collect();

        let mut matrix = vec![vec![f64::NAN; n]; n];
        for (i, column) in columns.iter().enumerate() {
            let present: Vec<f64> = column.iter().flatten().copied().collect();
            if present.len() >= 2 && present.iter().std_dev() > 0.0 {
                matrix[i][i] = 1.0;
            }
        }
        for ((i, j), r) in coefficients {
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
        matrix
    }
}

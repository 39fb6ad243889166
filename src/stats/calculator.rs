//! Statistics Calculator Module
//! Per-year descriptive statistics of a delay column and Welch's t-tests
//! against a baseline year.

use polars::prelude::*;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// Significance threshold for t-test
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("No years found in column {0}")]
    NoYears(String),
    #[error("Baseline year {0} is not in the data")]
    UnknownBaseline(i32),
}

/// Statistics for a single year.
#[derive(Debug, Clone)]
pub struct YearStats {
    pub year: i32,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p95: f64,
    pub p05: f64,
    pub std_diff_from_baseline: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

impl Default for YearStats {
    fn default() -> Self {
        Self {
            year: 0,
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
            std_diff_from_baseline: None,
            p_value: None,
            is_significant: false,
        }
    }
}

/// One delay column summarised per year.
#[derive(Debug, Clone)]
pub struct YearComparison {
    pub value_column: String,
    pub baseline_year: i32,
    /// Ascending by year.
    pub years: Vec<YearStats>,
}

impl YearComparison {
    pub fn get(&self, year: i32) -> Option<&YearStats> {
        self.years.iter().find(|s| s.year == year)
    }

    /// Check if any non-baseline year differs significantly.
    pub fn has_significant_results(&self) -> bool {
        self.years
            .iter()
            .any(|s| s.year != self.baseline_year && s.is_significant)
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> YearStats {
        let n = values.len();
        if n == 0 {
            return YearStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = Self::mean(values);
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        let variance = Self::sample_variance(values, mean);

        YearStats {
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
            ..YearStats::default()
        }
    }

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Unbiased (n - 1) variance; 0 for fewer than two values.
    fn sample_variance(values: &[f64], mean: f64) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
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

    /// Perform Welch's t-test (independent samples, unequal variance).
    pub fn perform_ttest(sample: &[f64], baseline: &[f64]) -> (f64, bool) {
        let n1 = sample.len() as f64;
        let n2 = baseline.len() as f64;

        if n1 < 2.0 || n2 < 2.0 {
            return (f64::NAN, false);
        }

        let mean1 = Self::mean(sample);
        let mean2 = Self::mean(baseline);
        let var1 = Self::sample_variance(sample, mean1);
        let var2 = Self::sample_variance(baseline, mean2);

        let se = (var1 / n1 + var2 / n2).sqrt();
        if se == 0.0 {
            return (1.0, false);
        }

        let t = (mean1 - mean2) / se;

        // Welch-Satterthwaite degrees of freedom
        let df_num = (var1 / n1 + var2 / n2).powi(2);
        let df_denom = (var1 / n1).powi(2) / (n1 - 1.0) + (var2 / n2).powi(2) / (n2 - 1.0);
        let df = df_num / df_denom;

        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => {
                let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));
                (p_value, p_value <= SIGNIFICANCE_THRESHOLD)
            }
            Err(_) => (f64::NAN, false),
        }
    }

    /// Distinct years of `year_col`, ascending.
    pub fn get_years(df: &DataFrame, year_col: &str) -> Result<Vec<i32>, StatsError> {
        let years = df.column(year_col)?.cast(&DataType::Int32)?;
        let mut years: Vec<i32> = years.i32()?.into_iter().flatten().collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Non-null, non-NaN values of `value_col` for one year.
    pub fn get_values_for_year(
        df: &DataFrame,
        year_col: &str,
        value_col: &str,
        year: i32,
    ) -> Result<Vec<f64>, StatsError> {
        let filtered = df
            .clone()
            .lazy()
            .filter(col(year_col).cast(DataType::Int32).eq(lit(year)))
            .select([col(value_col).cast(DataType::Float64)])
            .collect()?;

        let values = filtered
            .column(value_col)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect();
        Ok(values)
    }

    /// Compute statistics for every year in parallel and compare each one
    /// against `baseline` (the earliest year when `None`).
    pub fn compute_year_stats(
        df: &DataFrame,
        year_col: &str,
        value_col: &str,
        baseline: Option<i32>,
    ) -> Result<YearComparison, StatsError> {
        let years = Self::get_years(df, year_col)?;
        let baseline_year = match baseline {
            Some(year) if years.contains(&year) => year,
            Some(year) => return Err(StatsError::UnknownBaseline(year)),
            None => *years
                .first()
                .ok_or_else(|| StatsError::NoYears(year_col.to_string()))?,
        };

        let baseline_values = Self::get_values_for_year(df, year_col, value_col, baseline_year)?;
        let baseline_stats = Self::compute_descriptive_stats(&baseline_values);

        let years = years
            .par_iter()
            .map(|&year| -> Result<YearStats, StatsError> {
                let values = Self::get_values_for_year(df, year_col, value_col, year)?;
                let mut stats = Self::compute_descriptive_stats(&values);
                stats.year = year;

                if year != baseline_year {
                    // Standardized mean difference
                    if baseline_stats.std > 0.0 && !baseline_stats.mean.is_nan() {
                        stats.std_diff_from_baseline =
                            Some((stats.mean - baseline_stats.mean) / baseline_stats.std);
                    }
                    if !baseline_values.is_empty() {
                        let (p_value, is_significant) =
                            Self::perform_ttest(&values, &baseline_values);
                        stats.p_value = Some(p_value);
                        stats.is_significant = is_significant;
                    }
                }
                Ok(stats)
            })
            .collect::<Result<Vec<_>, StatsError>>()?;

        log::debug!(
            "Computed {} statistics for {} year(s), baseline {}",
            value_col,
            years.len(),
            baseline_year
        );

        Ok(YearComparison {
            value_column: value_col.to_string(),
            baseline_year,
            years,
        })
    }
}

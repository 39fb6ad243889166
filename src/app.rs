//! Flight Delays Dashboard Application
//! One run of the dashboard: owns the configuration and the loaded table, and
//! renders the text report that stands in for the chart pages.

use crate::config::DashboardConfig;
use crate::data::{Aggregate, DataLoader, DataProcessor, LoaderError, ProcessorError};
use crate::stats::{StatsCalculator, StatsError, YearComparison};
use polars::prelude::*;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No data directory configured")]
    NoDataDir,
    #[error("No data loaded")]
    NotLoaded,
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Explicit per-run context handed to every report section.
pub struct DashboardApp {
    config: DashboardConfig,
    loader: DataLoader,
    processor: DataProcessor,
    prepared: Option<DataFrame>,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig) -> Self {
        let loader = DataLoader::new(config.loader.clone());
        let processor = DataProcessor::new(config.loader.year_column.clone());
        Self {
            config,
            loader,
            processor,
            prepared: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    /// Load the configured directory and prepare it for aggregation.
    pub fn load(&mut self) -> Result<&DataFrame, AppError> {
        self.prepared = None;
        let dir = self.config.data_dir.clone().ok_or(AppError::NoDataDir)?;

        let raw = self.loader.load_directory(&dir)?;
        let prepared = DataProcessor::prepare(raw, self.config.fill_missing)?;
        Ok(self.prepared.insert(prepared))
    }

    /// The cleaned combined table.
    pub fn dataset(&self) -> Result<&DataFrame, AppError> {
        self.prepared.as_ref().ok_or(AppError::NotLoaded)
    }

    /// Every aggregate the loaded columns support.
    pub fn aggregates(&self) -> Result<Vec<(Aggregate, DataFrame)>, AppError> {
        Ok(self.processor.compute_available(self.dataset()?)?)
    }

    /// Per-year statistics of the configured delay column.
    pub fn year_stats(&self) -> Result<YearComparison, AppError> {
        Ok(StatsCalculator::compute_year_stats(
            self.dataset()?,
            &self.config.loader.year_column,
            &self.config.delay_column,
            self.config.baseline_year,
        )?)
    }

    /// Write the full report: sources, aggregates, then yearly statistics.
    pub fn render_report<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let df = self.dataset()?;

        writeln!(out, "Flight Delay & Cancellation Analysis")?;
        for source in self.loader.sources() {
            writeln!(
                out,
                "  {}  year {}  kept {} of {} rows",
                source.path.display(),
                source.year,
                source.sampled_rows,
                source.original_rows
            )?;
        }
        writeln!(
            out,
            "Combined: {} of {} rows x {} columns",
            self.loader.sampled_row_count(),
            self.loader.original_row_count(),
            df.width()
        )?;
        writeln!(
            out,
            "Numeric columns: {}",
            self.loader.summarizable_columns().join(", ")
        )?;

        for (kind, table) in self.aggregates()? {
            writeln!(out)?;
            writeln!(out, "== {} ({}) ==", kind.title(), kind.name())?;
            writeln!(out, "{table}")?;
        }

        let summarizable = self.loader.summarizable_columns();
        if !summarizable.contains(&self.config.delay_column) {
            log::warn!(
                "Column {} is missing or not numeric, skipping yearly statistics",
                self.config.delay_column
            );
            return Ok(());
        }

        let comparison = self.year_stats()?;
        writeln!(out)?;
        Self::write_year_stats(out, &comparison)?;
        Ok(())
    }

    fn write_year_stats<W: Write>(out: &mut W, cmp: &YearComparison) -> std::io::Result<()> {
        writeln!(
            out,
            "== {} by year (baseline {}) ==",
            cmp.value_column, cmp.baseline_year
        )?;
        writeln!(
            out,
            "{:>6} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "Year", "Count", "Mean", "Median", "Std", "P05", "P95", "StdDiff", "P-value"
        )?;

        for s in &cmp.years {
            let std_diff = s
                .std_diff_from_baseline
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string());
            let p_value = match s.p_value {
                Some(p) if s.is_significant => format!("{p:.4}*"),
                Some(p) => format!("{p:.4}"),
                None => "-".to_string(),
            };
            writeln!(
                out,
                "{:>6} {:>8} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9} {:>9}",
                s.year, s.count, s.mean, s.median, s.std, s.p05, s.p95, std_diff, p_value
            )?;
        }

        if cmp.has_significant_results() {
            writeln!(out, "* significant at p <= {}", crate::stats::SIGNIFICANCE_THRESHOLD)?;
        }
        Ok(())
    }
}

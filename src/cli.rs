//! Command-line interface for the `flight-delays` binary.

use crate::config::{ConfigError, DashboardConfig};
use crate::logging::Verbosity;
use clap::Parser;
use std::path::PathBuf;

/// flight-delays - sample yearly flight-delay CSV files and print the
/// dashboard tables
///
/// Loads every `<year>.csv` file in DATA_DIR, keeps a seeded 10% sample of
/// each, and prints the combined aggregates and per-year delay statistics.
#[derive(Debug, Parser)]
#[command(name = "flight-delays")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `<year>.csv` files (overrides the config file)
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fraction of each file's rows to keep
    #[arg(long, value_name = "F")]
    pub fraction: Option<f64>,

    /// Sampling seed
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Process files in file-name order instead of directory listing order
    #[arg(long)]
    pub sorted: bool,

    /// Column summarised per year
    #[arg(long, value_name = "COLUMN")]
    pub delay_column: Option<String>,

    /// Year every other year is compared against
    #[arg(long, value_name = "YEAR")]
    pub baseline_year: Option<i32>,

    /// Keep missing delay values as nulls
    #[arg(long)]
    pub no_fill: bool,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<DashboardConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(fraction) = self.fraction {
            config.loader.sample_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.loader.seed = seed;
        }
        if self.sorted {
            config.loader.sort_files = true;
        }
        if let Some(column) = &self.delay_column {
            config.delay_column = column.clone();
        }
        if let Some(year) = self.baseline_year {
            config.baseline_year = Some(year);
        }
        if self.no_fill {
            config.fill_missing = false;
        }

        if config.data_dir.is_none() {
            return Err(ConfigError::Invalid(
                "no data directory given on the command line or in the config file".into(),
            ));
        }
        config.validate()?;
        Ok(config)
    }
}

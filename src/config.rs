//! Configuration Module
//! Loader and dashboard settings, deserialized from an optional JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default fraction of rows kept from every yearly file.
pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.1;
/// Default sampling seed.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the multi-file CSV loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File suffix of the yearly tables, without the leading dot.
    pub extension: String,
    /// Fraction of each file's rows kept in the combined table.
    pub sample_fraction: f64,
    /// Seed of the row sampler.
    pub seed: u64,
    /// Sort discovered files by name instead of using directory listing order.
    pub sort_files: bool,
    /// Name of the synthetic year column.
    pub year_column: String,
    /// Rows scanned for CSV schema inference.
    pub infer_schema_length: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extension: "csv".to_string(),
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            seed: DEFAULT_SEED,
            sort_files: false,
            year_column: "Year".to_string(),
            infer_schema_length: 10000,
        }
    }
}

impl LoaderConfig {
    /// Suffix matched against file names, e.g. `.csv`.
    pub fn suffix(&self) -> String {
        format!(".{}", self.extension.trim_start_matches('.'))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "sample_fraction must be in (0, 1], got {}",
                self.sample_fraction
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".into()));
        }
        if self.year_column.is_empty() {
            return Err(ConfigError::Invalid("year_column must not be empty".into()));
        }
        Ok(())
    }
}

/// Top-level dashboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding `<year>.csv` files.
    pub data_dir: Option<PathBuf>,
    pub loader: LoaderConfig,
    /// Column summarised per year by the statistics report.
    pub delay_column: String,
    /// Year the others are compared against; earliest year when unset.
    pub baseline_year: Option<i32>,
    /// Fill missing delay values before aggregating.
    pub fill_missing: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            loader: LoaderConfig::default(),
            delay_column: "ARR_DELAY".to_string(),
            baseline_year: None,
            fill_missing: true,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()?;
        if self.delay_column.is_empty() {
            return Err(ConfigError::Invalid("delay_column must not be empty".into()));
        }
        Ok(())
    }
}

//! Yearly CSV Loader Module
//! Scans a directory of `<year>.csv` files, samples each one and concatenates
//! the samples into a single Polars DataFrame tagged with a `Year` column.

use crate::config::LoaderConfig;
use polars::prelude::*;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("File name {file} does not start with a year: {source}")]
    InvalidYear {
        file: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("No *{suffix} files found in {path}")]
    NoMatchingFiles { path: PathBuf, suffix: String },
}

/// One yearly file that went into the combined table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub year: i32,
    pub original_rows: usize,
    pub sampled_rows: usize,
}

/// Load every yearly file under `dir` into one sampled DataFrame.
///
/// Files are processed one after another in discovery order; the first bad
/// file aborts the whole load.
pub fn load_dataset(dir: &Path, config: &LoaderConfig) -> Result<DataFrame, LoaderError> {
    load_with_sources(dir, config).map(|(df, _)| df)
}

fn load_with_sources(
    dir: &Path,
    config: &LoaderConfig,
) -> Result<(DataFrame, Vec<SourceFile>), LoaderError> {
    let files = discover_files(dir, config)?;
    if files.is_empty() {
        return Err(LoaderError::NoMatchingFiles {
            path: dir.to_path_buf(),
            suffix: config.suffix(),
        });
    }

    let mut frames = Vec::with_capacity(files.len());
    let mut sources = Vec::with_capacity(files.len());

    for path in files {
        let year = year_from_file_name(&path)?;
        let df = read_table(&path, config)?;
        let original_rows = df.height();

        let mut sampled = sample_rows(&df, config.sample_fraction, config.seed)?;
        let year_values = vec![year; sampled.height()];
        sampled.with_column(Column::new(config.year_column.as_str().into(), year_values))?;

        log::debug!(
            "{}: kept {} of {} rows for year {}",
            path.display(),
            sampled.height(),
            original_rows,
            year
        );

        sources.push(SourceFile {
            path,
            year,
            original_rows,
            sampled_rows: sampled.height(),
        });
        frames.push(sampled.lazy());
    }

    // Diagonal concat pads columns missing from some files with nulls; a column
    // inferred differently per file (Int64 vs Float64) is cast to the supertype
    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    let combined = concat_lf_diagonal(frames, args)?.collect()?;

    log::info!(
        "Loaded {} rows from {} file(s) in {}",
        combined.height(),
        sources.len(),
        dir.display()
    );

    Ok((combined, sources))
}

/// List the files in `dir` whose names end with the configured suffix.
///
/// Order is directory listing order unless `sort_files` is set.
pub fn discover_files(dir: &Path, config: &LoaderConfig) -> Result<Vec<PathBuf>, LoaderError> {
    let read_dir_error = |source| LoaderError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let suffix = config.suffix();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix));

        if matches && path.is_file() {
            files.push(path);
        } else {
            log::trace!("Skipping {}", path.display());
        }
    }

    if config.sort_files {
        files.sort();
    }

    Ok(files)
}

/// Parse the year out of a file name: everything before the first `.`.
pub fn year_from_file_name(path: &Path) -> Result<i32, LoaderError> {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = file.split('.').next().unwrap_or_default();

    prefix
        .parse::<i32>()
        .map_err(|source| LoaderError::InvalidYear { file: file.clone(), source })
}

/// Read a full CSV file with a header row.
fn read_table(path: &Path, config: &LoaderConfig) -> Result<DataFrame, LoaderError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(config.infer_schema_length))
        .finish()?
        .collect()?;
    Ok(df)
}

/// Draw `round(fraction * height)` rows without replacement using `seed`.
///
/// Halves round to even, so 25 rows at 10% keep 2.
pub fn sample_rows(df: &DataFrame, fraction: f64, seed: u64) -> Result<DataFrame, LoaderError> {
    let n = (fraction * df.height() as f64).round_ties_even() as usize;
    let sampled = df.sample_n_literal(n.min(df.height()), false, true, Some(seed))?;
    Ok(sampled)
}

/// Directory loader that keeps the combined table and per-file bookkeeping.
pub struct DataLoader {
    config: LoaderConfig,
    df: Option<DataFrame>,
    sources: Vec<SourceFile>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl DataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            df: None,
            sources: Vec::new(),
        }
    }

    /// Load a directory of yearly files, replacing anything loaded before.
    ///
    /// On failure the previous table is dropped as well.
    pub fn load_directory(&mut self, dir: &Path) -> Result<&DataFrame, LoaderError> {
        self.df = None;
        self.sources.clear();

        let (df, sources) = load_with_sources(dir, &self.config)?;
        self.sources = sources;
        Ok(self.df.insert(df))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Files that went into the current table, in load order.
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Numeric columns a per-year summary can be computed over, excluding the
    /// year column itself.
    pub fn summarizable_columns(&self) -> Vec<String> {
        let Some(df) = &self.df else {
            return Vec::new();
        };

        df.get_columns()
            .iter()
            .filter(|col| col.name().as_str() != self.config.year_column)
            .filter(|col| col.dtype().is_integer() || col.dtype().is_float())
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Distinct years present in the table, ascending.
    pub fn get_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.sources.iter().map(|s| s.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Rows kept across all files.
    pub fn sampled_row_count(&self) -> usize {
        self.sources.iter().map(|s| s.sampled_rows).sum()
    }

    /// Rows read across all files before sampling.
    pub fn original_row_count(&self) -> usize {
        self.sources.iter().map(|s| s.original_rows).sum()
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, rows: usize) {
        let mut text = String::from("id,OP_CARRIER,ARR_DELAY\n");
        for i in 0..rows {
            text.push_str(&format!("{i},C{},{}\n", i % 3, i as f64 * 1.5));
        }
        fs::write(dir.join(name), text).unwrap();
    }

    fn year_count(df: &DataFrame, year: i32) -> usize {
        df.column("Year")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .filter(|y| *y == Some(year))
            .count()
    }

    #[test]
    fn samples_ten_percent_of_each_year() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2019.csv", 100);
        write_csv(dir.path(), "2020.csv", 50);

        let df = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();

        assert_eq!(df.height(), 15);
        assert_eq!(year_count(&df, 2019), 10);
        assert_eq!(year_count(&df, 2020), 5);
        assert_eq!(df.column("Year").unwrap().null_count(), 0);
    }

    #[test]
    fn sampled_rows_come_from_their_own_file() {
        let dir = TempDir::new().unwrap();
        // 2019 ids are 0..100, 2020 ids are shifted by 1000
        write_csv(dir.path(), "2019.csv", 100);
        let mut text = String::from("id,OP_CARRIER,ARR_DELAY\n");
        for i in 0..50 {
            text.push_str(&format!("{},C0,1.0\n", 1000 + i));
        }
        fs::write(dir.path().join("2020.csv"), text).unwrap();

        let df = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();
        let ids = df.column("id").unwrap().i64().unwrap();
        let years = df.column("Year").unwrap().i32().unwrap();

        for (id, year) in ids.into_iter().zip(years.into_iter()) {
            match (id.unwrap(), year.unwrap()) {
                (id, 2019) => assert!(id < 100),
                (id, 2020) => assert!(id >= 1000),
                (_, other) => panic!("unexpected year {other}"),
            }
        }
    }

    #[test]
    fn repeated_loads_are_identical() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2009.csv", 200);
        write_csv(dir.path(), "2010.csv", 80);

        let config = LoaderConfig::default();
        let first = load_dataset(dir.path(), &config).unwrap();
        let second = load_dataset(dir.path(), &config).unwrap();

        assert!(first.equals_missing(&second));
    }

    #[test]
    fn different_seed_changes_the_sample() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2009.csv", 1000);

        let first = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();
        let other = LoaderConfig {
            seed: 7,
            ..LoaderConfig::default()
        };
        let second = load_dataset(dir.path(), &other).unwrap();

        assert_eq!(first.height(), second.height());
        assert!(!first.equals_missing(&second));
    }

    #[test]
    fn non_numeric_prefix_fails_the_whole_load() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2019.csv", 20);
        write_csv(dir.path(), "abc.csv", 20);

        let err = load_dataset(dir.path(), &LoaderConfig::default()).unwrap_err();
        match err {
            LoaderError::InvalidYear { file, .. } => assert_eq!(file, "abc.csv"),
            other => panic!("expected InvalidYear, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();

        let err = load_dataset(dir.path(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::NoMatchingFiles { .. }));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = load_dataset(&missing, &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::ReadDir { .. }));
    }

    #[test]
    fn other_suffixes_are_ignored() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2019.csv", 30);
        write_csv(dir.path(), "2020.csv.bak", 30);
        fs::write(dir.path().join("README.md"), "# data").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();

        let files = discover_files(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(files, vec![dir.path().join("2019.csv")]);

        let df = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn malformed_csv_surfaces_parser_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2019.csv"), "id,value\n1,2\n3,4,5,6\n").unwrap();

        let err = load_dataset(dir.path(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::CsvError(_)));
    }

    #[test]
    fn heterogeneous_columns_are_null_padded() {
        let dir = TempDir::new().unwrap();
        let mut a = String::from("id,TAXI_IN\n");
        let mut b = String::from("id,TAXI_OUT\n");
        for i in 0..20 {
            a.push_str(&format!("{i},{i}\n"));
            b.push_str(&format!("{i},{i}\n"));
        }
        fs::write(dir.path().join("2011.csv"), a).unwrap();
        fs::write(dir.path().join("2012.csv"), b).unwrap();

        let df = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.column("TAXI_IN").unwrap().null_count(), 2);
        assert_eq!(df.column("TAXI_OUT").unwrap().null_count(), 2);
    }

    #[test]
    fn per_file_dtypes_are_widened() {
        let dir = TempDir::new().unwrap();
        let mut ints = String::from("id,ARR_DELAY\n");
        let mut floats = String::from("id,ARR_DELAY\n");
        for i in 0..20 {
            ints.push_str(&format!("{i},{}\n", i + 1));
            floats.push_str(&format!("{i},{}.5\n", i + 1));
        }
        fs::write(dir.path().join("2011.csv"), ints).unwrap();
        fs::write(dir.path().join("2012.csv"), floats).unwrap();

        let df = load_dataset(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.column("ARR_DELAY").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("ARR_DELAY").unwrap().null_count(), 0);
    }

    #[test]
    fn sorted_discovery_orders_by_name() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2018.csv", 10);
        write_csv(dir.path(), "2009.csv", 10);
        write_csv(dir.path(), "2013.csv", 10);

        let config = LoaderConfig {
            sort_files: true,
            ..LoaderConfig::default()
        };
        let df = load_dataset(dir.path(), &config).unwrap();
        let years: Vec<i32> = df
            .column("Year")
            .unwrap()
            .i32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(years, vec![2009, 2013, 2018]);
    }

    #[test]
    fn year_is_prefix_before_first_dot() {
        assert_eq!(year_from_file_name(Path::new("/d/2015.csv")).unwrap(), 2015);
        assert_eq!(year_from_file_name(Path::new("2016.part.csv")).unwrap(), 2016);
        assert!(year_from_file_name(Path::new("y2016.csv")).is_err());
        assert!(year_from_file_name(Path::new(".csv")).is_err());
    }

    #[test]
    fn sample_size_rounds_half_to_even() {
        let df = DataFrame::new(vec![Column::new("x".into(), (0..25i64).collect::<Vec<_>>())])
            .unwrap();
        assert_eq!(sample_rows(&df, 0.1, 42).unwrap().height(), 2);

        let df = DataFrame::new(vec![Column::new("x".into(), (0..7i64).collect::<Vec<_>>())])
            .unwrap();
        assert_eq!(sample_rows(&df, 0.1, 42).unwrap().height(), 1);
        assert_eq!(sample_rows(&df, 1.0, 42).unwrap().height(), 7);
    }

    #[test]
    fn loader_tracks_sources() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2019.csv", 100);
        write_csv(dir.path(), "2020.csv", 50);

        let mut loader = DataLoader::new(LoaderConfig {
            sort_files: true,
            ..LoaderConfig::default()
        });
        assert_eq!(loader.sampled_row_count(), 0);
        assert!(loader.summarizable_columns().is_empty());

        loader.load_directory(dir.path()).unwrap();
        assert_eq!(loader.sampled_row_count(), 15);
        assert_eq!(loader.original_row_count(), 150);
        assert_eq!(loader.get_dataframe().unwrap().height(), 15);
        assert_eq!(loader.get_years(), vec![2019, 2020]);
        assert_eq!(loader.sources()[0].original_rows, 100);
        assert_eq!(loader.sources()[0].sampled_rows, 10);
        assert_eq!(loader.sources()[1].sampled_rows, 5);
        assert_eq!(loader.summarizable_columns(), vec!["id", "ARR_DELAY"]);

        fs::write(dir.path().join("bad.csv"), "id\n1\n").unwrap();
        assert!(loader.load_directory(dir.path()).is_err());
        assert!(loader.get_dataframe().is_none());
        assert!(loader.sources().is_empty());
    }
}

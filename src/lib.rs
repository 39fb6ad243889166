//! Flight Delays - yearly flight-delay CSV loading & dashboard aggregates
//!
//! Loads every `<year>.csv` file of a directory, keeps a seeded sample of each,
//! and concatenates the samples into one Polars DataFrame tagged with a `Year`
//! column. The aggregate and statistics modules build the tables the dashboard
//! charts are drawn from.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod stats;

pub use app::{AppError, DashboardApp};
pub use config::{DashboardConfig, LoaderConfig};
pub use data::{load_dataset, DataLoader, LoaderError};

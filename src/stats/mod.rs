//! Stats module - per-year delay statistics

mod calculator;

pub use calculator::{
    StatsCalculator, StatsError, YearComparison, YearStats, SIGNIFICANCE_THRESHOLD,
};

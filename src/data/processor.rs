//! Data Processor Module
//! Cleans the combined flight table and builds the grouped tables behind each
//! dashboard chart.

use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;

/// Delay-cause columns reported per carrier.
pub const DELAY_CAUSES: [&str; 5] = [
    "CARRIER_DELAY",
    "WEATHER_DELAY",
    "NAS_DELAY",
    "SECURITY_DELAY",
    "LATE_AIRCRAFT_DELAY",
];

/// Columns whose missing values mean "no delay".
const ZERO_FILL: [&str; 7] = [
    "CARRIER_DELAY",
    "WEATHER_DELAY",
    "NAS_DELAY",
    "SECURITY_DELAY",
    "LATE_AIRCRAFT_DELAY",
    "TAXI_IN",
    "TAXI_OUT",
];

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("{aggregate} requires missing column(s): {}", .columns.join(", "))]
    MissingColumns {
        aggregate: &'static str,
        columns: Vec<String>,
    },
}

/// Grouped tables consumed by the dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    CarrierDelays,
    MonthlyAggregates,
    AirportDelays,
    DailyDelayTrend,
    CancellationReasons,
    DistanceVsDelay,
    DepartureDelayByHour,
    CancellationRateByCarrier,
    AirlinesMostDelays,
    TaxiTimes,
    TaxiHourly,
    YearlyTrend,
    OriginDestCounts,
}

impl Aggregate {
    pub const ALL: [Aggregate; 13] = [
        Aggregate::CarrierDelays,
        Aggregate::MonthlyAggregates,
        Aggregate::AirportDelays,
        Aggregate::DailyDelayTrend,
        Aggregate::CancellationReasons,
        Aggregate::DistanceVsDelay,
        Aggregate::DepartureDelayByHour,
        Aggregate::CancellationRateByCarrier,
        Aggregate::AirlinesMostDelays,
        Aggregate::TaxiTimes,
        Aggregate::TaxiHourly,
        Aggregate::YearlyTrend,
        Aggregate::OriginDestCounts,
    ];

    /// Stable identifier, e.g. `carrier_delays`.
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::CarrierDelays => "carrier_delays",
            Aggregate::MonthlyAggregates => "monthly_aggregates",
            Aggregate::AirportDelays => "airport_delays",
            Aggregate::DailyDelayTrend => "daily_delay_trend",
            Aggregate::CancellationReasons => "cancellation_reasons",
            Aggregate::DistanceVsDelay => "distance_vs_delay",
            Aggregate::DepartureDelayByHour => "departure_delay_by_hour",
            Aggregate::CancellationRateByCarrier => "cancellation_percentage_by_carrier",
            Aggregate::AirlinesMostDelays => "airlines_most_delays",
            Aggregate::TaxiTimes => "taxi_times",
            Aggregate::TaxiHourly => "taxi_hourly",
            Aggregate::YearlyTrend => "yearly_trend",
            Aggregate::OriginDestCounts => "origin_dest_counts",
        }
    }

    /// Chart title.
    pub fn title(self) -> &'static str {
        match self {
            Aggregate::CarrierDelays => "Average Delays by Carrier",
            Aggregate::MonthlyAggregates => "Monthly Delays and Cancellations",
            Aggregate::AirportDelays => "Average Departure Delays by Airport",
            Aggregate::DailyDelayTrend => "Trend of Average Arrival Delay Over Time",
            Aggregate::CancellationReasons => "Flight Cancellations by Reason",
            Aggregate::DistanceVsDelay => "Distance vs. Arrival Delay",
            Aggregate::DepartureDelayByHour => "Average Departure Delay by Time of Day",
            Aggregate::CancellationRateByCarrier => "Cancellations Percentage by Carrier",
            Aggregate::AirlinesMostDelays => "Airlines with the Most Delays",
            Aggregate::TaxiTimes => "Taxi Out vs Taxi In Times",
            Aggregate::TaxiHourly => "Average Taxi Time (Hourly)",
            Aggregate::YearlyTrend => "Flight Metrics by Year",
            Aggregate::OriginDestCounts => "Top Flight Routes by Count",
        }
    }

    /// Source columns the aggregate reads. `year_col` is the synthetic year column.
    pub fn required_columns(self, year_col: &str) -> Vec<&str> {
        match self {
            Aggregate::CarrierDelays => {
                let mut cols = vec!["OP_CARRIER"];
                cols.extend(DELAY_CAUSES);
                cols
            }
            Aggregate::MonthlyAggregates => vec!["Month", "DEP_DELAY", "ARR_DELAY", "CANCELLED"],
            Aggregate::AirportDelays => vec!["ORIGIN", "DEP_DELAY"],
            Aggregate::DailyDelayTrend => vec!["FL_DATE", "ARR_DELAY"],
            Aggregate::CancellationReasons => vec!["CANCELLATION_CODE"],
            Aggregate::DistanceVsDelay => vec!["DISTANCE", "ARR_DELAY", "OP_CARRIER"],
            Aggregate::DepartureDelayByHour => vec!["Hour", "DEP_DELAY"],
            Aggregate::CancellationRateByCarrier => vec!["OP_CARRIER", "CANCELLED"],
            Aggregate::AirlinesMostDelays => vec!["OP_CARRIER", "ARR_DELAY"],
            Aggregate::TaxiTimes => vec!["OP_CARRIER", "TAXI_IN", "TAXI_OUT"],
            Aggregate::TaxiHourly => vec!["Hour", "TAXI_IN", "TAXI_OUT"],
            Aggregate::YearlyTrend => vec![year_col, "DEP_DELAY", "ARR_DELAY"],
            Aggregate::OriginDestCounts => vec!["ORIGIN", "DEST"],
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Handles data cleaning and aggregation over the combined table.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    year_column: String,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new("Year")
    }
}

impl DataProcessor {
    pub fn new(year_column: impl Into<String>) -> Self {
        Self {
            year_column: year_column.into(),
        }
    }

    /// Fill missing delay-cause and taxi values with 0 and missing
    /// cancellation codes with `"None"`. Absent columns are left alone.
    pub fn fill_missing(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut exprs: Vec<Expr> = ZERO_FILL
            .iter()
            .filter(|name| has_column(df, name))
            .map(|name| col(*name).fill_null(lit(0)))
            .collect();

        if has_column(df, "CANCELLATION_CODE") {
            exprs.push(
                col("CANCELLATION_CODE")
                    .cast(DataType::String)
                    .fill_null(lit("None")),
            );
        }

        if exprs.is_empty() {
            return Ok(df.clone());
        }
        Ok(df.clone().lazy().with_columns(exprs).collect()?)
    }

    /// Add `Month` (`YYYY-MM` of `FL_DATE`) and `Hour` (`CRS_DEP_TIME / 100`)
    /// when their source columns exist.
    pub fn derive_columns(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut exprs = Vec::new();

        if has_column(df, "FL_DATE") {
            exprs.push(
                col("FL_DATE")
                    .cast(DataType::String)
                    .str()
                    .slice(lit(0), lit(7))
                    .alias("Month"),
            );
        }
        if has_column(df, "CRS_DEP_TIME") {
            exprs.push(
                col("CRS_DEP_TIME")
                    .cast(DataType::Int64)
                    .floor_div(lit(100i64))
                    .alias("Hour"),
            );
        }

        if exprs.is_empty() {
            return Ok(df.clone());
        }
        Ok(df.clone().lazy().with_columns(exprs).collect()?)
    }

    /// Clean and derive in one pass, ready for aggregation.
    pub fn prepare(df: &DataFrame, fill_missing: bool) -> Result<DataFrame, ProcessorError> {
        let df = if fill_missing {
            Self::fill_missing(df)?
        } else {
            df.clone()
        };
        Self::derive_columns(&df)
    }

    /// Required columns of `kind` that `df` lacks.
    pub fn missing_columns(&self, df: &DataFrame, kind: Aggregate) -> Vec<String> {
        kind.required_columns(&self.year_column)
            .into_iter()
            .filter(|name| !has_column(df, name))
            .map(str::to_string)
            .collect()
    }

    /// Build one aggregate table.
    pub fn aggregate(&self, df: &DataFrame, kind: Aggregate) -> Result<DataFrame, ProcessorError> {
        let missing = self.missing_columns(df, kind);
        if !missing.is_empty() {
            return Err(ProcessorError::MissingColumns {
                aggregate: kind.name(),
                columns: missing,
            });
        }

        let lf = df.clone().lazy();
        let by_keys = SortMultipleOptions::default();

        let out = match kind {
            Aggregate::CarrierDelays => lf
                .group_by([col("OP_CARRIER")])
                .agg(DELAY_CAUSES.iter().map(|c| col(*c).mean()).collect::<Vec<_>>())
                .sort(["OP_CARRIER"], by_keys),
            Aggregate::MonthlyAggregates => lf
                .group_by([col("Month")])
                .agg([
                    col("DEP_DELAY").mean(),
                    col("ARR_DELAY").mean(),
                    col("CANCELLED").mean(),
                ])
                .sort(["Month"], by_keys),
            Aggregate::AirportDelays => lf
                .group_by([col("ORIGIN")])
                .agg([col("DEP_DELAY").mean().alias("Average Departure Delay")])
                .sort(["ORIGIN"], by_keys),
            Aggregate::DailyDelayTrend => lf
                .group_by([col("FL_DATE")])
                .agg([col("ARR_DELAY").mean().alias("Average Arrival Delay")])
                .sort(["FL_DATE"], by_keys),
            Aggregate::CancellationReasons => lf
                .group_by([col("CANCELLATION_CODE").alias("Reason")])
                .agg([len().alias("Count")])
                .sort(
                    ["Count", "Reason"],
                    SortMultipleOptions::default().with_order_descending_multi([true, false]),
                ),
            Aggregate::DistanceVsDelay => lf
                .group_by([col("DISTANCE"), col("ARR_DELAY"), col("OP_CARRIER")])
                .agg([len().alias("Count")])
                .sort(["DISTANCE", "ARR_DELAY", "OP_CARRIER"], by_keys),
            Aggregate::DepartureDelayByHour => lf
                .group_by([col("Hour")])
                .agg([col("DEP_DELAY").mean().alias("Average Departure Delay")])
                .sort(["Hour"], by_keys),
            Aggregate::CancellationRateByCarrier => lf
                .group_by([col("OP_CARRIER")])
                .agg([col("CANCELLED").mean().alias("Cancellation Rate")])
                .sort(["OP_CARRIER"], by_keys),
            Aggregate::AirlinesMostDelays => lf
                .group_by([col("OP_CARRIER")])
                .agg([col("ARR_DELAY").mean()])
                .sort(
                    ["ARR_DELAY"],
                    SortMultipleOptions::default()
                        .with_order_descending(true)
                        .with_nulls_last(true),
                ),
            Aggregate::TaxiTimes => lf
                .group_by([col("OP_CARRIER")])
                .agg([col("TAXI_IN").mean(), col("TAXI_OUT").mean()])
                .sort(["OP_CARRIER"], by_keys),
            Aggregate::TaxiHourly => lf
                .group_by([col("Hour")])
                .agg([col("TAXI_IN").mean(), col("TAXI_OUT").mean()])
                .sort(["Hour"], by_keys),
            Aggregate::YearlyTrend => lf
                .group_by([col(self.year_column.as_str())])
                .agg([
                    len().alias("Flights"),
                    col("DEP_DELAY").mean(),
                    col("ARR_DELAY").mean(),
                ])
                .sort([self.year_column.as_str()], by_keys),
            Aggregate::OriginDestCounts => lf
                .group_by([col("ORIGIN"), col("DEST")])
                .agg([len().alias("Flight Count")])
                .sort(
                    ["Flight Count", "ORIGIN", "DEST"],
                    SortMultipleOptions::default()
                        .with_order_descending_multi([true, false, false]),
                ),
        };

        Ok(out.collect()?)
    }

    /// Build every aggregate whose source columns are present, in parallel.
    ///
    /// Results follow the order of [`Aggregate::ALL`].
    pub fn compute_available(
        &self,
        df: &DataFrame,
    ) -> Result<Vec<(Aggregate, DataFrame)>, ProcessorError> {
        let kinds: Vec<Aggregate> = Aggregate::ALL
            .into_iter()
            .filter(|kind| {
                let missing = self.missing_columns(df, *kind);
                if !missing.is_empty() {
                    log::debug!("Skipping {kind}: missing {}", missing.join(", "));
                }
                missing.is_empty()
            })
            .collect();

        kinds
            .par_iter()
            .map(|kind| self.aggregate(df, *kind).map(|out| (*kind, out)))
            .collect()
    }
}

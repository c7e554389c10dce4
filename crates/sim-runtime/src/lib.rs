#![deny(warnings)]

//! Month runner for the Ascendancy economy.
//!
//! [`Region::run_calculations`] loads one region's tables, evolves sectors,
//! population and metrics, and writes the results back. [`Planet`] runs every
//! configured region in order and aggregates their metrics into the union
//! table.

pub mod config;
pub mod demo;
pub mod planet;
pub mod reader;
pub mod region;

pub use config::{
    builtin_config, config_from_file, config_from_yaml_str, ConfigLoadError, BUILTIN_CONFIG,
};
pub use planet::{
    combine, deltas, Aggregates, Aggregation, AggregationRegistry, MetricDelta, Planet,
    PlanetReport, WEIGHTS_ROW,
};
pub use reader::{write_logged, CellReader, ReadLog, WriteFailure};
pub use region::{Region, RegionError, RegionInputs, RegionOutcome, RegionTables, Stage};

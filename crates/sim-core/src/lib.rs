#![deny(warnings)]

//! Core registries, storage and randomness abstractions for the Ascendancy
//! end-of-month engine.
//!
//! The engine never touches files or spreadsheets directly: every value it
//! reads or writes goes through [`CellStore`], and every random draw through
//! [`RandomSource`], so both can be replaced in tests.

pub mod cell;
pub mod config;
pub mod random;
pub mod registry;
pub mod store;

pub use cell::{format_count, format_value, parse_number, round_to, CellError, CellRef, NotANumber};
pub use config::{
    validate_config, ConfigError, GdpComposition, HappinessPolicy, InfrastructureRatios,
    PlanetConfig, ReadPolicy, RegionConfig, SectorTuning, SharedTables, SimConfig, Tuning,
};
pub use random::{FixedDraw, RandomSource, SeededRandom};
pub use registry::{
    GroupSet, GroupTable, Keyed, KeyedTable, Metric, MetricTable, PopulationGroup, Sector,
    SectorTable, Tax, TaxClass, TaxTable,
};
pub use store::{CellStore, MemoryStore, Row, StoreError, Table};

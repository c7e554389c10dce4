#![deny(warnings)]

//! Economic models for the end-of-month pass.
//!
//! Every function here is pure apart from the injected [`RandomSource`]:
//! - tax schedule → policy coefficients
//! - population shares, trust and income
//! - sector output and GDP
//! - key macro metrics
//!
//! [`RandomSource`]: sim_core::RandomSource

pub mod metrics;
pub mod population;
pub mod sectors;
pub mod tax;

pub use metrics::{update_metrics, MetricContext};
pub use population::{update_population, GroupState, PopulationSummary, TrustDeltas};
pub use sectors::{update_sectors, SectorFeedback, SectorInputs, SectorOutcome};
pub use tax::{derive_coefficients, scale_rate, PolicyContext, TaxCoefficients, TaxEffect};

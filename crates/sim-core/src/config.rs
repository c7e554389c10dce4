//! Simulation configuration: policies, tuning constants and table layout.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::Metric;

/// Top-level configuration for one end-of-month run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the deterministic RNG.
    pub rng_seed: u64,
    /// Month being closed; only used to label the audit trail.
    pub month: Option<NaiveDate>,
    pub read_policy: ReadPolicy,
    pub happiness: HappinessPolicy,
    pub gdp: GdpComposition,
    pub tuning: Tuning,
    pub shared_tables: SharedTables,
    pub regions: Vec<RegionConfig>,
    pub planet: PlanetConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            month: None,
            read_policy: ReadPolicy::default(),
            happiness: HappinessPolicy::default(),
            gdp: GdpComposition::default(),
            tuning: Tuning::default(),
            shared_tables: SharedTables::default(),
            regions: Vec::new(),
            planet: PlanetConfig::default(),
        }
    }
}

/// What to do when a cell is missing or malformed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Default the value to zero, warn once, keep going.
    #[default]
    Lenient,
    /// Abort the region on the first bad cell.
    Strict,
}

/// Post-processing applied to the computed population happiness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HappinessPolicy {
    #[default]
    Unclamped,
    Clamped { min: f64, max: f64 },
}

impl HappinessPolicy {
    /// The band older rule sets used.
    pub const LEGACY: HappinessPolicy = HappinessPolicy::Clamped { min: 0.4, max: 0.6 };

    pub fn apply(self, happiness: f64) -> f64 {
        match self {
            HappinessPolicy::Unclamped => happiness,
            HappinessPolicy::Clamped { min, max } => happiness.clamp(min, max),
        }
    }
}

/// Which derived sectors count towards GDP. Ordinary sectors always do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdpComposition {
    pub include_public_service: bool,
    pub include_illicit: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Baseline monthly drift applied by most metric rules.
    pub base_change: f64,
    /// Decimal places kept when persisting fractional values.
    pub precision: u32,
    pub sector: SectorTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_change: 0.01,
            precision: 4,
            sector: SectorTuning::default(),
        }
    }
}

/// Input shares and feedback weights for the ordinary sector update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorTuning {
    pub one_time_share: f64,
    pub gov_spending_share: f64,
    pub consumer_spending: f64,
    pub happiness: f64,
    pub primary_education: f64,
    pub secondary_education: f64,
    pub tertiary_education: f64,
    pub crime: f64,
    pub productivity: f64,
    pub life_expectancy: f64,
    pub interest_rate: f64,
}

impl Default for SectorTuning {
    fn default() -> Self {
        Self {
            one_time_share: 0.25,
            gov_spending_share: 0.60,
            consumer_spending: 0.4,
            happiness: 0.025,
            primary_education: 0.03,
            secondary_education: 0.02,
            tertiary_education: 0.01,
            crime: 0.015,
            productivity: 0.10,
            life_expectancy: 0.035,
            interest_rate: 0.075,
        }
    }
}

/// Tables read by every region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedTables {
    pub tax_effects: String,
    pub end_of_month_totals: String,
}

impl Default for SharedTables {
    fn default() -> Self {
        Self {
            tax_effects: "Tax Effects".to_string(),
            end_of_month_totals: "End of Month Totals".to_string(),
        }
    }
}

/// Persons served by one facility of each kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureRatios {
    pub police_station: f64,
    pub power_station: f64,
    pub internet_tower: f64,
    pub communication_tower: f64,
    pub hospital: f64,
}

impl Default for InfrastructureRatios {
    fn default() -> Self {
        Self {
            police_station: 300_000.0,
            power_station: 500_000.0,
            internet_tower: 100_000.0,
            communication_tower: 250_000.0,
            hospital: 150_000.0,
        }
    }
}

impl InfrastructureRatios {
    fn all(&self) -> [f64; 5] {
        [
            self.police_station,
            self.power_station,
            self.internet_tower,
            self.communication_tower,
            self.hospital,
        ]
    }
}

/// Table layout for one region. A missing table leaves the region unrunnable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub name: String,
    pub population_table: Option<String>,
    pub sector_table: Option<String>,
    pub metric_table: Option<String>,
    pub tax_table: Option<String>,
    pub ratios: InfrastructureRatios,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetConfig {
    pub name: String,
    pub output_table: String,
    /// Row of each region's metric table used as the aggregation weight.
    pub weight_row: String,
    /// Summed across regions.
    pub absolute_metrics: Vec<Metric>,
    /// Weighted by `weight_row` across regions.
    pub rate_metrics: Vec<Metric>,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        use Metric::*;
        Self {
            name: "Planet".to_string(),
            output_table: "Planet Metrics".to_string(),
            weight_row: Population.to_string(),
            absolute_metrics: vec![
                Population,
                Gdp,
                ConsumerSpending,
                PoliceStationsNeeded,
                PowerStationsNeeded,
                InternetTowersNeeded,
                CommunicationTowersNeeded,
                HospitalsNeeded,
            ],
            rate_metrics: vec![
                Inflation,
                Unemployment,
                Productivity,
                FinancialMalpractice,
                PovertyRate,
                LifeExpectancy,
                HomeownershipRate,
                CrimeRate,
                PrimaryEducation,
                SecondaryEducation,
                TertiaryEducation,
                BigMacIndex,
                InterestRate,
                AverageIncome,
                PopGrowthRate,
                PopulationHappiness,
            ],
        }
    }
}

/// Configuration invariants violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("precision {0} exceeds the supported maximum of 10")]
    PrecisionTooLarge(u32),
    #[error("infrastructure ratio for region {0} must be > 0")]
    NonPositiveRatio(String),
    #[error("happiness clamp is empty: min {min} > max {max}")]
    EmptyClamp { min: f64, max: f64 },
    #[error("metric {0} is listed as both absolute and rate")]
    AmbiguousAggregation(Metric),
    #[error("duplicate region name: {0}")]
    DuplicateRegion(String),
    #[error("non-finite tuning value")]
    NonFinite,
}

/// Validate a configuration before running.
pub fn validate_config(cfg: &SimConfig) -> Result<(), ConfigError> {
    if cfg.tuning.precision > 10 {
        return Err(ConfigError::PrecisionTooLarge(cfg.tuning.precision));
    }
    let s = &cfg.tuning.sector;
    let tuning = [
        cfg.tuning.base_change,
        s.one_time_share,
        s.gov_spending_share,
        s.consumer_spending,
        s.happiness,
        s.primary_education,
        s.secondary_education,
        s.tertiary_education,
        s.crime,
        s.productivity,
        s.life_expectancy,
        s.interest_rate,
    ];
    if tuning.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::NonFinite);
    }
    if let HappinessPolicy::Clamped { min, max } = cfg.happiness {
        if !(min <= max) {
            return Err(ConfigError::EmptyClamp { min, max });
        }
    }
    let mut names = BTreeSet::new();
    for r in &cfg.regions {
        if !names.insert(r.name.as_str()) {
            return Err(ConfigError::DuplicateRegion(r.name.clone()));
        }
        if r.ratios.all().iter().any(|v| !(*v > 0.0)) {
            return Err(ConfigError::NonPositiveRatio(r.name.clone()));
        }
    }
    let absolute: BTreeSet<Metric> = cfg.planet.absolute_metrics.iter().copied().collect();
    if let Some(m) = cfg
        .planet
        .rate_metrics
        .iter()
        .find(|m| absolute.contains(m))
    {
        return Err(ConfigError::AmbiguousAggregation(*m));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Keyed;

    fn region(name: &str) -> RegionConfig {
        RegionConfig {
            name: name.to_string(),
            ..RegionConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        let mut cfg = SimConfig::default();
        cfg.regions.push(region("Novum Centrum"));
        validate_config(&cfg).unwrap();
    }

    #[test]
    fn default_planet_covers_every_metric_once() {
        let p = PlanetConfig::default();
        let mut all: Vec<Metric> = p.absolute_metrics.clone();
        all.extend(p.rate_metrics.iter().copied());
        all.sort();
        assert_eq!(all, Metric::ALL.to_vec());
    }

    #[test]
    fn rejects_duplicate_regions_and_bad_ratios() {
        let mut cfg = SimConfig::default();
        cfg.regions = vec![region("A"), region("A")];
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::DuplicateRegion("A".into()))
        );
        let mut bad = region("B");
        bad.ratios.hospital = 0.0;
        cfg.regions = vec![bad];
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::NonPositiveRatio("B".into()))
        );
    }

    #[test]
    fn rejects_metric_in_both_lists() {
        let mut cfg = SimConfig::default();
        cfg.planet.rate_metrics.push(Metric::Gdp);
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::AmbiguousAggregation(Metric::Gdp))
        );
    }

    #[test]
    fn happiness_policy() {
        assert_eq!(HappinessPolicy::Unclamped.apply(0.9), 0.9);
        assert_eq!(HappinessPolicy::LEGACY.apply(0.9), 0.6);
        assert_eq!(HappinessPolicy::LEGACY.apply(0.1), 0.4);
        let mut cfg = SimConfig::default();
        cfg.happiness = HappinessPolicy::Clamped { min: 0.7, max: 0.2 };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::EmptyClamp { .. })
        ));
    }
}

//! One region's end-of-month pipeline: load → compute → persist.

use std::fmt;
use std::mem;

use serde::Serialize;
use sim_core::{
    format_count, format_value, CellError, CellStore, GroupTable, InfrastructureRatios, Keyed,
    KeyedTable, Metric, MetricTable, PopulationGroup, RandomSource, RegionConfig, Sector,
    SectorTable, SimConfig, Tax, TaxTable,
};
use sim_econ::{
    derive_coefficients, scale_rate, update_metrics, update_population, update_sectors,
    GroupState, MetricContext, PolicyContext, PopulationSummary, SectorFeedback, SectorInputs,
    SectorOutcome, TaxEffect, TrustDeltas,
};
use thiserror::Error;

use crate::reader::{write_logged, CellReader, ReadLog, WriteFailure};

pub const RATE_COLUMN: &str = "Rate";
pub const EFFECT_COLUMN: &str = "Effect on Pop";
pub const EFFECT_2_COLUMN: &str = "Effect on Pop 2";
pub const TRUST_COLUMN: &str = "Trust in Government";
pub const SIZE_COLUMN: &str = "Size";
pub const INCOME_COLUMN: &str = "Avg Income";
pub const BASE_SIZE_COLUMN: &str = "Base Size";
pub const ONE_TIME_COLUMN: &str = "One Time";
pub const GOV_SPENDING_COLUMN: &str = "Gov Spending";
pub const CS_EFFECT_COLUMN: &str = "CS Effect";
pub const VALUE_COLUMN: &str = "Value";
pub const TOTAL_CHANGE_COLUMN: &str = "Total Change";

/// Rows of the end-of-month totals table besides the group rows.
pub const EVERYONE_ROW: &str = "Everyone";
pub const ECONOMIC_GROWTH_ROW: &str = "Economic Growth";
pub const POPULATION_GROWTH_ROW: &str = "Population Growth";

/// Linear progression of a region run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Idle,
    LoadingInputs,
    ComputingPolicy,
    ComputingSectors,
    ComputingPopulation,
    ComputingMetrics,
    Persisting,
    Done,
}

impl Stage {
    pub fn next(self) -> Stage {
        match self {
            Stage::Idle => Stage::LoadingInputs,
            Stage::LoadingInputs => Stage::ComputingPolicy,
            Stage::ComputingPolicy => Stage::ComputingSectors,
            Stage::ComputingSectors => Stage::ComputingPopulation,
            Stage::ComputingPopulation => Stage::ComputingMetrics,
            Stage::ComputingMetrics => Stage::Persisting,
            Stage::Persisting | Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    /// The region lacks a table mapping and cannot run.
    #[error("region {region:?} has no {field} configured")]
    ConfigurationGap { region: String, field: &'static str },
    /// Strict mode only: a cell could not be read.
    #[error("region {region:?} failed while {stage}: {source}")]
    Read {
        region: String,
        stage: Stage,
        #[source]
        source: CellError,
    },
}

/// Table names for one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionTables {
    pub population: String,
    pub sectors: String,
    pub metrics: String,
    pub taxes: String,
}

/// Everything read from the store at the start of the month.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionInputs {
    pub tax_rates: TaxTable<f64>,
    pub tax_effects: TaxTable<TaxEffect>,
    pub trust_deltas: TrustDeltas,
    pub end_of_month_growth: f64,
    pub population_change: f64,
    pub groups: GroupTable<GroupState>,
    pub sectors: SectorTable<SectorInputs>,
    pub metrics: MetricTable<f64>,
}

/// What one region run produced.
#[derive(Clone, Debug)]
pub struct RegionOutcome {
    pub region: String,
    pub stage: Stage,
    pub policy: PolicyContext,
    pub sectors: SectorOutcome,
    pub population: PopulationSummary,
    pub groups: GroupTable<GroupState>,
    pub old_metrics: MetricTable<f64>,
    pub metrics: MetricTable<f64>,
    pub read_issues: Vec<CellError>,
    pub write_failures: Vec<WriteFailure>,
}

/// A geographic unit with its own population, sectors, metrics and taxes.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub name: String,
    pub tables: RegionTables,
    pub ratios: InfrastructureRatios,
}

/// Metrics that are only ever written; their previous value is never used.
fn is_output_only(metric: Metric) -> bool {
    matches!(
        metric,
        Metric::AverageIncome
            | Metric::PopGrowthRate
            | Metric::PoliceStationsNeeded
            | Metric::PowerStationsNeeded
            | Metric::InternetTowersNeeded
            | Metric::CommunicationTowersNeeded
            | Metric::HospitalsNeeded
    )
}

struct Progress<'a> {
    region: &'a str,
    stage: Stage,
}

impl Progress<'_> {
    fn advance(&mut self) {
        self.stage = self.stage.next();
        tracing::debug!(region = self.region, stage = %self.stage, "region stage");
    }

    fn read_error(&self, source: CellError) -> RegionError {
        RegionError::Read {
            region: self.region.to_string(),
            stage: self.stage,
            source,
        }
    }
}

impl Region {
    pub fn from_config(cfg: &RegionConfig) -> Result<Self, RegionError> {
        let require = |table: &Option<String>, field: &'static str| {
            table.clone().ok_or_else(|| RegionError::ConfigurationGap {
                region: cfg.name.clone(),
                field,
            })
        };
        Ok(Self {
            name: cfg.name.clone(),
            tables: RegionTables {
                population: require(&cfg.population_table, "population_table")?,
                sectors: require(&cfg.sector_table, "sector_table")?,
                metrics: require(&cfg.metric_table, "metric_table")?,
                taxes: require(&cfg.tax_table, "tax_table")?,
            },
            ratios: cfg.ratios.clone(),
        })
    }

    /// Read every input of the month.
    pub fn load_inputs<S: CellStore + ?Sized>(
        &self,
        reader: &mut CellReader<'_, S>,
        cfg: &SimConfig,
    ) -> Result<RegionInputs, CellError> {
        let t = &self.tables;
        let shared = &cfg.shared_tables;

        let mut tax_rates: TaxTable<f64> = KeyedTable::default();
        let mut tax_effects: TaxTable<TaxEffect> = KeyedTable::default();
        for &tax in Tax::ALL {
            tax_rates[tax] = scale_rate(reader.number(&t.taxes, tax.label(), RATE_COLUMN)?);
            tax_effects[tax] = TaxEffect {
                effect1: reader.number(&shared.tax_effects, tax.label(), EFFECT_COLUMN)?,
                effect2: reader.number(&shared.tax_effects, tax.label(), EFFECT_2_COLUMN)?,
            };
        }

        let totals = &shared.end_of_month_totals;
        let mut raw_deltas: GroupTable<f64> = KeyedTable::default();
        for &group in PopulationGroup::ALL {
            if group.mirrored_from().is_none() {
                raw_deltas[group] = reader.number(totals, group.label(), TOTAL_CHANGE_COLUMN)?;
            }
        }
        let everyone = reader.number(totals, EVERYONE_ROW, TOTAL_CHANGE_COLUMN)?;
        let end_of_month_growth = reader.number(totals, ECONOMIC_GROWTH_ROW, TOTAL_CHANGE_COLUMN)?;
        let population_change = reader.number(totals, POPULATION_GROWTH_ROW, TOTAL_CHANGE_COLUMN)?;

        let mut groups: GroupTable<GroupState> = KeyedTable::default();
        for &group in PopulationGroup::ALL {
            let row = group.label();
            groups[group] = GroupState {
                trust: reader.number(&t.population, row, TRUST_COLUMN)?,
                size: reader.number(&t.population, row, SIZE_COLUMN)?,
                avg_income: if group.is_income_tier() {
                    Some(reader.number(&t.population, row, INCOME_COLUMN)?)
                } else {
                    None
                },
            };
        }

        let mut sectors: SectorTable<SectorInputs> = KeyedTable::default();
        for &sector in Sector::ALL {
            let row = sector.label();
            sectors[sector] = match sector {
                Sector::Illicit => SectorInputs::default(),
                Sector::PublicService => SectorInputs {
                    gov_spending: reader.number(&t.sectors, row, GOV_SPENDING_COLUMN)?,
                    ..SectorInputs::default()
                },
                _ => SectorInputs {
                    base_size: reader.number(&t.sectors, row, BASE_SIZE_COLUMN)?,
                    one_time: reader.number(&t.sectors, row, ONE_TIME_COLUMN)?,
                    gov_spending: reader.number(&t.sectors, row, GOV_SPENDING_COLUMN)?,
                    cs_effect: reader.number(&t.sectors, row, CS_EFFECT_COLUMN)?,
                },
            };
        }

        let mut metrics: MetricTable<f64> = KeyedTable::default();
        for &metric in Metric::ALL {
            if !is_output_only(metric) {
                metrics[metric] = reader.number(&t.metrics, metric.label(), VALUE_COLUMN)?;
            }
        }

        Ok(RegionInputs {
            tax_rates,
            tax_effects,
            trust_deltas: TrustDeltas::new(everyone, raw_deltas),
            end_of_month_growth,
            population_change,
            groups,
            sectors,
            metrics,
        })
    }

    /// Run the full pipeline for this region against `store`.
    pub fn run_calculations<S, R>(
        &self,
        store: &mut S,
        rng: &mut R,
        cfg: &SimConfig,
    ) -> Result<RegionOutcome, RegionError>
    where
        S: CellStore + ?Sized,
        R: RandomSource + ?Sized,
    {
        self.run_with_log(store, rng, cfg, &mut ReadLog::default())
    }

    /// As [`Region::run_calculations`], continuing a cycle-wide [`ReadLog`].
    /// The outcome lists only cells first defaulted by this region.
    pub fn run_with_log<S, R>(
        &self,
        store: &mut S,
        rng: &mut R,
        cfg: &SimConfig,
        log: &mut ReadLog,
    ) -> Result<RegionOutcome, RegionError>
    where
        S: CellStore + ?Sized,
        R: RandomSource + ?Sized,
    {
        let mut progress = Progress {
            region: &self.name,
            stage: Stage::Idle,
        };
        tracing::info!(region = %self.name, "running end of month");

        progress.advance();
        let start = log.len();
        let mut reader = CellReader::with_log(&*store, cfg.read_policy, mem::take(log));
        let loaded = self.load_inputs(&mut reader, cfg);
        *log = reader.into_log();
        let inputs = loaded.map_err(|e| progress.read_error(e))?;
        let read_issues = log.issues()[start..].to_vec();

        progress.advance();
        let policy = PolicyContext {
            tax: derive_coefficients(&inputs.tax_rates, &inputs.tax_effects),
            end_of_month_growth: inputs.end_of_month_growth,
            population_change: inputs.population_change,
        };

        progress.advance();
        let old = &inputs.metrics;
        let feedback = SectorFeedback {
            happiness: old[Metric::PopulationHappiness],
            primary_education: old[Metric::PrimaryEducation],
            secondary_education: old[Metric::SecondaryEducation],
            tertiary_education: old[Metric::TertiaryEducation],
            crime_rate: old[Metric::CrimeRate],
            productivity: old[Metric::Productivity],
            life_expectancy: old[Metric::LifeExpectancy],
            interest_rate: old[Metric::InterestRate],
        };
        let sectors = update_sectors(
            &inputs.sectors,
            old[Metric::Gdp],
            &policy,
            &feedback,
            &cfg.tuning.sector,
            cfg.gdp,
            rng,
        );

        progress.advance();
        let mut groups = inputs.groups.clone();
        let population = update_population(
            &mut groups,
            &inputs.trust_deltas,
            sectors.gdp_growth,
            cfg.happiness,
            rng,
        );

        progress.advance();
        let ctx = MetricContext {
            old,
            policy: &policy,
            ratios: &self.ratios,
            base_change: cfg.tuning.base_change,
            happiness: population.happiness,
            gdp_growth: sectors.gdp_growth,
            final_gdp: sectors.final_gdp,
            weighted_avg_income: population.weighted_avg_income,
            low_income_trust: groups[PopulationGroup::LowIncome].trust,
            high_income_trust: groups[PopulationGroup::HighIncome].trust,
            precision: cfg.tuning.precision,
        };
        let metrics = update_metrics(&ctx, rng);

        progress.advance();
        let write_failures = self.persist(
            store,
            &groups,
            &sectors.outputs,
            &metrics,
            cfg.tuning.precision,
        );

        progress.advance();
        tracing::info!(
            region = %self.name,
            gdp = sectors.final_gdp,
            gdp_growth = sectors.gdp_growth,
            happiness = population.happiness,
            read_issues = read_issues.len(),
            write_failures = write_failures.len(),
            "region complete"
        );
        Ok(RegionOutcome {
            region: self.name.clone(),
            stage: progress.stage,
            policy,
            sectors,
            population,
            groups,
            old_metrics: inputs.metrics,
            metrics,
            read_issues,
            write_failures,
        })
    }

    /// Write population, sectors and metrics back. Every write is attempted.
    pub fn persist<S: CellStore + ?Sized>(
        &self,
        store: &mut S,
        groups: &GroupTable<GroupState>,
        sectors: &SectorTable<f64>,
        metrics: &MetricTable<f64>,
        precision: u32,
    ) -> Vec<WriteFailure> {
        let t = &self.tables;
        let mut failures = Vec::new();
        let mut write = |table: &str, row: &str, column: &str, value: String| {
            write_logged(store, &mut failures, table, row, column, &value);
        };
        for (group, state) in groups.iter() {
            let row = group.label();
            write(&t.population, row, SIZE_COLUMN, format_value(state.size, precision));
            write(&t.population, row, TRUST_COLUMN, format_value(state.trust, precision));
            if let Some(income) = state.avg_income {
                write(&t.population, row, INCOME_COLUMN, format_value(income, precision));
            }
        }
        for (sector, value) in sectors.iter() {
            let rendered = format_value(*value, precision);
            write(&t.sectors, sector.label(), BASE_SIZE_COLUMN, rendered);
        }
        for (metric, value) in metrics.iter() {
            let rendered = if metric.is_count() {
                format_count(*value)
            } else {
                format_value(*value, precision)
            };
            write(&t.metrics, metric.label(), VALUE_COLUMN, rendered);
        }
        failures
    }
}

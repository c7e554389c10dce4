//! Planet-level aggregation across regions.
//!
//! Absolute metrics are summed. Rate metrics are averaged using each region's
//! weight row (population by default):
//! `Σ(value × weight) / Σ(weight)`.

use std::collections::BTreeMap;
use std::mem;

use chrono::NaiveDate;
use sim_core::{
    format_count, format_value, CellError, CellStore, Keyed, Metric, RandomSource, ReadPolicy,
    SimConfig,
};

use crate::reader::{write_logged, CellReader, ReadLog, WriteFailure};
use crate::region::{Region, RegionError, RegionOutcome, Stage, VALUE_COLUMN};

/// Row of the planet table holding the summed weights.
pub const WEIGHTS_ROW: &str = "Weights";

/// How a metric combines across regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregation {
    Absolute,
    Rate,
}

/// Metric → aggregation rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationRegistry {
    rules: BTreeMap<Metric, Aggregation>,
}

impl AggregationRegistry {
    pub fn new(absolute: &[Metric], rate: &[Metric]) -> Self {
        let mut rules = BTreeMap::new();
        for &m in absolute {
            rules.insert(m, Aggregation::Absolute);
        }
        for &m in rate {
            rules.insert(m, Aggregation::Rate);
        }
        Self { rules }
    }

    pub fn rule(&self, metric: Metric) -> Option<Aggregation> {
        self.rules.get(&metric).copied()
    }

    pub fn metrics(&self) -> impl Iterator<Item = (Metric, Aggregation)> + '_ {
        self.rules.iter().map(|(m, a)| (*m, *a))
    }
}

/// Running totals for one metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Accumulator {
    total: f64,
    weight_sum: f64,
}

/// Aggregated planet values at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregates {
    pub values: BTreeMap<Metric, f64>,
    /// Sum of the region weights.
    pub weights: f64,
}

impl Aggregates {
    pub fn get(&self, metric: Metric) -> f64 {
        self.values.get(&metric).copied().unwrap_or(0.0)
    }
}

/// Fold `(value, weight)` samples for each metric into planet values.
pub fn combine<'a>(
    registry: &AggregationRegistry,
    samples: impl IntoIterator<Item = (f64, &'a BTreeMap<Metric, f64>)>,
) -> Aggregates {
    let mut acc: BTreeMap<Metric, Accumulator> = BTreeMap::new();
    let mut weights = 0.0;
    for (weight, values) in samples {
        weights += weight;
        for (metric, rule) in registry.metrics() {
            let value = values.get(&metric).copied().unwrap_or(0.0);
            let a = acc.entry(metric).or_default();
            a.weight_sum += weight;
            match rule {
                Aggregation::Absolute => a.total += value,
                Aggregation::Rate => a.total += value * weight,
            }
        }
    }
    let values = registry
        .metrics()
        .map(|(metric, rule)| {
            let a = acc.get(&metric).copied().unwrap_or_default();
            let v = match rule {
                Aggregation::Absolute => a.total,
                Aggregation::Rate if a.weight_sum != 0.0 => a.total / a.weight_sum,
                Aggregation::Rate => 0.0,
            };
            (metric, v)
        })
        .collect();
    Aggregates { values, weights }
}

/// Change of one aggregated metric over the run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricDelta {
    pub metric: Metric,
    pub before: f64,
    pub after: f64,
    /// `None` when `before` is zero.
    pub percent: Option<f64>,
}

/// Audit record of a planet run.
#[derive(Clone, Debug)]
pub struct PlanetReport {
    pub planet: String,
    pub month: Option<NaiveDate>,
    pub before: Aggregates,
    pub after: Aggregates,
    pub deltas: Vec<MetricDelta>,
    pub regions: Vec<RegionOutcome>,
    pub skipped_regions: Vec<String>,
    /// Every cell defaulted during the cycle, once each.
    pub read_issues: Vec<CellError>,
    /// Failed writes of the planet table.
    pub write_failures: Vec<WriteFailure>,
}

impl PlanetReport {
    pub fn all_write_failures(&self) -> impl Iterator<Item = &WriteFailure> {
        self.write_failures
            .iter()
            .chain(self.regions.iter().flat_map(|r| r.write_failures.iter()))
    }
}

/// An ordered set of regions aggregated into union-wide totals.
#[derive(Clone, Debug)]
pub struct Planet {
    pub name: String,
    pub regions: Vec<Region>,
    /// Regions dropped because their configuration is incomplete.
    pub skipped: Vec<String>,
    pub registry: AggregationRegistry,
    pub output_table: String,
    pub weight_row: String,
}

impl Planet {
    pub fn from_config(cfg: &SimConfig) -> Self {
        let mut regions = Vec::new();
        let mut skipped = Vec::new();
        for rc in &cfg.regions {
            match Region::from_config(rc) {
                Ok(region) => regions.push(region),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping region");
                    skipped.push(rc.name.clone());
                }
            }
        }
        Self {
            name: cfg.planet.name.clone(),
            regions,
            skipped,
            registry: AggregationRegistry::new(
                &cfg.planet.absolute_metrics,
                &cfg.planet.rate_metrics,
            ),
            output_table: cfg.planet.output_table.clone(),
            weight_row: cfg.planet.weight_row.clone(),
        }
    }

    /// Read every region's current metrics and aggregate them.
    pub fn aggregate<S: CellStore + ?Sized>(
        &self,
        reader: &mut CellReader<'_, S>,
    ) -> Result<Aggregates, RegionError> {
        let mut samples = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            let table = &region.tables.metrics;
            let read_err = |source| RegionError::Read {
                region: region.name.clone(),
                stage: Stage::Idle,
                source,
            };
            let mut values = BTreeMap::new();
            for (metric, _) in self.registry.metrics() {
                let v = reader
                    .number(table, metric.label(), VALUE_COLUMN)
                    .map_err(read_err)?;
                values.insert(metric, v);
            }
            let weight = match self.weight_metric().and_then(|m| values.get(&m)) {
                Some(&w) => w,
                None => reader
                    .number(table, &self.weight_row, VALUE_COLUMN)
                    .map_err(read_err)?,
            };
            samples.push((weight, values));
        }
        Ok(combine(&self.registry, samples.iter().map(|(w, v)| (*w, v))))
    }

    /// The registry metric named by the weight row, if it is aggregated.
    fn weight_metric(&self) -> Option<Metric> {
        Metric::from_label(&self.weight_row).filter(|m| self.registry.rule(*m).is_some())
    }

    fn snapshot<S: CellStore + ?Sized>(
        &self,
        store: &S,
        policy: ReadPolicy,
        log: &mut ReadLog,
    ) -> Result<Aggregates, RegionError> {
        let mut reader = CellReader::with_log(store, policy, mem::take(log));
        let agg = self.aggregate(&mut reader);
        *log = reader.into_log();
        agg
    }

    /// Snapshot, run every region in order, snapshot again, persist.
    pub fn run_end_of_month<S, R>(
        &self,
        store: &mut S,
        rng: &mut R,
        cfg: &SimConfig,
    ) -> Result<PlanetReport, RegionError>
    where
        S: CellStore + ?Sized,
        R: RandomSource + ?Sized,
    {
        tracing::info!(
            planet = %self.name,
            month = ?cfg.month,
            regions = self.regions.len(),
            "end of month started"
        );
        let mut log = ReadLog::default();

        let before = self.snapshot(&*store, cfg.read_policy, &mut log)?;

        let mut outcomes = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            outcomes.push(region.run_with_log(store, rng, cfg, &mut log)?);
        }

        let after = self.snapshot(&*store, cfg.read_policy, &mut log)?;

        let deltas = deltas(&before, &after);
        for d in &deltas {
            let (metric, before, after) = (d.metric, d.before, d.after);
            match d.percent {
                Some(pct) => tracing::info!(%metric, before, after, "{pct:+.2}%"),
                None => tracing::info!(%metric, before, after, "new"),
            }
        }

        let write_failures = self.persist(store, &after, cfg.tuning.precision);
        tracing::info!(planet = %self.name, "end of month complete");
        Ok(PlanetReport {
            planet: self.name.clone(),
            month: cfg.month,
            before,
            after,
            deltas,
            regions: outcomes,
            skipped_regions: self.skipped.clone(),
            read_issues: log.into_issues(),
            write_failures,
        })
    }

    /// Write aggregated values and the weight total to the planet table.
    pub fn persist<S: CellStore + ?Sized>(
        &self,
        store: &mut S,
        aggregates: &Aggregates,
        precision: u32,
    ) -> Vec<WriteFailure> {
        let mut failures = Vec::new();
        for (&metric, &value) in &aggregates.values {
            let rendered = if metric.is_count() {
                format_count(value)
            } else {
                format_value(value, precision)
            };
            let row = metric.label();
            write_logged(store, &mut failures, &self.output_table, row, VALUE_COLUMN, &rendered);
        }
        write_logged(
            store,
            &mut failures,
            &self.output_table,
            WEIGHTS_ROW,
            VALUE_COLUMN,
            &format_value(aggregates.weights, precision),
        );
        failures
    }
}

/// Per-metric before/after comparison, in registry order.
pub fn deltas(before: &Aggregates, after: &Aggregates) -> Vec<MetricDelta> {
    after
        .values
        .iter()
        .map(|(&metric, &a)| {
            let b = before.get(metric);
            MetricDelta {
                metric,
                before: b,
                after: a,
                percent: (b != 0.0).then(|| (a - b) / b * 100.0),
            }
        })
        .collect()
}

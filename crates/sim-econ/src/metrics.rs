//! Key metrics: the scalar macro indicators of a region.
//!
//! Every metric has an explicit rule in [`next_value`]; there is no fallback
//! arm. Inflation, Unemployment and Poverty Rate feed other rules with last
//! month's value, so the order in which metrics are evaluated never matters
//! except for Population, which is computed first.

use sim_core::{
    round_to, InfrastructureRatios, Keyed, KeyedTable, Metric, MetricTable, RandomSource,
};

use crate::tax::PolicyContext;

pub const LIFE_EXPECTANCY_BOUNDS: (f64, f64) = (35.6, 130.2);
pub const INFLATION_BOUNDS: (f64, f64) = (-0.2, 1.0);
pub const INTEREST_RATE_BOUNDS: (f64, f64) = (0.0, 0.25);
/// Bounds for metrics expressed as a share of the population.
pub const SHARE_BOUNDS: (f64, f64) = (0.0, 1.0);

const DRIFT: (f64, f64) = (-0.02, 0.03);
const SMALL_DRIFT: (f64, f64) = (-0.01, 0.01);
const LIFE_DRIFT: (f64, f64) = (-0.002, 0.003);
const RATE_DRIFT: (f64, f64) = (-0.001, 0.001);

/// Inputs gathered from the earlier stages of a region's month.
#[derive(Clone, Debug)]
pub struct MetricContext<'a> {
    /// Values read at the start of the month.
    pub old: &'a MetricTable<f64>,
    pub policy: &'a PolicyContext,
    pub ratios: &'a InfrastructureRatios,
    pub base_change: f64,
    pub happiness: f64,
    pub gdp_growth: f64,
    pub final_gdp: f64,
    pub weighted_avg_income: f64,
    /// Updated trust of the low income tier.
    pub low_income_trust: f64,
    /// Updated trust of the high income tier.
    pub high_income_trust: f64,
    /// Decimal places kept for fractional metrics.
    pub precision: u32,
}

fn clamp(v: f64, bounds: (f64, f64)) -> f64 {
    v.clamp(bounds.0, bounds.1)
}

/// Population from the previous month's population and poverty.
pub fn next_population<R: RandomSource + ?Sized>(ctx: &MetricContext<'_>, rng: &mut R) -> f64 {
    let old = ctx.old[Metric::Population];
    let poverty = ctx.old[Metric::PovertyRate];
    let change = ctx.base_change
        + ctx.policy.population_change
        + (poverty - 0.04) * 0.1
        + (ctx.happiness - 0.5) * 0.1
        + rng.uniform(DRIFT.0, DRIFT.1);
    (old * (1.0 + change)).round().max(0.0)
}

fn facilities(population: f64, ratio: f64) -> f64 {
    (population / ratio).round()
}

/// Rule for a single metric given the month's already-computed population.
pub fn next_value<R: RandomSource + ?Sized>(
    metric: Metric,
    ctx: &MetricContext<'_>,
    population: f64,
    rng: &mut R,
) -> f64 {
    let old = ctx.old[metric];
    let b = ctx.base_change;
    let h = ctx.happiness;
    let g = ctx.gdp_growth;
    let inflation_prev = ctx.old[Metric::Inflation];
    let unemployment_prev = ctx.old[Metric::Unemployment];
    let poverty_prev = ctx.old[Metric::PovertyRate];
    let tax = &ctx.policy.tax;

    match metric {
        Metric::Population => population,
        Metric::Gdp => ctx.final_gdp,
        Metric::AverageIncome => ctx.weighted_avg_income,
        Metric::PopulationHappiness => h,
        Metric::PopGrowthRate => {
            let before = ctx.old[Metric::Population];
            if before > 0.0 {
                (population - before) / before
            } else {
                0.0
            }
        }
        Metric::Inflation => clamp(
            old * (1.0 + b + tax.inflation_rate + g * 0.5 + rng.uniform(DRIFT.0, DRIFT.1)),
            INFLATION_BOUNDS,
        ),
        Metric::Unemployment => clamp(
            old * (1.0 + b + tax.unemployment_rate - g * 0.5
                + (0.5 - h) * 0.1
                + rng.uniform(DRIFT.0, DRIFT.1)),
            SHARE_BOUNDS,
        ),
        Metric::Productivity => (old
            * (1.0 + b
                + (h - 0.5) * 0.1
                + (ctx.old[Metric::TertiaryEducation] - 0.5) * 0.05
                + rng.uniform(DRIFT.0, DRIFT.1)))
        .max(0.0),
        Metric::FinancialMalpractice => clamp(
            old * (1.0 + b + (0.5 - ctx.high_income_trust) * 0.1 + rng.uniform(DRIFT.0, DRIFT.1)),
            SHARE_BOUNDS,
        ),
        Metric::PovertyRate => clamp(
            old * (1.0 + b + tax.poverty_rate_change - g
                + inflation_prev * 0.1
                + rng.uniform(DRIFT.0, DRIFT.1)),
            SHARE_BOUNDS,
        ),
        Metric::LifeExpectancy => clamp(
            old * (1.0 + (h - 0.5) * 0.01 - inflation_prev * 0.01
                + rng.uniform(LIFE_DRIFT.0, LIFE_DRIFT.1)),
            LIFE_EXPECTANCY_BOUNDS,
        ),
        Metric::HomeownershipRate => clamp(
            old * (1.0 + b
                - inflation_prev * 0.5
                - (ctx.old[Metric::InterestRate] - 0.03) * 0.5
                + rng.uniform(DRIFT.0, DRIFT.1)),
            SHARE_BOUNDS,
        ),
        Metric::CrimeRate => clamp(
            old * (1.0 + b
                + (0.5 - ctx.low_income_trust) * 0.1
                + (unemployment_prev - 0.05) * 0.1
                + (poverty_prev - 0.04) * 0.1
                + rng.uniform(DRIFT.0, DRIFT.1)),
            SHARE_BOUNDS,
        ),
        Metric::PrimaryEducation | Metric::SecondaryEducation | Metric::TertiaryEducation => {
            clamp(
                old * (1.0 + b * 0.5 + (h - 0.5) * 0.02 - poverty_prev * 0.02
                    + rng.uniform(SMALL_DRIFT.0, SMALL_DRIFT.1)),
                SHARE_BOUNDS,
            )
        }
        Metric::ConsumerSpending => (old
            * (1.0 + b + tax.consumer_spending_change + g + rng.uniform(DRIFT.0, DRIFT.1)))
        .max(0.0),
        Metric::BigMacIndex => {
            let drift = rng.uniform(SMALL_DRIFT.0, SMALL_DRIFT.1);
            (old * (1.0 + inflation_prev * 0.1 + drift)).max(0.0)
        }
        Metric::InterestRate => clamp(
            old + (inflation_prev - 0.02) * 0.1 + rng.uniform(RATE_DRIFT.0, RATE_DRIFT.1),
            INTEREST_RATE_BOUNDS,
        ),
        Metric::PoliceStationsNeeded => facilities(population, ctx.ratios.police_station),
        Metric::PowerStationsNeeded => facilities(population, ctx.ratios.power_station),
        Metric::InternetTowersNeeded => facilities(population, ctx.ratios.internet_tower),
        Metric::CommunicationTowersNeeded => {
            facilities(population, ctx.ratios.communication_tower)
        }
        Metric::HospitalsNeeded => facilities(population, ctx.ratios.hospital),
    }
}

/// Compute every metric for the month, rounded for persistence.
pub fn update_metrics<R: RandomSource + ?Sized>(
    ctx: &MetricContext<'_>,
    rng: &mut R,
) -> MetricTable<f64> {
    let population = next_population(ctx, rng);
    let mut out: MetricTable<f64> = KeyedTable::default();
    for &metric in Metric::ALL {
        let v = next_value(metric, ctx, population, rng);
        out[metric] = if metric.is_count() {
            v.round()
        } else {
            round_to(v, ctx.precision)
        };
        tracing::debug!(%metric, old = ctx.old[metric], new = out[metric], "metric updated");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{FixedDraw, SeededRandom};

    fn old_metrics() -> MetricTable<f64> {
        let mut m: MetricTable<f64> = KeyedTable::default();
        m[Metric::Population] = 3_000_000.0;
        m[Metric::Gdp] = 1.0e9;
        m[Metric::Inflation] = 0.03;
        m[Metric::Unemployment] = 0.05;
        m[Metric::Productivity] = 1000.0;
        m[Metric::FinancialMalpractice] = 0.1;
        m[Metric::PovertyRate] = 0.04;
        m[Metric::LifeExpectancy] = 78.0;
        m[Metric::HomeownershipRate] = 0.6;
        m[Metric::CrimeRate] = 0.02;
        m[Metric::PrimaryEducation] = 0.95;
        m[Metric::SecondaryEducation] = 0.8;
        m[Metric::TertiaryEducation] = 0.4;
        m[Metric::ConsumerSpending] = 4.0e8;
        m[Metric::BigMacIndex] = 5.5;
        m[Metric::InterestRate] = 0.03;
        m[Metric::AverageIncome] = 55_000.0;
        m[Metric::PopulationHappiness] = 0.5;
        m
    }

    fn ctx<'a>(
        old: &'a MetricTable<f64>,
        policy: &'a PolicyContext,
        ratios: &'a InfrastructureRatios,
    ) -> MetricContext<'a> {
        MetricContext {
            old,
            policy,
            ratios,
            base_change: 0.0,
            happiness: 0.5,
            gdp_growth: 0.02,
            final_gdp: 1.02e9,
            weighted_avg_income: 56_000.0,
            low_income_trust: 0.5,
            high_income_trust: 0.5,
            precision: 4,
        }
    }

    #[test]
    fn derived_metrics_are_assigned() {
        let old = old_metrics();
        let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
        let out = update_metrics(&ctx(&old, &policy, &ratios), &mut FixedDraw(0.0));
        assert_eq!(out[Metric::Gdp], 1.02e9);
        assert_eq!(out[Metric::AverageIncome], 56_000.0);
        assert_eq!(out[Metric::PopulationHappiness], 0.5);
    }

    #[test]
    fn population_and_facilities() {
        let old = old_metrics();
        let policy = PolicyContext {
            population_change: 0.01,
            ..PolicyContext::default()
        };
        let ratios = InfrastructureRatios::default();
        let out = update_metrics(&ctx(&old, &policy, &ratios), &mut FixedDraw(0.0));
        assert_eq!(out[Metric::Population], 3_030_000.0);
        assert!((out[Metric::PopGrowthRate] - 0.01).abs() < 1e-9);
        assert_eq!(out[Metric::PoliceStationsNeeded], 10.0);
        assert_eq!(out[Metric::PowerStationsNeeded], 6.0);
        assert_eq!(out[Metric::InternetTowersNeeded], 30.0);
        assert_eq!(out[Metric::CommunicationTowersNeeded], 12.0);
        assert_eq!(out[Metric::HospitalsNeeded], 20.0);
    }

    #[test]
    fn zero_population_has_no_growth_rate() {
        let mut old = old_metrics();
        old[Metric::Population] = 0.0;
        let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
        let out = update_metrics(&ctx(&old, &policy, &ratios), &mut FixedDraw(0.0));
        assert_eq!(out[Metric::Population], 0.0);
        assert_eq!(out[Metric::PopGrowthRate], 0.0);
    }

    #[test]
    fn lagged_inflation_feeds_interest_rate() {
        let mut old = old_metrics();
        old[Metric::Inflation] = 0.12;
        let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
        let out = update_metrics(&ctx(&old, &policy, &ratios), &mut FixedDraw(0.0));
        assert!((out[Metric::InterestRate] - 0.04).abs() < 1e-9);
    }

    #[test]
    fn outputs_are_rounded() {
        let old = old_metrics();
        let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
        let out = update_metrics(&ctx(&old, &policy, &ratios), &mut SeededRandom::new(5));
        for (metric, v) in out.iter() {
            if metric.is_count() || v.abs() > 1.0e6 {
                continue;
            }
            let scaled = v * 10_000.0;
            assert!((scaled - scaled.round()).abs() < 1e-3, "{metric} = {v}");
        }
    }

    proptest! {
        #[test]
        fn life_expectancy_stays_in_bounds(old_le in -1.0e6f64..1.0e6,
                                           happiness in -100.0f64..100.0,
                                           inflation in -100.0f64..100.0,
                                           draw in -10.0f64..10.0) {
            let mut old = old_metrics();
            old[Metric::LifeExpectancy] = old_le;
            old[Metric::Inflation] = inflation;
            let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
            let mut c = ctx(&old, &policy, &ratios);
            c.happiness = happiness;
            let v = next_value(Metric::LifeExpectancy, &c, 0.0, &mut FixedDraw(draw));
            prop_assert!(v >= LIFE_EXPECTANCY_BOUNDS.0 && v <= LIFE_EXPECTANCY_BOUNDS.1);
        }

        #[test]
        fn shares_stay_in_unit_interval(
            seed in any::<u64>(),
            crime in 0.0f64..1.0,
            growth in -1.0f64..1.0,
        ) {
            let mut old = old_metrics();
            old[Metric::CrimeRate] = crime;
            let (policy, ratios) = (PolicyContext::default(), InfrastructureRatios::default());
            let mut c = ctx(&old, &policy, &ratios);
            c.gdp_growth = growth;
            let out = update_metrics(&c, &mut SeededRandom::new(seed));
            let shares = [
                Metric::CrimeRate,
                Metric::PovertyRate,
                Metric::Unemployment,
                Metric::HomeownershipRate,
            ];
            for m in shares {
                prop_assert!((0.0..=1.0).contains(&out[m]));
            }
        }
    }
}

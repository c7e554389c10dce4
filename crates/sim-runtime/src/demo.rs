//! A small self-consistent world used by the CLI, benches and tests.

use sim_core::{
    format_value, Keyed, MemoryStore, Metric, PopulationGroup, Sector, SimConfig, Tax,
    TaxClass,
};

use crate::region::{
    Region, BASE_SIZE_COLUMN, CS_EFFECT_COLUMN, ECONOMIC_GROWTH_ROW, EFFECT_2_COLUMN,
    EFFECT_COLUMN, EVERYONE_ROW, GOV_SPENDING_COLUMN, INCOME_COLUMN, ONE_TIME_COLUMN,
    POPULATION_GROWTH_ROW, RATE_COLUMN, SIZE_COLUMN, TOTAL_CHANGE_COLUMN, TRUST_COLUMN,
    VALUE_COLUMN,
};

fn v(x: f64) -> String {
    format_value(x, 6)
}

/// Fill the shared tax-effect and totals tables.
pub fn seed_shared(store: &mut MemoryStore, cfg: &SimConfig) {
    let shared = &cfg.shared_tables;
    for &tax in Tax::ALL {
        let (e1, e2) = match tax.class() {
            TaxClass::Income => (0.08, 0.05),
            TaxClass::Consumption => (0.06, 0.04),
            TaxClass::Savings => (0.03, 0.02),
            TaxClass::Sector => (0.05, 0.03),
        };
        store.insert_row(
            &shared.tax_effects,
            tax.label(),
            [(EFFECT_COLUMN, v(e1)), (EFFECT_2_COLUMN, v(e2))],
        );
    }
    let totals = &shared.end_of_month_totals;
    for &group in PopulationGroup::ALL {
        if group.mirrored_from().is_none() {
            let delta = if group.is_income_tier() { -0.002 } else { 0.003 };
            store.insert_row(totals, group.label(), [(TOTAL_CHANGE_COLUMN, v(delta))]);
        }
    }
    store.insert_row(totals, EVERYONE_ROW, [(TOTAL_CHANGE_COLUMN, v(0.001))]);
    store.insert_row(totals, ECONOMIC_GROWTH_ROW, [(TOTAL_CHANGE_COLUMN, v(0.004))]);
    store.insert_row(totals, POPULATION_GROWTH_ROW, [(TOTAL_CHANGE_COLUMN, v(0.002))]);
}

/// Fill one region's tables. `scale` multiplies population and sector sizes.
pub fn seed_region(store: &mut MemoryStore, region: &Region, scale: f64) {
    let t = &region.tables;

    for &tax in Tax::ALL {
        let rate = match tax.class() {
            TaxClass::Income => 150.0,
            TaxClass::Consumption => 100.0,
            TaxClass::Savings => 50.0,
            TaxClass::Sector => 30.0,
        };
        store.insert_row(&t.taxes, tax.label(), [(RATE_COLUMN, v(rate))]);
    }

    for &group in PopulationGroup::ALL {
        let members = group.set().members().count() as f64;
        let mut cells = vec![
            (SIZE_COLUMN, v(1.0 / members)),
            (TRUST_COLUMN, v(0.5)),
        ];
        if group.is_income_tier() {
            let income = match group {
                PopulationGroup::LowIncome => 18_000.0,
                PopulationGroup::MediumIncome => 52_000.0,
                _ => 140_000.0,
            };
            cells.push((INCOME_COLUMN, v(income)));
        }
        store.insert_row(&t.population, group.label(), cells);
    }

    let mut gdp = 0.0;
    for sector in Sector::ordinary() {
        let base = 100.0 * scale;
        gdp += base;
        store.insert_row(
            &t.sectors,
            sector.label(),
            [
                (BASE_SIZE_COLUMN, v(base)),
                (ONE_TIME_COLUMN, v(0.0)),
                (GOV_SPENDING_COLUMN, v(2.0 * scale)),
                (CS_EFFECT_COLUMN, v(0.5)),
            ],
        );
    }
    store.insert_row(
        &t.sectors,
        Sector::PublicService.label(),
        [(GOV_SPENDING_COLUMN, v(250.0 * scale))],
    );

    let population = (1_000_000.0 * scale).round();
    let r = &region.ratios;
    for &metric in Metric::ALL {
        let value = match metric {
            Metric::Population => population,
            Metric::Gdp => gdp,
            Metric::Inflation => 0.02,
            Metric::Unemployment => 0.05,
            Metric::Productivity => 1000.0,
            Metric::FinancialMalpractice => 0.1,
            Metric::PovertyRate => 0.12,
            Metric::LifeExpectancy => 78.0,
            Metric::HomeownershipRate => 0.6,
            Metric::CrimeRate => 0.04,
            Metric::PrimaryEducation => 0.95,
            Metric::SecondaryEducation => 0.8,
            Metric::TertiaryEducation => 0.35,
            Metric::ConsumerSpending => gdp * 0.6,
            Metric::BigMacIndex => 5.5,
            Metric::InterestRate => 0.04,
            Metric::PopulationHappiness => 0.5,
            Metric::AverageIncome => 70_000.0,
            Metric::PopGrowthRate => 0.0,
            Metric::PoliceStationsNeeded => (population / r.police_station).ceil(),
            Metric::PowerStationsNeeded => (population / r.power_station).ceil(),
            Metric::InternetTowersNeeded => (population / r.internet_tower).ceil(),
            Metric::CommunicationTowersNeeded => (population / r.communication_tower).ceil(),
            Metric::HospitalsNeeded => (population / r.hospital).ceil(),
        };
        store.insert_row(&t.metrics, metric.label(), [(VALUE_COLUMN, v(value))]);
    }
}

/// Shared tables plus every configured region, regions growing in size.
pub fn demo_store(cfg: &SimConfig) -> MemoryStore {
    let mut store = MemoryStore::new();
    seed_shared(&mut store, cfg);
    let regions = cfg.regions.iter().filter_map(|rc| Region::from_config(rc).ok());
    for (i, region) in regions.enumerate() {
        seed_region(&mut store, &region, 1.0 + i as f64);
    }
    store
}

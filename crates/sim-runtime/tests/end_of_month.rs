mod common;

use sim_core::{
    parse_number, CellStore, FixedDraw, GdpComposition, Keyed, Metric, PopulationGroup, Sector,
    SeededRandom,
};
use sim_runtime::region::{BASE_SIZE_COLUMN, SIZE_COLUMN, VALUE_COLUMN};
use sim_runtime::{Planet, Stage, WEIGHTS_ROW};

fn cell(store: &impl CellStore, table: &str, row: &str, column: &str) -> f64 {
    let raw = store
        .read_value(table, row, column)
        .unwrap_or_else(|| panic!("{table}[{row} / {column}] missing"));
    parse_number(&raw).unwrap()
}

#[test]
fn planet_table_holds_weighted_aggregates() {
    let (cfg, mut store) = common::seeded();
    let planet = Planet::from_config(&cfg);
    let report = planet
        .run_end_of_month(&mut store, &mut SeededRandom::new(cfg.rng_seed), &cfg)
        .unwrap();

    assert_eq!(report.regions.len(), 2);
    assert!(report.skipped_regions.is_empty());
    assert!(report.read_issues.is_empty());
    assert!(report.all_write_failures().next().is_none());
    assert!(report.regions.iter().all(|r| r.stage == Stage::Done));

    let pops: Vec<f64> = report
        .regions
        .iter()
        .map(|r| r.metrics[Metric::Population])
        .collect();
    let weight_sum: f64 = pops.iter().sum();
    assert_eq!(report.after.weights, weight_sum);

    let out = &cfg.planet.output_table;
    assert_eq!(cell(&store, out, Metric::Population.label(), VALUE_COLUMN), weight_sum);
    assert_eq!(cell(&store, out, WEIGHTS_ROW, VALUE_COLUMN), weight_sum);

    let gdp_sum: f64 = report.regions.iter().map(|r| r.metrics[Metric::Gdp]).sum();
    assert!((report.after.get(Metric::Gdp) - gdp_sum).abs() < 1e-3);

    let weighted: f64 = report
        .regions
        .iter()
        .zip(&pops)
        .map(|(r, w)| r.metrics[Metric::Inflation] * w)
        .sum::<f64>()
        / weight_sum;
    assert!((report.after.get(Metric::Inflation) - weighted).abs() < 1e-6);
    assert!((cell(&store, out, Metric::Inflation.label(), VALUE_COLUMN) - weighted).abs() < 1e-4);
}

#[test]
fn deltas_compare_before_and_after() {
    let (cfg, mut store) = common::seeded();
    let planet = Planet::from_config(&cfg);
    let report = planet
        .run_end_of_month(&mut store, &mut SeededRandom::new(1), &cfg)
        .unwrap();
    let gdp = report
        .deltas
        .iter()
        .find(|d| d.metric == Metric::Gdp)
        .unwrap();
    // Demo regions start at 1800 and 3600.
    assert_eq!(gdp.before, 5400.0);
    let pct = gdp.percent.unwrap();
    assert!((pct - (gdp.after - gdp.before) / gdp.before * 100.0).abs() < 1e-9);
}

#[test]
fn group_sets_keep_unit_total() {
    let (cfg, mut store) = common::seeded();
    let region = common::region(&cfg, 0);
    region
        .run_calculations(&mut store, &mut SeededRandom::new(9), &cfg)
        .unwrap();
    let political: f64 = [PopulationGroup::Liberal, PopulationGroup::Conservative]
        .iter()
        .map(|g| cell(&store, &region.tables.population, g.label(), SIZE_COLUMN))
        .sum();
    assert!((political - 1.0).abs() < 1e-3);
}

#[test]
fn illicit_and_public_service_are_persisted() {
    let (cfg, mut store) = common::seeded();
    let region = common::region(&cfg, 0);
    let out = region
        .run_calculations(&mut store, &mut SeededRandom::new(3), &cfg)
        .unwrap();
    let t = &region.tables.sectors;
    let illicit = cell(&store, t, Sector::Illicit.label(), BASE_SIZE_COLUMN);
    assert!(illicit > 0.0);
    assert!((illicit - out.sectors.outputs[Sector::Illicit]).abs() < 1e-3);
    assert!(store
        .read_value(t, Sector::PublicService.label(), BASE_SIZE_COLUMN)
        .is_some());
}

#[test]
fn gdp_composition_controls_membership() {
    let (mut cfg, store) = common::seeded();
    let region = common::region(&cfg, 0);

    let run = |cfg: &sim_core::SimConfig| {
        let mut store = store.clone();
        region
            .run_calculations(&mut store, &mut FixedDraw(0.0), cfg)
            .unwrap()
            .sectors
    };

    let default = run(&cfg);
    let ordinary: f64 = Sector::ordinary().map(|s| default.outputs[s]).sum();
    assert!((default.final_gdp - ordinary).abs() < 1e-9);

    cfg.gdp = GdpComposition {
        include_public_service: true,
        include_illicit: true,
    };
    let full = run(&cfg);
    let all: f64 = Sector::ALL.iter().map(|s| full.outputs[*s]).sum();
    assert!((full.final_gdp - all).abs() < 1e-9);
    assert!(full.final_gdp > default.final_gdp);
}

#[test]
fn unwritable_table_is_reported_and_run_completes() {
    let (cfg, store) = common::seeded();
    let region = common::region(&cfg, 0);
    let mut locked = common::LockedTable {
        inner: store,
        locked: region.tables.metrics.clone(),
    };
    let out = region
        .run_calculations(&mut locked, &mut SeededRandom::new(5), &cfg)
        .unwrap();
    assert_eq!(out.stage, Stage::Done);
    assert_eq!(out.write_failures.len(), Metric::ALL.len());
    assert!(out
        .write_failures
        .iter()
        .all(|f| f.cell.table == region.tables.metrics));
    // Other tables were still written.
    let illicit = locked.read_value(
        &region.tables.sectors,
        Sector::Illicit.label(),
        BASE_SIZE_COLUMN,
    );
    assert!(illicit.is_some());
}

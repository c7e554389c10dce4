#![deny(warnings)]

//! Headless runner for one Ascendancy end-of-month cycle.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use persistence::FileStore;
use sim_core::{Keyed, ReadPolicy, SeededRandom, SimConfig};
use sim_runtime::{builtin_config, config_from_file, demo, Planet, PlanetReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    seed: Option<u64>,
    month: Option<NaiveDate>,
    strict: bool,
    dry_run: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--store" => args.store = it.next().map(PathBuf::from),
            "--seed" => {
                let raw = it.next().context("--seed needs a value")?;
                args.seed = Some(raw.parse().with_context(|| format!("bad seed {raw:?}"))?);
            }
            "--month" => {
                let raw = it.next().context("--month needs a value")?;
                let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("bad month {raw:?}, expected YYYY-MM-DD"))?;
                args.month = Some(date);
            }
            "--strict" => args.strict = true,
            "--dry-run" => args.dry_run = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => config_from_file(path)?,
        None => builtin_config(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    if args.month.is_some() {
        cfg.month = args.month;
    }
    if args.strict {
        cfg.read_policy = ReadPolicy::Strict;
    }
    Ok(cfg)
}

fn print_summary(report: &PlanetReport) {
    let month = report
        .month
        .map(|m| m.format("%B %Y").to_string())
        .unwrap_or_else(|| "unlabelled month".to_string());
    println!("{} | {} | regions: {}", report.planet, month, report.regions.len());
    for d in &report.deltas {
        let line = format!("  {:<28} {:>16.4} -> {:>16.4}", d.metric.label(), d.before, d.after);
        match d.percent {
            Some(pct) => println!("{line} ({pct:+.2}%)"),
            None => println!("{line}"),
        }
    }
    for name in &report.skipped_regions {
        println!("  skipped region: {name}");
    }
    println!(
        "defaulted cells: {} | failed writes: {}",
        report.read_issues.len(),
        report.all_write_failures().count()
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    info!(?args, "starting end of month");
    let cfg = load_config(&args)?;

    let mut store = match &args.store {
        Some(path) => FileStore::open(path)?,
        None => {
            info!("no --store given; using the demo world");
            FileStore::with_store(persistence::default_store_path(), demo::demo_store(&cfg))
        }
    };

    let planet = Planet::from_config(&cfg);
    let mut rng = SeededRandom::new(cfg.rng_seed);
    let report = planet.run_end_of_month(&mut store, &mut rng, &cfg)?;
    print_summary(&report);

    if args.store.is_some() && !args.dry_run {
        store.save()?;
    }
    Ok(())
}

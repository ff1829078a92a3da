use anyhow::{Context, Result, bail};
use clap::ArgMatches;

use gwcache_dataset::SignalDataset;

use crate::consts::CONFIG_ARG;

pub fn run_build(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>(CONFIG_ARG)
        .context("A path to a dataset configuration is required.")?;
    let rebuild = matches.get_flag("rebuild");

    let dataset = SignalDataset::from_path(config)
        .with_context(|| format!("failed to load dataset configuration {}", config))?;
    let rebuild = rebuild || dataset.config().rebuild;

    let report = dataset.build_with(rebuild)?;

    println!(
        "{} built, {} cached, {} failed",
        report.built(),
        report.hits(),
        report.failures()
    );
    println!(
        "{} summary tables ready, {} skipped",
        report.summaries.len(),
        report.skipped.len()
    );
    for key in &report.skipped {
        println!("  skipped {}", key);
    }

    if !report.is_complete() {
        bail!(
            "cache is incomplete: {} units failed, rerun with -v for details",
            report.failures()
        );
    }
    Ok(())
}

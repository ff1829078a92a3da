use anyhow::{Context, Result};
use clap::ArgMatches;

use gwcache_dataset::SignalDataset;

use crate::consts::CONFIG_ARG;

pub fn run_len(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>(CONFIG_ARG)
        .context("A path to a dataset configuration is required.")?;

    let dataset = SignalDataset::from_path(config)
        .with_context(|| format!("failed to load dataset configuration {}", config))?;
    println!("{}", dataset.len());

    Ok(())
}

use std::path::Path;

use indicatif::ProgressBar;
use rayon::prelude::*;

use gwcache_core::config::{DatasetConfig, RunConfig};
use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::{Chromosome, Track};
use gwcache_store::{
    CacheEntry, ConsolidatedTable, EntryStatus, SummaryConsolidator, TableKey, TrackCache,
};

use crate::assembler::{Sample, SampleAssembler};
use crate::indexer::SampleIndexer;

///
/// Result of one extraction unit: one track on one chromosome at one
/// resolution.
///
#[derive(Debug)]
pub struct BuildOutcome {
    pub track: String,
    pub chrom: String,
    pub resolution: u64,
    pub result: Result<CacheEntry>,
}

///
/// What a [`SignalDataset::build`] run did.
///
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<BuildOutcome>,
    pub summaries: Vec<ConsolidatedTable>,
    /// Keys left unconsolidated because some of their tracks failed.
    pub skipped: Vec<TableKey>,
}

impl BuildReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    fn count_status(&self, status: EntryStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(entry) if entry.status == status))
            .count()
    }

    pub fn built(&self) -> usize {
        self.count_status(EntryStatus::Built)
    }

    pub fn hits(&self) -> usize {
        self.count_status(EntryStatus::Hit)
    }

    /// True when every unit succeeded and every key was consolidated.
    pub fn is_complete(&self) -> bool {
        self.failures() == 0 && self.skipped.is_empty()
    }
}

///
/// A multi-resolution signal dataset: builds the on-disk cache from raw
/// tracks and serves training samples out of it.
///
#[derive(Debug, Clone)]
pub struct SignalDataset {
    config: RunConfig,
    cache: TrackCache,
    consolidator: SummaryConsolidator,
    assembler: SampleAssembler,
}

impl SignalDataset {
    pub fn new(config: RunConfig) -> Result<Self> {
        let indexer = SampleIndexer::new(
            &config.catalog,
            config.coarsest_resolution(),
            config.overlap,
            config.chunk_size,
        )?;
        let cache = TrackCache::new(&config.cache_dir, config.storage_chunk_rows);
        let consolidator = SummaryConsolidator::new(&config.cache_dir, config.storage_chunk_rows);
        let assembler = SampleAssembler::new(
            indexer,
            consolidator.store().clone(),
            config.resolutions.clone(),
            config.overlap,
        );

        Ok(SignalDataset {
            config,
            cache,
            consolidator,
            assembler,
        })
    }

    /// Load and validate a TOML or YAML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = DatasetConfig::try_from(path.as_ref())?.resolve()?;
        Self::new(config)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }

    pub fn consolidator(&self) -> &SummaryConsolidator {
        &self.consolidator
    }

    pub fn len(&self) -> u64 {
        self.assembler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assembler.is_empty()
    }

    pub fn get(&self, index: u64) -> Result<Sample> {
        self.assembler.get(index)
    }

    /// A cheap handle for reading samples, e.g. from worker threads.
    pub fn assembler(&self) -> SampleAssembler {
        self.assembler.clone()
    }

    pub fn build(&self) -> Result<BuildReport> {
        self.build_with(self.config.rebuild)
    }

    ///
    /// Populate the cache: extract every (track, chromosome, resolution)
    /// unit, then consolidate every (chromosome, resolution) key whose
    /// tracks all succeeded.
    ///
    /// Failed units are logged and reported, not raised. A key for which
    /// every track failed is an error, returned once the other keys have
    /// been consolidated.
    ///
    pub fn build_with(&self, rebuild: bool) -> Result<BuildReport> {
        let config = &self.config;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .build()
            .map_err(|e| CacheError::Storage(format!("failed to start worker pool: {}", e)))?;

        let units: Vec<(&Track, &Chromosome, u64)> = config
            .tracks
            .iter()
            .flat_map(move |track| {
                config.catalog.iter().flat_map(move |chrom| {
                    config.resolutions.iter().map(move |&res| (track, chrom, res))
                })
            })
            .collect();

        log::info!(
            "building {} units ({} tracks, {} chromosomes, {} resolutions) with {} workers",
            units.len(),
            config.tracks.len(),
            config.catalog.len(),
            config.resolutions.len(),
            config.concurrency
        );

        let bar = ProgressBar::new(units.len() as u64);
        let outcomes: Vec<BuildOutcome> = pool.install(|| {
            units
                .par_iter()
                .map(|&(track, chrom, resolution)| {
                    let result = self.cache.ensure(
                        track,
                        chrom,
                        resolution,
                        config.overlap,
                        &config.statistics,
                        rebuild,
                    );
                    bar.inc(1);
                    BuildOutcome {
                        track: track.key.clone(),
                        chrom: chrom.name.clone(),
                        resolution,
                        result,
                    }
                })
                .collect()
        });
        bar.finish();

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                log::warn!(
                    "{} on {} at resolution {} failed: {}",
                    outcome.track,
                    outcome.chrom,
                    outcome.resolution,
                    e
                );
            }
        }

        let mut ready: Vec<(TableKey, Vec<CacheEntry>)> = Vec::new();
        let mut skipped = Vec::new();
        let mut unbuildable = Vec::new();
        for chrom in &config.catalog {
            for &resolution in &config.resolutions {
                let key = TableKey::new(&chrom.name, resolution, config.overlap);
                // units are in track order, so entries come out in track order too
                let unit_results: Vec<&BuildOutcome> = outcomes
                    .iter()
                    .filter(|o| o.chrom == chrom.name && o.resolution == resolution)
                    .collect();
                let entries: Vec<CacheEntry> = unit_results
                    .iter()
                    .filter_map(|o| o.result.as_ref().ok().cloned())
                    .collect();

                if entries.is_empty() {
                    log::error!("{}: every track failed to build", key);
                    unbuildable.push(key);
                    continue;
                }
                if entries.len() < unit_results.len() {
                    log::warn!(
                        "{}: {} of {} tracks failed, not consolidating",
                        key,
                        unit_results.len() - entries.len(),
                        unit_results.len()
                    );
                    skipped.push(key);
                    continue;
                }
                ready.push((key, entries));
            }
        }

        let consolidated: Vec<Result<ConsolidatedTable>> = pool.install(|| {
            ready
                .par_iter()
                .map(|(key, entries)| {
                    self.consolidator
                        .consolidate(&self.cache, entries, key, rebuild)
                })
                .collect()
        });
        let summaries = consolidated.into_iter().collect::<Result<Vec<_>>>()?;

        if let Some(key) = unbuildable.first() {
            return Err(CacheError::consistency(
                key,
                format!(
                    "every track failed to build ({} keys affected, {} consolidated)",
                    unbuildable.len(),
                    summaries.len()
                ),
            ));
        }

        let report = BuildReport {
            outcomes,
            summaries,
            skipped,
        };
        log::info!(
            "build finished: {} built, {} cached, {} failed, {} keys consolidated, {} skipped",
            report.built(),
            report.hits(),
            report.failures(),
            report.summaries.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

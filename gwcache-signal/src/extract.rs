use ndarray::Array2;

use gwcache_core::consts::EXTRACT_BATCH_WINDOWS;
use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::{Chromosome, Statistic, Track, tile};

use crate::source::{SignalSource, open_source};
use crate::stats::WindowAccumulator;

///
/// Per-window summary of one track on one chromosome at one resolution:
/// one row per window in chromosome order, one column per statistic.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl SummaryTable {
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

///
/// Summarise `source` over every window of `chromosome`.
///
/// The chromosome length from the catalog decides the tiling. A source that
/// does not know the chromosome is reported as unavailable.
///
/// # Arguments
/// - source: opened raw signal
/// - chromosome: catalog chromosome to tile
/// - resolution: window width
/// - overlap: bases shared by consecutive windows
/// - statistics: columns to compute, in order
///
pub fn extract<S: SignalSource + ?Sized>(
    source: &mut S,
    chromosome: &Chromosome,
    resolution: u64,
    overlap: u64,
    statistics: &[Statistic],
) -> Result<SummaryTable> {
    extract_in_batches(
        source,
        chromosome,
        resolution,
        overlap,
        statistics,
        EXTRACT_BATCH_WINDOWS,
    )
}

///
/// [`extract`] with an explicit number of windows per interval query.
///
/// Each batch asks the source only for the span its windows cover, so a
/// chromosome is never loaded whole.
///
pub fn extract_in_batches<S: SignalSource + ?Sized>(
    source: &mut S,
    chromosome: &Chromosome,
    resolution: u64,
    overlap: u64,
    statistics: &[Statistic],
    batch_windows: usize,
) -> Result<SummaryTable> {
    let tiling = tile(chromosome.length, resolution, overlap)?;

    let Some(source_length) = source.chrom_length(&chromosome.name) else {
        return Err(CacheError::source_unavailable(
            source.path(),
            format!("chromosome {} not found", chromosome.name),
        ));
    };
    if source_length != chromosome.length {
        log::warn!(
            "{}: {} has length {} in the source but {} in the catalog; using the catalog",
            source.path().display(),
            chromosome.name,
            source_length,
            chromosome.length
        );
    }

    let batch_windows = batch_windows.max(1);
    let mut values = Array2::<f64>::zeros((tiling.len(), statistics.len()));
    let mut rows = 0;

    for batch_start in (0..tiling.len()).step_by(batch_windows) {
        let batch_end = batch_start.saturating_add(batch_windows).min(tiling.len());
        let (Some(first_window), Some(last_window)) =
            (tiling.window(batch_start), tiling.window(batch_end - 1))
        else {
            break;
        };

        let intervals =
            source.intervals(&chromosome.name, first_window.start, last_window.end)?;
        let mut first = 0;

        for row in batch_start..batch_end {
            let Some(window) = tiling.window(row) else {
                break;
            };

            // window starts only grow, so intervals ending before this one never matter again
            while first < intervals.len() && intervals[first].end <= window.start {
                first += 1;
            }

            let mut acc = WindowAccumulator::new(window.width());
            for interval in intervals[first..]
                .iter()
                .take_while(|i| i.start < window.end)
            {
                let start = interval.start.max(window.start);
                let end = interval.end.min(window.end);
                if start < end {
                    acc.add(interval.value, end - start);
                }
            }

            for (col, stat) in statistics.iter().enumerate() {
                values[[row, col]] = acc.value(*stat);
            }
            rows += 1;
        }
    }

    if rows != tiling.len() {
        return Err(CacheError::consistency(
            format!("{}:{}@{}", source.path().display(), chromosome.name, resolution),
            format!("produced {} rows, expected {}", rows, tiling.len()),
        ));
    }

    Ok(SummaryTable {
        columns: statistics.iter().map(|s| s.to_string()).collect(),
        values,
    })
}

///
/// Open the raw source of `track`, summarise one chromosome, and close it.
///
pub fn extract_track(
    track: &Track,
    chromosome: &Chromosome,
    resolution: u64,
    overlap: u64,
    statistics: &[Statistic],
) -> Result<SummaryTable> {
    let mut source = open_source(track, chromosome)?;
    extract(source.as_mut(), chromosome, resolution, overlap, statistics)
}

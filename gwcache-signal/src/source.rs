use std::path::Path;

use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::{Chromosome, SourceFormat, Track};

use crate::formats::{BedGraphSource, BigWigSource, MutationSource};

///
/// A run of constant signal over `[start, end)`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
    pub value: f64,
}

impl Interval {
    pub fn new(start: u64, end: u64, value: f64) -> Self {
        Interval { start, end, value }
    }
}

///
/// Read access to one raw signal file.
///
/// Implementations return intervals sorted by start and non-overlapping.
/// Bases not covered by any interval carry no signal.
///
pub trait SignalSource {
    /// The file backing this source, used in error messages.
    fn path(&self) -> &Path;

    /// Length of `chrom` as known to this source, or `None` if the source
    /// has no such chromosome.
    fn chrom_length(&self, chrom: &str) -> Option<u64>;

    /// Intervals overlapping `[start, end)` on `chrom`.
    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<Interval>>;
}

///
/// Open the raw source of `track` for reading `chromosome`.
///
/// A missing file is reported as [`CacheError::SourceUnavailable`], naming
/// the track's download location when it has one.
///
pub fn open_source(track: &Track, chromosome: &Chromosome) -> Result<Box<dyn SignalSource>> {
    if !track.path.exists() {
        let reason = match &track.url {
            Some(url) => format!("raw file not found (download it from {})", url),
            None => "raw file not found".to_string(),
        };
        return Err(CacheError::source_unavailable(&track.path, reason));
    }

    let source: Box<dyn SignalSource> = match track.format {
        SourceFormat::BigWig => Box::new(BigWigSource::open(&track.path)?),
        SourceFormat::BedGraph => Box::new(BedGraphSource::open(
            &track.path,
            std::slice::from_ref(chromosome),
        )?),
        SourceFormat::Mutations => Box::new(MutationSource::open(
            &track.path,
            std::slice::from_ref(chromosome),
        )?),
    };

    Ok(source)
}

///
/// Sort intervals by start and clip each one so it begins no earlier than
/// the end of the one before it. Intervals left empty are dropped.
///
pub fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|i| (i.start, i.end));

    let mut normalized: Vec<Interval> = Vec::with_capacity(intervals.len());
    for mut interval in intervals {
        if let Some(prev) = normalized.last() {
            interval.start = interval.start.max(prev.end);
        }
        if interval.start < interval.end {
            normalized.push(interval);
        }
    }
    normalized
}

/// Intervals of a sorted, non-overlapping list that overlap `[start, end)`.
pub(crate) fn overlapping(intervals: &[Interval], start: u64, end: u64) -> Vec<Interval> {
    let first = intervals.partition_point(|i| i.end <= start);
    intervals[first..]
        .iter()
        .take_while(|i| i.start < end)
        .copied()
        .collect()
}

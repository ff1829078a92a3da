use std::ops::Range;

use gwcache_core::config::validate_sample_width;
use gwcache_core::errors::{CacheError, ConfigError, Result};
use gwcache_core::models::{Chromosome, ChromosomeCatalog, Window, tile};

///
/// The stretch of a chromosome one training sample is drawn from:
/// `chunk_size` consecutive windows of the coarsest resolution.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseSpan {
    pub chrom: String,
    pub chrom_length: u64,
    /// Start of the first coarse window.
    pub start: u64,
    /// End of the last coarse window, clipped to the chromosome.
    pub end: u64,
    /// Coarse table rows covered by the span.
    pub rows: Range<usize>,
}

///
/// Maps flat sample indices onto chromosomes and coarse spans.
///
/// Chromosomes are enumerated in catalog order. Each contributes
/// `ceil(length / ((coarsest - overlap) * chunk_size))` samples.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SampleIndexer {
    chromosomes: Vec<Chromosome>,
    resolution: u64,
    overlap: u64,
    chunk_size: u64,
    /// `cumulative_ends[i]` is one past the last sample index of chromosome `i`.
    cumulative_ends: Vec<u64>,
}

impl SampleIndexer {
    ///
    /// # Arguments
    /// - catalog: chromosomes to enumerate, in order
    /// - coarsest: the coarsest resolution of the run
    /// - overlap: overlap shared by every resolution
    /// - chunk_size: coarse windows per sample
    ///
    pub fn new(
        catalog: &ChromosomeCatalog,
        coarsest: u64,
        overlap: u64,
        chunk_size: u64,
    ) -> std::result::Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        validate_sample_width(catalog, coarsest, chunk_size)?;

        let mut total = 0u64;
        let mut cumulative_ends = Vec::with_capacity(catalog.len());
        for chrom in catalog {
            let windows = tile(chrom.length, coarsest, overlap)?.len() as u64;
            total += windows.div_ceil(chunk_size);
            cumulative_ends.push(total);
        }

        Ok(SampleIndexer {
            chromosomes: catalog.as_slice().to_vec(),
            resolution: coarsest,
            overlap,
            chunk_size,
            cumulative_ends,
        })
    }

    /// Total number of samples.
    pub fn len(&self) -> u64 {
        self.cumulative_ends.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of samples drawn from `chrom`.
    pub fn samples_in(&self, chrom: &str) -> Option<u64> {
        let i = self.chromosomes.iter().position(|c| c.name == chrom)?;
        let start = if i == 0 { 0 } else { self.cumulative_ends[i - 1] };
        Some(self.cumulative_ends[i] - start)
    }

    ///
    /// Resolve a flat sample index to its chromosome and coarse span.
    ///
    pub fn locate(&self, index: u64) -> Result<CoarseSpan> {
        let len = self.len();
        if index >= len {
            return Err(CacheError::Bounds { index, len });
        }

        // first chromosome whose cumulative end lies past the index
        let i = self.cumulative_ends.partition_point(|&end| end <= index);
        let chrom = &self.chromosomes[i];
        let local = index - if i == 0 { 0 } else { self.cumulative_ends[i - 1] };

        let tiling = tile(chrom.length, self.resolution, self.overlap)?;
        let step = tiling.step();
        let first_row = (local * self.chunk_size) as usize;
        let last_row = (first_row + self.chunk_size as usize).min(tiling.len());

        let start = local * self.chunk_size * step;
        let end = (start + (self.chunk_size - 1) * step + self.resolution).min(chrom.length);

        Ok(CoarseSpan {
            chrom: chrom.name.clone(),
            chrom_length: chrom.length,
            start,
            end,
            rows: first_row..last_row,
        })
    }
}

///
/// The region of exactly `resolution * chunk_size` bases centred on the
/// midpoint of `[start, end)`.
///
/// The region is kept inside `[0, chrom_length]`: past the chromosome end it
/// shifts left rather than shrinking. With `chunk_size = 1` this is the one
/// `resolution`-wide window around the span's midpoint.
///
pub fn best_cover(
    start: u64,
    end: u64,
    chrom_length: u64,
    resolution: u64,
    chunk_size: u64,
) -> std::result::Result<Window, ConfigError> {
    let width = resolution.saturating_mul(chunk_size);
    if width > chrom_length {
        return Err(ConfigError::RegionTooWide {
            width,
            length: chrom_length,
        });
    }

    let mid = Window::new(start, end.max(start)).mid_point();
    let mut cover_start = mid.saturating_sub(width / 2);
    if cover_start + width > chrom_length {
        cover_start = chrom_length - width;
    }

    Ok(Window::new(cover_start, cover_start + width))
}

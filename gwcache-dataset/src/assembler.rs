use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, Axis, concatenate};
use serde::Serialize;

use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::tile;
use gwcache_store::{TableKey, TableStore};

use crate::indexer::{SampleIndexer, best_cover};

/// Genomic origin of one row of a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub resolution: u64,
}

///
/// One assembled training sample: `chunk_size` rows per resolution, stacked
/// from the finest resolution to the coarsest, each row tagged with the
/// window it summarises.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub index: u64,
    pub chrom: String,
    pub columns: Vec<String>,
    pub positions: Vec<Position>,
    pub values: Array2<f64>,
}

impl Sample {
    /// Rows contributed by `resolution`.
    pub fn rows_at(&self, resolution: u64) -> impl Iterator<Item = usize> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.resolution == resolution)
            .map(|(i, _)| i)
    }
}

pub type Transform<T> = Arc<dyn Fn(Sample) -> T + Send + Sync>;

struct Layout {
    indexer: SampleIndexer,
    summary: TableStore,
    resolutions: Vec<u64>,
    overlap: u64,
}

///
/// Reads samples out of the consolidated summary tables.
///
/// Every call maps the tables it needs and drops them before returning, so
/// clones can be handed to worker threads freely.
///
pub struct SampleAssembler<T = Sample> {
    layout: Arc<Layout>,
    transform: Transform<T>,
}

impl<T> Clone for SampleAssembler<T> {
    fn clone(&self) -> Self {
        SampleAssembler {
            layout: Arc::clone(&self.layout),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T> fmt::Debug for SampleAssembler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleAssembler")
            .field("len", &self.layout.indexer.len())
            .field("resolutions", &self.layout.resolutions)
            .field("summary", &self.layout.summary.root())
            .finish()
    }
}

impl SampleAssembler<Sample> {
    ///
    /// # Arguments
    /// - indexer: sample index over the run's chromosomes
    /// - summary: store holding the consolidated tables
    /// - resolutions: ascending resolution ladder
    /// - overlap: window overlap shared by every resolution
    ///
    pub fn new(
        indexer: SampleIndexer,
        summary: TableStore,
        resolutions: Vec<u64>,
        overlap: u64,
    ) -> Self {
        SampleAssembler {
            layout: Arc::new(Layout {
                indexer,
                summary,
                resolutions,
                overlap,
            }),
            transform: Arc::new(|sample: Sample| sample),
        }
    }
}

impl<T> SampleAssembler<T> {
    /// Apply `transform` to every assembled sample and return its output.
    pub fn with_transform<U, F>(self, transform: F) -> SampleAssembler<U>
    where
        F: Fn(Sample) -> U + Send + Sync + 'static,
    {
        SampleAssembler {
            layout: self.layout,
            transform: Arc::new(transform),
        }
    }

    pub fn len(&self) -> u64 {
        self.layout.indexer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.indexer.is_empty()
    }

    pub fn get(&self, index: u64) -> Result<T> {
        Ok((self.transform)(self.assemble(index)?))
    }

    /// The untransformed sample at `index`.
    pub fn assemble(&self, index: u64) -> Result<Sample> {
        let layout = &self.layout;
        let len = layout.indexer.len();
        if index >= len {
            return Err(CacheError::Bounds { index, len });
        }

        let span = layout.indexer.locate(index)?;
        let chunk_size = layout.indexer.chunk_size();

        let mut columns: Option<Vec<String>> = None;
        let mut blocks = Vec::with_capacity(layout.resolutions.len());
        let mut positions = Vec::new();

        for &resolution in &layout.resolutions {
            let tiling = tile(span.chrom_length, resolution, layout.overlap)?;
            let cover = best_cover(
                span.start,
                span.end,
                span.chrom_length,
                resolution,
                chunk_size,
            )?;

            let first = tiling.row_at(cover.start);
            let last = (first + chunk_size as usize).min(tiling.len());

            let key = TableKey::new(&span.chrom, resolution, layout.overlap);
            let reader = layout.summary.open(&key)?;
            if reader.rows() != tiling.len() {
                return Err(CacheError::consistency(
                    &key,
                    format!(
                        "summary has {} rows, expected {}",
                        reader.rows(),
                        tiling.len()
                    ),
                ));
            }

            match &columns {
                None => columns = Some(reader.columns().to_vec()),
                Some(expected) if expected.as_slice() != reader.columns() => {
                    return Err(CacheError::consistency(
                        &key,
                        "summary columns differ between resolutions",
                    ));
                }
                Some(_) => {}
            }

            blocks.push(reader.read_rows(first..last)?);
            for row in first..last {
                // rows below tiling.len() always have a window
                if let Some(window) = tiling.window(row) {
                    positions.push(Position {
                        chrom: span.chrom.clone(),
                        start: window.start,
                        end: window.end,
                        resolution,
                    });
                }
            }
        }

        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        let values = concatenate(Axis(0), &views)
            .map_err(|e| CacheError::Storage(format!("failed to stack sample rows: {}", e)))?;

        Ok(Sample {
            index,
            chrom: span.chrom,
            columns: columns.unwrap_or_default(),
            positions,
            values,
        })
    }
}

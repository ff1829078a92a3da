use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::Chromosome;
use gwcache_core::utils::get_dynamic_reader;

use super::match_chromosome;
use crate::source::{Interval, SignalSource, normalize, overlapping};

///
/// A bedGraph file (`chrom start end value`, optionally gzipped), loaded into
/// memory for the requested chromosomes only. `track` and `browser` header
/// lines are skipped.
///
pub struct BedGraphSource {
    path: PathBuf,
    lengths: HashMap<String, u64>,
    intervals: HashMap<String, Vec<Interval>>,
}

impl BedGraphSource {
    ///
    /// Load the records of `chromosomes` from a bedGraph file.
    ///
    /// Chromosome lengths are taken from `chromosomes`, since bedGraph files
    /// carry none. A requested chromosome without a single record is reported
    /// as absent from the file.
    ///
    pub fn open<P: AsRef<Path>>(path: P, chromosomes: &[Chromosome]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader =
            get_dynamic_reader(&path).map_err(|e| CacheError::source_unavailable(&path, e))?;

        let mut intervals: HashMap<String, Vec<Interval>> = HashMap::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CacheError::source_unavailable(&path, e))?;
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            let malformed = |what: &str| {
                CacheError::source_unavailable(
                    &path,
                    format!("line {}: {}", line_num + 1, what),
                )
            };

            let mut fields = line.split_whitespace();
            let (Some(chrom), Some(start), Some(end), Some(value)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed("expected four columns"));
            };

            let Some(chromosome) = match_chromosome(chrom, chromosomes) else {
                continue;
            };

            let start = start
                .parse::<u64>()
                .map_err(|_| malformed("invalid start"))?;
            let end = end.parse::<u64>().map_err(|_| malformed("invalid end"))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| malformed("invalid value"))?;

            intervals
                .entry(chromosome.name.clone())
                .or_default()
                .push(Interval::new(start, end, value));
        }

        let intervals: HashMap<String, Vec<Interval>> = intervals
            .into_iter()
            .map(|(chrom, list)| (chrom, normalize(list)))
            .collect();
        let lengths = chromosomes
            .iter()
            .filter(|c| intervals.contains_key(&c.name))
            .map(|c| (c.name.clone(), c.length))
            .collect();

        Ok(BedGraphSource {
            path,
            lengths,
            intervals,
        })
    }
}

impl SignalSource for BedGraphSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        self.lengths.get(chrom).copied()
    }

    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<Interval>> {
        Ok(self
            .intervals
            .get(chrom)
            .map(|list| overlapping(list, start, end))
            .unwrap_or_default())
    }
}

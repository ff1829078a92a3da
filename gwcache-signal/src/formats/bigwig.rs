use std::path::{Path, PathBuf};

use bigtools::BigWigRead;
use bigtools::utils::reopen::ReopenableFile;

use gwcache_core::errors::{CacheError, Result};
use gwcache_core::utils::bare_chrom_name;

use crate::source::{Interval, SignalSource};

///
/// A BigWig file read through `bigtools`. Chromosome lengths come from the
/// file header.
///
pub struct BigWigSource {
    path: PathBuf,
    reader: BigWigRead<ReopenableFile>,
}

impl BigWigSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path
            .to_str()
            .ok_or_else(|| CacheError::source_unavailable(&path, "path is not valid UTF-8"))?;
        let reader = BigWigRead::open_file(path_str)
            .map_err(|e| CacheError::source_unavailable(&path, format!("{:?}", e)))?;

        Ok(BigWigSource { path, reader })
    }

    /// The name the file uses for `chrom`, tolerating a missing or extra `chr` prefix.
    fn file_chrom_name(&self, chrom: &str) -> Option<String> {
        let chroms = self.reader.chroms();
        chroms
            .iter()
            .find(|c| c.name == chrom)
            .or_else(|| {
                let bare = bare_chrom_name(chrom);
                chroms.iter().find(|c| bare_chrom_name(&c.name) == bare)
            })
            .map(|c| c.name.clone())
    }
}

impl SignalSource for BigWigSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        let name = self.file_chrom_name(chrom)?;
        self.reader
            .chroms()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.length as u64)
    }

    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<Interval>> {
        let name = self.file_chrom_name(chrom).ok_or_else(|| {
            CacheError::source_unavailable(&self.path, format!("chromosome {} not in file", chrom))
        })?;
        let length = self.chrom_length(&name).unwrap_or(end);
        let end = end.min(length);
        if start >= end {
            return Ok(Vec::new());
        }

        let path = &self.path;
        let values = self
            .reader
            .get_interval(&name, start as u32, end as u32)
            .map_err(|e| CacheError::source_unavailable(path, format!("{:?}", e)))?;

        let mut intervals = Vec::new();
        for value in values {
            let value =
                value.map_err(|e| CacheError::source_unavailable(path, format!("{:?}", e)))?;
            intervals.push(Interval::new(
                value.start as u64,
                value.end as u64,
                value.value as f64,
            ));
        }

        Ok(intervals)
    }
}

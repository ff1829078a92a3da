use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gwcache_core::consts::TRACKS_SUBFOLDER;
use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::{Chromosome, Statistic, Track, tile};
use gwcache_signal::{SummaryTable, extract_track};

use crate::table::{KeyLocks, TableAttrs, TableKey, TableReader, TableStore};

/// Whether [`TrackCache::ensure`] found the entry or had to build it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Hit,
    Built,
}

///
/// A committed per-track summary table.
///
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub track: String,
    pub key: TableKey,
    pub columns: Vec<String>,
    pub rows: usize,
    pub status: EntryStatus,
}

///
/// Per-track summary tables under `<cache_root>/tracks/<track_key>/`.
///
/// Entries are built at most once: [`ensure`](TrackCache::ensure) returns an
/// existing entry untouched unless asked to rebuild.
///
#[derive(Debug, Clone)]
pub struct TrackCache {
    root: PathBuf,
    storage_chunk_rows: usize,
    locks: KeyLocks,
}

impl TrackCache {
    pub fn new<P: AsRef<Path>>(cache_root: P, storage_chunk_rows: usize) -> Self {
        TrackCache {
            root: cache_root.as_ref().join(TRACKS_SUBFOLDER),
            storage_chunk_rows,
            locks: KeyLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The store holding every table of one track.
    pub fn store(&self, track_key: &str) -> TableStore {
        TableStore::new(self.root.join(track_key)).with_locks(self.locks.clone())
    }

    pub fn open(&self, track_key: &str, key: &TableKey) -> Result<TableReader> {
        self.store(track_key).open(key)
    }

    ///
    /// Make sure the summary table of `track` on `chromosome` exists,
    /// extracting it from the raw source when it does not (or when
    /// `rebuild` is set).
    ///
    /// The raw file is only touched when a build is needed.
    ///
    pub fn ensure(
        &self,
        track: &Track,
        chromosome: &Chromosome,
        resolution: u64,
        overlap: u64,
        statistics: &[Statistic],
        rebuild: bool,
    ) -> Result<CacheEntry> {
        self.ensure_with(track, chromosome, resolution, overlap, statistics, rebuild, || {
            extract_track(track, chromosome, resolution, overlap, statistics)
        })
    }

    /// [`ensure`](TrackCache::ensure) with a caller-supplied extractor.
    #[allow(clippy::too_many_arguments)]
    pub fn ensure_with<F>(
        &self,
        track: &Track,
        chromosome: &Chromosome,
        resolution: u64,
        overlap: u64,
        statistics: &[Statistic],
        rebuild: bool,
        extract: F,
    ) -> Result<CacheEntry>
    where
        F: FnOnce() -> Result<SummaryTable>,
    {
        let key = TableKey::new(&chromosome.name, resolution, overlap);
        let store = self.store(&track.key);

        let lock = store.lock(&key)?;
        let _guard = lock
            .lock()
            .map_err(|e| CacheError::Storage(format!("lock for {} poisoned: {}", key, e)))?;

        if !rebuild && store.exists(&key) {
            let reader = store.open(&key)?;
            log::debug!("{}: {} already cached", track.key, key);
            return Ok(CacheEntry {
                track: track.key.clone(),
                key,
                columns: reader.columns().to_vec(),
                rows: reader.rows(),
                status: EntryStatus::Hit,
            });
        }

        let table = extract()?;

        let expected_rows = tile(chromosome.length, resolution, overlap)?.len();
        if table.rows() != expected_rows {
            return Err(CacheError::consistency(
                format!("{}/{}", track.key, key),
                format!(
                    "extracted {} rows, expected {}",
                    table.rows(),
                    expected_rows
                ),
            ));
        }

        let attrs = TableAttrs::new(
            &key,
            table.columns.clone(),
            table.rows(),
            self.storage_chunk_rows,
        )
        .with_tracks(vec![track.key.clone()]);

        let mut writer = store.create(&key, attrs)?;
        writer.write_block(0, 0, table.values.view())?;
        writer.commit()?;

        log::info!("{}: built {} ({} rows)", track.key, key, table.rows());
        Ok(CacheEntry {
            track: track.key.clone(),
            key,
            columns: table.columns,
            rows: expected_rows,
            status: EntryStatus::Built,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{Array2, array};
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::cell::Cell;
    use std::io::Write;

    use gwcache_core::models::SourceFormat;

    fn table(rows: usize) -> SummaryTable {
        SummaryTable {
            columns: vec!["mean".to_string()],
            values: Array2::from_shape_fn((rows, 1), |(r, _)| r as f64),
        }
    }

    #[fixture]
    fn track() -> Track {
        Track::new("dnase", "/nonexistent/dnase.bedgraph", SourceFormat::BedGraph)
    }

    #[rstest]
    fn test_ensure_is_idempotent(track: Track) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TrackCache::new(dir.path(), 4);
        let chrom = Chromosome::new("chr1", 1000);
        let calls = Cell::new(0);

        for _ in 0..2 {
            cache
                .ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], false, || {
                    calls.set(calls.get() + 1);
                    Ok(table(10))
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 1);

        let entry = cache
            .ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], false, || {
                unreachable!()
            })
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Hit);
        assert_eq!(entry.rows, 10);
        assert_eq!(entry.columns, vec!["mean"]);
        assert!(dir.path().join("tracks/dnase/chr1/r100_o0/data.npy").is_file());
    }

    #[rstest]
    fn test_ensure_rebuild_recomputes(track: Track) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TrackCache::new(dir.path(), 4);
        let chrom = Chromosome::new("chr1", 1000);

        cache
            .ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], false, || Ok(table(10)))
            .unwrap();
        let entry = cache
            .ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], true, || {
                Ok(SummaryTable {
                    columns: vec!["mean".to_string()],
                    values: Array2::from_elem((10, 1), 7.0),
                })
            })
            .unwrap();

        assert_eq!(entry.status, EntryStatus::Built);
        let reader = cache.open("dnase", &entry.key).unwrap();
        assert_eq!(reader.read(0..2, 0..1).unwrap(), array![[7.0], [7.0]]);
    }

    #[rstest]
    fn test_ensure_rejects_wrong_row_count(track: Track) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TrackCache::new(dir.path(), 4);
        let chrom = Chromosome::new("chr1", 1000);

        let result =
            cache.ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], false, || Ok(table(9)));
        assert!(matches!(result, Err(CacheError::Consistency { .. })));
        assert!(!cache.store("dnase").exists(&TableKey::new("chr1", 100, 0)));
    }

    #[rstest]
    fn test_cached_track_needs_no_raw_file(track: Track) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TrackCache::new(dir.path(), 4);
        let chrom = Chromosome::new("chr1", 1000);

        cache
            .ensure_with(&track, &chrom, 100, 0, &[Statistic::Mean], false, || Ok(table(10)))
            .unwrap();

        // the raw path does not exist, but the entry is already built
        let entry = cache
            .ensure(&track, &chrom, 100, 0, &[Statistic::Mean], false)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Hit);

        let result = cache.ensure(&track, &chrom, 100, 0, &[Statistic::Mean], true);
        assert!(matches!(result, Err(CacheError::SourceUnavailable { .. })));
    }

    #[rstest]
    fn test_ensure_from_bedgraph() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("h3k27ac.bedgraph");
        let mut file = std::fs::File::create(&raw).unwrap();
        writeln!(file, "chr1\t0\t50\t2").unwrap();
        drop(file);

        let track = Track::from_path(&raw).unwrap();
        let cache = TrackCache::new(dir.path().join("cache"), 4);
        let chrom = Chromosome::new("chr1", 250);

        let entry = cache
            .ensure(&track, &chrom, 100, 0, &[Statistic::Mean, Statistic::Coverage], false)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Built);
        assert_eq!(entry.rows, 3);

        let reader = cache.open("h3k27ac", &entry.key).unwrap();
        assert_eq!(reader.attrs().tracks, vec!["h3k27ac"]);
        assert_eq!(
            reader.read_rows(0..3).unwrap(),
            array![[1.0, 0.5], [0.0, 0.0], [0.0, 0.0]]
        );
    }
}

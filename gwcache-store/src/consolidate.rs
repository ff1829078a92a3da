use std::path::{Path, PathBuf};

use gwcache_core::consts::SUMMARY_SUBFOLDER;
use gwcache_core::errors::{CacheError, Result};

use crate::table::{TableAttrs, TableKey, TableReader, TableStore};
use crate::track::{CacheEntry, EntryStatus, TrackCache};

///
/// A committed wide table: every contributing track's columns side by side,
/// named `{track_key}_{statistic}`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    pub key: TableKey,
    pub tracks: Vec<String>,
    pub columns: Vec<String>,
    pub rows: usize,
    pub status: EntryStatus,
}

///
/// Merges the per-track tables of one (chromosome, resolution, overlap) key
/// into a single table under `<cache_root>/summary/`.
///
#[derive(Debug, Clone)]
pub struct SummaryConsolidator {
    store: TableStore,
    storage_chunk_rows: usize,
}

impl SummaryConsolidator {
    pub fn new<P: AsRef<Path>>(cache_root: P, storage_chunk_rows: usize) -> Self {
        SummaryConsolidator {
            store: TableStore::new(cache_root.as_ref().join(SUMMARY_SUBFOLDER)),
            storage_chunk_rows: storage_chunk_rows.max(1),
        }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn root(&self) -> PathBuf {
        self.store.root().to_path_buf()
    }

    pub fn open(&self, key: &TableKey) -> Result<TableReader> {
        self.store.open(key)
    }

    ///
    /// Build the consolidated table for `key` from `entries`, in the order
    /// given.
    ///
    /// All entries must have the same row count; the table is never
    /// truncated or padded to make them agree. The output is written one
    /// track at a time in blocks of `storage_chunk_rows` rows, so only one
    /// block is held in memory.
    ///
    /// An existing summary is reused only if it was built from the same
    /// tracks, in the same order, and none of `entries` was rebuilt since.
    ///
    pub fn consolidate(
        &self,
        cache: &TrackCache,
        entries: &[CacheEntry],
        key: &TableKey,
        rebuild: bool,
    ) -> Result<ConsolidatedTable> {
        let Some(first) = entries.first() else {
            return Err(CacheError::consistency(key, "no track tables to consolidate"));
        };

        let lock = self.store.lock(key)?;
        let _guard = lock
            .lock()
            .map_err(|e| CacheError::Storage(format!("lock for {} poisoned: {}", key, e)))?;

        if !rebuild && self.store.exists(key) {
            let reader = self.store.open(key)?;
            let same_tracks = reader
                .attrs()
                .tracks
                .iter()
                .eq(entries.iter().map(|e| &e.track));
            let rebuilt = entries.iter().any(|e| e.status == EntryStatus::Built);

            if same_tracks && !rebuilt {
                log::debug!("summary {} already consolidated", key);
                return Ok(ConsolidatedTable {
                    key: key.clone(),
                    tracks: reader.attrs().tracks.clone(),
                    columns: reader.columns().to_vec(),
                    rows: reader.rows(),
                    status: EntryStatus::Hit,
                });
            }
            log::info!("summary {} is out of date, consolidating again", key);
        }

        let readers = entries
            .iter()
            .map(|entry| {
                if entry.key != *key {
                    return Err(CacheError::consistency(
                        key,
                        format!("track {} was built for {}", entry.track, entry.key),
                    ));
                }
                cache.open(&entry.track, key)
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = first.rows;
        for (entry, reader) in entries.iter().zip(&readers) {
            if reader.rows() != rows || entry.rows != rows {
                return Err(CacheError::consistency(
                    key,
                    format!(
                        "track {} has {} rows but {} has {}",
                        entry.track,
                        reader.rows(),
                        first.track,
                        rows
                    ),
                ));
            }
            if reader.columns() != entry.columns.as_slice() {
                return Err(CacheError::consistency(
                    key,
                    format!(
                        "track {} stores columns {:?}, expected {:?}",
                        entry.track,
                        reader.columns(),
                        entry.columns
                    ),
                ));
            }
        }

        let tracks: Vec<String> = entries.iter().map(|e| e.track.clone()).collect();
        let columns: Vec<String> = entries
            .iter()
            .flat_map(|e| e.columns.iter().map(move |c| format!("{}_{}", e.track, c)))
            .collect();

        let attrs = TableAttrs::new(key, columns.clone(), rows, self.storage_chunk_rows)
            .with_tracks(tracks.clone());
        let mut writer = self.store.create(key, attrs)?;

        let mut col_offset = 0;
        for reader in &readers {
            let n_cols = reader.columns().len();
            for row_start in (0..rows).step_by(self.storage_chunk_rows) {
                let row_end = (row_start + self.storage_chunk_rows).min(rows);
                let block = reader.read(row_start..row_end, 0..n_cols)?;
                writer.write_block(row_start, col_offset, block.view())?;
            }
            col_offset += n_cols;
        }
        writer.commit()?;

        log::info!(
            "consolidated {} tracks into summary {} ({} rows, {} columns)",
            tracks.len(),
            key,
            rows,
            columns.len()
        );
        Ok(ConsolidatedTable {
            key: key.clone(),
            tracks,
            columns,
            rows,
            status: EntryStatus::Built,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{Array2, Axis, concatenate};
    use pretty_assertions::assert_eq;
    use rstest::*;

    use gwcache_core::models::{Chromosome, SourceFormat, Statistic, Track};
    use gwcache_signal::SummaryTable;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        cache: TrackCache,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let cache = TrackCache::new(&root, 3);
        Fixture {
            _dir: dir,
            root,
            cache,
        }
    }

    fn values(rows: usize, cols: usize, seed: f64) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| seed + r as f64 * 10.0 + c as f64)
    }

    fn build(cache: &TrackCache, key: &str, length: u64, values: Array2<f64>) -> CacheEntry {
        ensure(cache, key, length, values, false)
    }

    fn ensure(
        cache: &TrackCache,
        key: &str,
        length: u64,
        values: Array2<f64>,
        rebuild: bool,
    ) -> CacheEntry {
        let track = Track::new(key, format!("/nonexistent/{}.bw", key), SourceFormat::BigWig);
        let chrom = Chromosome::new("chr1", length);
        let stats = [Statistic::Mean, Statistic::Max];
        cache
            .ensure_with(&track, &chrom, 100, 0, &stats, rebuild, || {
                Ok(SummaryTable {
                    columns: vec!["mean".to_string(), "max".to_string()],
                    values,
                })
            })
            .unwrap()
    }

    #[rstest]
    fn test_consolidate_matches_naive_concatenation(fixture: Fixture) {
        let a = values(10, 2, 0.0);
        let b = values(10, 2, 0.5);
        let entries = vec![
            build(&fixture.cache, "A", 1000, a.clone()),
            build(&fixture.cache, "B", 1000, b.clone()),
        ];

        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);
        let table = consolidator
            .consolidate(&fixture.cache, &entries, &key, false)
            .unwrap();

        assert_eq!(table.status, EntryStatus::Built);
        assert_eq!(table.rows, 10);
        assert_eq!(table.columns, vec!["A_mean", "A_max", "B_mean", "B_max"]);

        let reader = consolidator.open(&key).unwrap();
        let expected = concatenate(Axis(1), &[a.view(), b.view()]).unwrap();
        assert_eq!(reader.read_rows(0..10).unwrap(), expected);
        assert_eq!(reader.attrs().chunk_rows, 3);
        assert_eq!(reader.attrs().tracks, vec!["A", "B"]);
    }

    #[rstest]
    fn test_consolidate_skips_existing(fixture: Fixture) {
        let entries = vec![build(&fixture.cache, "A", 1000, values(10, 2, 0.0))];
        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);

        consolidator
            .consolidate(&fixture.cache, &entries, &key, false)
            .unwrap();

        // a later run finds the track table already cached
        let entries = vec![build(&fixture.cache, "A", 1000, values(10, 2, 0.0))];
        assert_eq!(entries[0].status, EntryStatus::Hit);
        let again = consolidator
            .consolidate(&fixture.cache, &entries, &key, false)
            .unwrap();
        assert_eq!(again.status, EntryStatus::Hit);
        assert_eq!(again.columns, vec!["A_mean", "A_max"]);

        let rebuilt = consolidator
            .consolidate(&fixture.cache, &entries, &key, true)
            .unwrap();
        assert_eq!(rebuilt.status, EntryStatus::Built);
    }

    #[rstest]
    fn test_consolidate_picks_up_rebuilt_track(fixture: Fixture) {
        let entries = vec![build(&fixture.cache, "A", 1000, values(10, 2, 0.0))];
        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);
        consolidator
            .consolidate(&fixture.cache, &entries, &key, false)
            .unwrap();

        let fresh = values(10, 2, 100.0);
        let entries = vec![ensure(&fixture.cache, "A", 1000, fresh.clone(), true)];
        let table = consolidator
            .consolidate(&fixture.cache, &entries, &key, false)
            .unwrap();

        assert_eq!(table.status, EntryStatus::Built);
        assert_eq!(consolidator.open(&key).unwrap().read_rows(0..10).unwrap(), fresh);
    }

    #[rstest]
    fn test_consolidate_picks_up_changed_track_list(fixture: Fixture) {
        build(&fixture.cache, "A", 1000, values(10, 2, 0.0));
        build(&fixture.cache, "B", 1000, values(10, 2, 0.5));
        let a = build(&fixture.cache, "A", 1000, values(10, 2, 0.0));
        let b = build(&fixture.cache, "B", 1000, values(10, 2, 0.5));

        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);
        consolidator
            .consolidate(&fixture.cache, &[a.clone()], &key, false)
            .unwrap();

        let table = consolidator
            .consolidate(&fixture.cache, &[a.clone(), b.clone()], &key, false)
            .unwrap();
        assert_eq!(table.status, EntryStatus::Built);
        assert_eq!(table.columns, vec!["A_mean", "A_max", "B_mean", "B_max"]);
        assert_eq!(consolidator.open(&key).unwrap().attrs().tracks, vec!["A", "B"]);

        let reordered = consolidator
            .consolidate(&fixture.cache, &[b, a], &key, false)
            .unwrap();
        assert_eq!(reordered.status, EntryStatus::Built);
        assert_eq!(reordered.tracks, vec!["B", "A"]);
    }

    #[rstest]
    fn test_consolidate_rejects_row_mismatch(fixture: Fixture) {
        let a = build(&fixture.cache, "A", 1000, values(10, 2, 0.0));
        // B was built against a shorter chromosome, so it has 9 rows
        let b = build(&fixture.cache, "B", 900, values(9, 2, 0.0));

        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);
        let result = consolidator.consolidate(&fixture.cache, &[a, b], &key, false);

        assert!(matches!(result, Err(CacheError::Consistency { .. })));
        assert!(!consolidator.store().exists(&key));
    }

    #[rstest]
    fn test_consolidate_rejects_empty_input(fixture: Fixture) {
        let consolidator = SummaryConsolidator::new(&fixture.root, 3);
        let key = TableKey::new("chr1", 100, 0);
        assert!(matches!(
            consolidator.consolidate(&fixture.cache, &[], &key, false),
            Err(CacheError::Consistency { .. })
        ));
    }
}

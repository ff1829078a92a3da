use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::fs::{self, File, OpenOptions};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use memmap2::{Mmap, MmapMut};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Ix2, s};
use ndarray_npy::{ViewMutNpyExt, ViewNpyExt, write_zeroed_npy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gwcache_core::consts::{TABLE_ATTRS_FILE, TABLE_DATA_FILE};
use gwcache_core::errors::{CacheError, Result};

///
/// Address of one table inside a store.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct TableKey {
    pub chrom: String,
    pub resolution: u64,
    pub overlap: u64,
}

impl TableKey {
    pub fn new(chrom: impl Into<String>, resolution: u64, overlap: u64) -> Self {
        TableKey {
            chrom: chrom.into(),
            resolution,
            overlap,
        }
    }

    /// `<chrom>/r<resolution>_o<overlap>`
    pub fn relative_dir(&self) -> PathBuf {
        Path::new(&self.chrom).join(format!("r{}_o{}", self.resolution, self.overlap))
    }
}

impl Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/r{}_o{}", self.chrom, self.resolution, self.overlap)
    }
}

///
/// Attributes stored beside a table's data. `columns` names every column
/// and is load-bearing: readers rely on it to interpret the data.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAttrs {
    pub columns: Vec<String>,
    pub rows: usize,
    pub chunk_rows: usize,
    pub chrom: String,
    pub resolution: u64,
    pub overlap: u64,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl TableAttrs {
    pub fn new(key: &TableKey, columns: Vec<String>, rows: usize, chunk_rows: usize) -> Self {
        TableAttrs {
            columns,
            rows,
            chunk_rows: chunk_rows.max(1),
            chrom: key.chrom.clone(),
            resolution: key.resolution,
            overlap: key.overlap,
            tracks: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<String>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(name.into(), value.into());
    }
}

fn storage_error(context: &str, e: impl Display) -> CacheError {
    CacheError::Storage(format!("{}: {}", context, e))
}

///
/// Registry of in-process locks, one per table directory. Clones share the
/// same registry.
///
#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `dir`; hold its guard while checking and writing.
    pub fn get(&self, dir: &Path) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| storage_error("lock registry poisoned", e))?;
        Ok(locks.entry(dir.to_path_buf()).or_default().clone())
    }
}

///
/// A directory of tables laid out as
/// `<root>/<chrom>/r<resolution>_o<overlap>/{data.npy, attrs.json}`.
///
/// A table exists once its `attrs.json` is in place. Writes go to a
/// temporary directory beside the final one and are renamed into place on
/// commit, so a crashed or failed write never leaves a table behind.
///
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
    locks: KeyLocks,
}

impl TableStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        TableStore {
            root: root.as_ref().to_path_buf(),
            locks: KeyLocks::new(),
        }
    }

    /// Share a lock registry with other stores.
    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, key: &TableKey) -> PathBuf {
        self.root.join(key.relative_dir())
    }

    pub fn exists(&self, key: &TableKey) -> bool {
        self.dir(key).join(TABLE_ATTRS_FILE).is_file()
    }

    pub fn lock(&self, key: &TableKey) -> Result<Arc<Mutex<()>>> {
        self.locks.get(&self.dir(key))
    }

    ///
    /// Start writing a zero-filled table of `attrs.rows` by
    /// `attrs.columns.len()` values. Nothing is visible under `key` until
    /// [`TableWriter::commit`] succeeds.
    ///
    pub fn create(&self, key: &TableKey, attrs: TableAttrs) -> Result<TableWriter> {
        let final_dir = self.dir(key);
        let parent = final_dir
            .parent()
            .ok_or_else(|| storage_error("invalid table directory", final_dir.display()))?;
        fs::create_dir_all(parent)?;

        let tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(parent)?;

        let data_path = tmp.path().join(TABLE_DATA_FILE);
        let file = File::create(&data_path)?;
        write_zeroed_npy::<f64, _>(&file, Ix2(attrs.rows, attrs.columns.len()))
            .map_err(|e| storage_error("failed to allocate table", e))?;
        drop(file);

        let file = OpenOptions::new().read(true).write(true).open(&data_path)?;
        let mmap = unsafe { MmapMut::map_mut(&file) }?;

        Ok(TableWriter {
            key: key.clone(),
            final_dir,
            tmp,
            mmap,
            attrs,
        })
    }

    /// Open a committed table read-only.
    pub fn open(&self, key: &TableKey) -> Result<TableReader> {
        let dir = self.dir(key);
        let attrs_path = dir.join(TABLE_ATTRS_FILE);
        if !attrs_path.is_file() {
            return Err(CacheError::MissingEntry(format!(
                "{} ({})",
                key,
                dir.display()
            )));
        }

        let attrs: TableAttrs = serde_json::from_str(&fs::read_to_string(&attrs_path)?)
            .map_err(|e| storage_error("failed to parse table attributes", e))?;

        let file = File::open(dir.join(TABLE_DATA_FILE))?;
        let mmap = unsafe { Mmap::map(&file) }?;

        let reader = TableReader {
            key: key.clone(),
            attrs,
            mmap,
        };
        let (rows, cols) = reader.view()?.dim();
        if cols != reader.attrs.columns.len() || rows != reader.attrs.rows {
            return Err(CacheError::consistency(
                key,
                format!(
                    "stored attributes describe {} x {} but data is {} x {}",
                    reader.attrs.rows,
                    reader.attrs.columns.len(),
                    rows,
                    cols
                ),
            ));
        }

        Ok(reader)
    }

    /// Delete a committed table, if present.
    pub fn remove(&self, key: &TableKey) -> Result<()> {
        let dir = self.dir(key);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}

///
/// An uncommitted table backed by a writable memory map. Dropping it without
/// calling [`commit`](TableWriter::commit) discards everything written.
///
pub struct TableWriter {
    key: TableKey,
    final_dir: PathBuf,
    tmp: tempfile::TempDir,
    mmap: MmapMut,
    attrs: TableAttrs,
}

impl TableWriter {
    pub fn key(&self) -> &TableKey {
        &self.key
    }

    pub fn attrs(&self) -> &TableAttrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut TableAttrs {
        &mut self.attrs
    }

    fn view_mut(&mut self) -> Result<ArrayViewMut2<'_, f64>> {
        ArrayViewMut2::<f64>::view_mut_npy(&mut self.mmap)
            .map_err(|e| storage_error("failed to view table", e))
    }

    ///
    /// Copy `block` into the table with its top-left corner at
    /// (`row`, `col`).
    ///
    pub fn write_block(&mut self, row: usize, col: usize, block: ArrayView2<f64>) -> Result<()> {
        let key = self.key.clone();
        let mut view = self.view_mut()?;
        let (rows, cols) = view.dim();
        let (block_rows, block_cols) = block.dim();

        if row + block_rows > rows || col + block_cols > cols {
            return Err(CacheError::consistency(
                key,
                format!(
                    "block of {} x {} at ({}, {}) does not fit a {} x {} table",
                    block_rows, block_cols, row, col, rows, cols
                ),
            ));
        }

        view.slice_mut(s![row..row + block_rows, col..col + block_cols])
            .assign(&block);
        Ok(())
    }

    /// Write a whole column.
    pub fn write_column(&mut self, col: usize, values: &[f64]) -> Result<()> {
        let block = ArrayView2::from_shape((values.len(), 1), values)
            .map_err(|e| storage_error("invalid column", e))?;
        self.write_block(0, col, block)
    }

    ///
    /// Flush the data, write the attributes, and move the table into place,
    /// replacing any previous table under the same key.
    ///
    pub fn commit(self) -> Result<()> {
        let TableWriter {
            key,
            final_dir,
            tmp,
            mmap,
            attrs,
        } = self;

        mmap.flush()?;
        drop(mmap);

        let attrs_json = serde_json::to_string_pretty(&attrs)
            .map_err(|e| storage_error("failed to serialize table attributes", e))?;
        fs::write(tmp.path().join(TABLE_ATTRS_FILE), attrs_json)?;

        let tmp_path = tmp.keep();
        if let Err(e) = replace_dir(&tmp_path, &final_dir) {
            let _ = fs::remove_dir_all(&tmp_path);
            return Err(storage_error(&format!("failed to commit {}", key), e));
        }

        log::debug!("committed table {} to {}", key, final_dir.display());
        Ok(())
    }
}

///
/// Move the staged directory `staged` to `target`. An existing `target` is set
/// aside first and deleted only once the new directory is in place, so a
/// failed move restores it.
///
fn replace_dir(staged: &Path, target: &Path) -> std::io::Result<()> {
    if !target.exists() {
        return fs::rename(staged, target);
    }

    let backup = staged.with_extension("old");
    fs::rename(target, &backup)?;
    if let Err(e) = fs::rename(staged, target) {
        if let Err(restore) = fs::rename(&backup, target) {
            log::error!(
                "failed to restore {} from {}: {}",
                target.display(),
                backup.display(),
                restore
            );
        }
        return Err(e);
    }

    if let Err(e) = fs::remove_dir_all(&backup) {
        log::warn!("failed to remove replaced table {}: {}", backup.display(), e);
    }
    Ok(())
}

///
/// A committed table mapped read-only.
///
pub struct TableReader {
    key: TableKey,
    attrs: TableAttrs,
    mmap: Mmap,
}

impl TableReader {
    pub fn key(&self) -> &TableKey {
        &self.key
    }

    pub fn attrs(&self) -> &TableAttrs {
        &self.attrs
    }

    pub fn columns(&self) -> &[String] {
        &self.attrs.columns
    }

    pub fn rows(&self) -> usize {
        self.attrs.rows
    }

    pub fn view(&self) -> Result<ArrayView2<'_, f64>> {
        ArrayView2::<f64>::view_npy(&self.mmap).map_err(|e| storage_error("failed to view table", e))
    }

    /// Copy out the values in `rows` x `cols`.
    pub fn read(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Array2<f64>> {
        let view = self.view()?;
        let (n_rows, n_cols) = view.dim();
        if rows.start > rows.end || rows.end > n_rows || cols.start > cols.end || cols.end > n_cols
        {
            return Err(CacheError::consistency(
                &self.key,
                format!(
                    "slice {:?} x {:?} is outside a {} x {} table",
                    rows, cols, n_rows, n_cols
                ),
            ));
        }
        Ok(view.slice(s![rows, cols]).to_owned())
    }

    /// Copy out every column of `rows`.
    pub fn read_rows(&self, rows: Range<usize>) -> Result<Array2<f64>> {
        self.read(rows, 0..self.attrs.columns.len())
    }
}

//! # gwcache-store
//!
//! The on-disk half of gwcache. A [`TableStore`] keeps one dense `f64` table
//! per (chromosome, resolution, overlap) key as a `.npy` file with a JSON
//! attribute sidecar. [`TrackCache`] fills one store per track with summary
//! tables, and [`SummaryConsolidator`] merges the per-track tables of a key
//! into one wide table.
pub mod consolidate;
pub mod table;
pub mod track;

pub use self::consolidate::{ConsolidatedTable, SummaryConsolidator};
pub use self::table::{KeyLocks, TableAttrs, TableKey, TableReader, TableStore, TableWriter};
pub use self::track::{CacheEntry, EntryStatus, TrackCache};

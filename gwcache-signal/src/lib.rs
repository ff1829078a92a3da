//! # gwcache-signal
//!
//! Readers for raw genomic signal and the per-window summary extraction that
//! turns a chromosome of signal into a table with one row per window and one
//! column per [`Statistic`](gwcache_core::models::Statistic).
//!
//! Every reader implements [`SignalSource`]; [`open_source`] picks one from a
//! track's [`SourceFormat`](gwcache_core::models::SourceFormat).
pub mod extract;
pub mod formats;
pub mod source;
pub mod stats;

pub use self::extract::{SummaryTable, extract, extract_in_batches, extract_track};
pub use self::source::{Interval, SignalSource, open_source};

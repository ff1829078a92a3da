//! # gwcache-dataset
//!
//! Turns a built gwcache directory into randomly indexable training samples.
//!
//! [`SampleIndexer`] maps a flat sample index to a chromosome and a span of
//! coarse windows; [`SampleAssembler`] reads the matching rows of every
//! resolution out of the consolidated tables. [`SignalDataset`] ties both to
//! a configuration and drives the cache build.
//!
//! ```rust,no_run
//! use gwcache_dataset::SignalDataset;
//!
//! let dataset = SignalDataset::from_path("dataset.toml").unwrap();
//! let report = dataset.build().unwrap();
//! assert!(report.is_complete());
//!
//! let sample = dataset.get(0).unwrap();
//! println!("{} rows from {}", sample.values.nrows(), sample.chrom);
//! ```
pub mod assembler;
pub mod dataset;
pub mod indexer;

pub use self::assembler::{Position, Sample, SampleAssembler, Transform};
pub use self::dataset::{BuildOutcome, BuildReport, SignalDataset};
pub use self::indexer::{CoarseSpan, SampleIndexer, best_cover};

//! # gwcache-core
//!
//! Shared building blocks for the gwcache workspace: the chromosome catalog,
//! window tiling, the summary statistic set, dataset configuration, and the
//! error taxonomy used by every other crate.
//!
//! ```rust
//! use gwcache_core::models::tile;
//!
//! let tiling = tile(1000, 300, 0).unwrap();
//! assert_eq!(tiling.len(), 4);
//! assert_eq!(tiling.window(3).unwrap().end, 1000);
//! ```
pub mod config;
pub mod consts;
pub mod errors;
pub mod models;
pub mod utils;

use std::path::PathBuf;

use thiserror::Error;

/// Problems found while loading or validating a run configuration.
///
/// All of these are raised at startup, before any signal is read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported summary statistic: '{0}'. Expected one of mean, max, min, std, coverage")]
    UnsupportedStatistic(String),

    #[error("At least one summary statistic must be configured")]
    NoStatistics,

    #[error("Statistic listed more than once: {0}")]
    DuplicateStatistic(String),

    #[error("At least one resolution must be configured")]
    NoResolutions,

    #[error("Resolutions must be positive")]
    ZeroResolution,

    #[error("Resolutions must be strictly ascending, got {0:?}")]
    UnsortedResolutions(Vec<u64>),

    #[error("Duplicate resolution: {0}")]
    DuplicateResolution(u64),

    #[error("Overlap {overlap} must be smaller than the smallest resolution {resolution}")]
    OverlapTooLarge { overlap: u64, resolution: u64 },

    #[error("Chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("Storage chunk rows must be at least 1")]
    ZeroStorageChunkRows,

    #[error(
        "Sample width {width} (resolution {resolution} x chunk size) exceeds chromosome {chrom} of length {length}"
    )]
    SampleWidthExceedsChromosome {
        width: u64,
        resolution: u64,
        chrom: String,
        length: u64,
    },

    #[error("Region width {width} exceeds chromosome length {length}")]
    RegionTooWide { width: u64, length: u64 },

    #[error("No chromosomes selected")]
    NoChromosomes,

    #[error("Unsupported chromosome: {0}")]
    UnsupportedChromosome(String),

    #[error("Duplicate chromosome in catalog: {0}")]
    DuplicateChromosome(String),

    #[error("Chromosome {0} has zero length")]
    EmptyChromosome(String),

    #[error("Malformed chrom sizes line {line}: {message}")]
    ChromSizesParse { line: usize, message: String },

    #[error("At least one track must be configured")]
    NoTracks,

    #[error("Duplicate track key: {0}")]
    DuplicateTrack(String),

    #[error("Cannot derive a track key from path: {0}")]
    InvalidTrackPath(PathBuf),

    #[error("Track key must be a single file name component, got '{0}'")]
    InvalidTrackKey(String),

    #[error("Unknown source format for {0}. Expected bigwig, bedgraph or mutations")]
    UnknownSourceFormat(String),

    #[error("Config file must have a `toml`, `yaml` or `yml` extension: {0}")]
    InvalidConfigFileType(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by the build and query phases.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The raw source for one track could not be opened or lacks a chromosome.
    /// Recoverable at the batch level: the build continues with other tracks.
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Row counts or stored metadata disagree. Never recovered by truncating or padding.
    #[error("Consistency error for {key}: {reason}")]
    Consistency { key: String, reason: String },

    #[error("Sample index {index} is out of bounds for a dataset of length {len}")]
    Bounds { index: u64, len: u64 },

    #[error("Cache entry is missing: {0}")]
    MissingEntry(String),

    #[error("Table storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CacheError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn consistency(key: impl ToString, reason: impl ToString) -> Self {
        CacheError::Consistency {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

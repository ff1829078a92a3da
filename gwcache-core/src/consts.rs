//! Constants shared across the gwcache crates: the built-in reference
//! assembly, cache layout names, and configuration defaults.

/// hg19 autosomes and chrX, in karyotype order.
///
/// Used when a configuration supplies neither an inline chromosome list nor a
/// `chrom.sizes` file.
pub const HG19_CHROM_SIZES: &[(&str, u64)] = &[
    ("chr1", 249_250_621),
    ("chr2", 243_199_373),
    ("chr3", 198_022_430),
    ("chr4", 191_154_276),
    ("chr5", 180_915_260),
    ("chr6", 171_115_067),
    ("chr7", 159_138_663),
    ("chr8", 146_364_022),
    ("chr9", 141_213_431),
    ("chr10", 135_534_747),
    ("chr11", 135_006_516),
    ("chr12", 133_851_895),
    ("chr13", 115_169_878),
    ("chr14", 107_349_540),
    ("chr15", 102_531_392),
    ("chr16", 90_354_753),
    ("chr17", 81_195_210),
    ("chr18", 78_077_248),
    ("chr19", 59_128_983),
    ("chr20", 63_025_520),
    ("chr21", 48_129_895),
    ("chr22", 51_304_566),
    ("chrX", 155_270_560),
];

// Cache directory layout

/// Subdirectory of the cache root holding one table store per track.
pub const TRACKS_SUBFOLDER: &str = "tracks";

/// Subdirectory of the cache root holding the consolidated tables.
pub const SUMMARY_SUBFOLDER: &str = "summary";

/// File name of a table's data inside its dataset directory.
pub const TABLE_DATA_FILE: &str = "data.npy";

/// File name of a table's attributes inside its dataset directory.
pub const TABLE_ATTRS_FILE: &str = "attrs.json";

// Extraction

/// Windows summarised per interval query while extracting a track, bounding
/// the signal held in memory for one chromosome.
pub const EXTRACT_BATCH_WINDOWS: usize = 8192;

// Configuration defaults

pub const DEFAULT_OVERLAP: u64 = 0;
pub const DEFAULT_CHUNK_SIZE: u64 = 1;
pub const DEFAULT_STORAGE_CHUNK_ROWS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 1;

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_OVERLAP, DEFAULT_STORAGE_CHUNK_ROWS,
};
use crate::errors::ConfigError;
use crate::models::{Chromosome, ChromosomeCatalog, Statistic, Track, TrackSet, TrackSpec};

fn default_overlap() -> u64 {
    DEFAULT_OVERLAP
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_storage_chunk_rows() -> usize {
    DEFAULT_STORAGE_CHUNK_ROWS
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

///
/// A chromosome in the configuration: either a name to look up in the
/// reference catalog or an explicit `{ name, length }` pair.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ChromosomeEntry {
    Name(String),
    Sized(Chromosome),
}

///
/// Dataset configuration as written on disk (TOML or YAML).
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub name: Option<String>,
    pub cache_dir: PathBuf,
    pub raw_dir: Option<PathBuf>,
    pub chrom_sizes: Option<PathBuf>,
    #[serde(default)]
    pub chromosomes: Vec<ChromosomeEntry>,
    pub resolutions: Vec<u64>,
    #[serde(default = "default_overlap")]
    pub overlap: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_storage_chunk_rows")]
    pub storage_chunk_rows: usize,
    pub statistics: Vec<Statistic>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub rebuild: bool,
    #[serde(default)]
    pub tracks: Vec<TrackSpec>,
    #[serde(default)]
    pub track_sets: Vec<TrackSet>,
}

#[derive(Debug, PartialEq)]
pub enum ConfigFileType {
    Toml,
    Yaml,
}

impl ConfigFileType {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(OsStr::to_str) {
            Some("toml") => Ok(ConfigFileType::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFileType::Yaml),
            _ => Err(ConfigError::InvalidConfigFileType(path.to_path_buf())),
        }
    }
}

impl TryFrom<&Path> for DatasetConfig {
    type Error = ConfigError;

    ///
    /// Load a configuration file. Relative paths inside it are taken
    /// relative to the directory holding the file, and `raw_dir` defaults
    /// to that directory.
    ///
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let file_type = ConfigFileType::from_path(path)?;
        let contents = read_to_string(path)?;
        let config: DatasetConfig = match file_type {
            ConfigFileType::Toml => toml::from_str(&contents)?,
            ConfigFileType::Yaml => serde_yaml::from_str(&contents)?,
        };

        let base = path.parent().unwrap_or(Path::new(""));
        Ok(config.rebase(base))
    }
}

impl DatasetConfig {
    fn rebase(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.cache_dir = join(self.cache_dir);
        self.chrom_sizes = self.chrom_sizes.map(join);
        self.raw_dir = Some(join(self.raw_dir.unwrap_or_default()));
        self
    }

    ///
    /// Validate the configuration and resolve it into the settings a run
    /// works from. Every configuration error surfaces here, before any
    /// signal is read.
    ///
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        if self.statistics.is_empty() {
            return Err(ConfigError::NoStatistics);
        }
        let mut seen = HashSet::new();
        if let Some(stat) = self.statistics.iter().find(|s| !seen.insert(**s)) {
            return Err(ConfigError::DuplicateStatistic(stat.to_string()));
        }
        validate_resolutions(&self.resolutions, self.overlap)?;
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.storage_chunk_rows == 0 {
            return Err(ConfigError::ZeroStorageChunkRows);
        }

        let catalog = self.catalog()?;
        // resolutions are ascending, so the last one is the widest sample
        let coarsest = self.resolutions[self.resolutions.len() - 1];
        validate_sample_width(&catalog, coarsest, self.chunk_size)?;

        let tracks = self.tracks()?;

        Ok(RunConfig {
            name: self.name.clone(),
            cache_dir: self.cache_dir.clone(),
            catalog,
            resolutions: self.resolutions.clone(),
            overlap: self.overlap,
            chunk_size: self.chunk_size,
            storage_chunk_rows: self.storage_chunk_rows,
            statistics: self.statistics.clone(),
            concurrency: self.concurrency.max(1),
            rebuild: self.rebuild,
            tracks,
        })
    }

    fn catalog(&self) -> Result<ChromosomeCatalog, ConfigError> {
        let reference = match &self.chrom_sizes {
            Some(path) => ChromosomeCatalog::from_chrom_sizes(path)?,
            None => ChromosomeCatalog::hg19(),
        };
        if self.chromosomes.is_empty() {
            return Ok(reference);
        }

        let selected = self
            .chromosomes
            .iter()
            .map(|entry| match entry {
                ChromosomeEntry::Sized(chrom) => Ok(chrom.clone()),
                ChromosomeEntry::Name(name) => reference
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnsupportedChromosome(name.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        ChromosomeCatalog::new(selected)
    }

    fn tracks(&self) -> Result<Vec<Track>, ConfigError> {
        let specs = self
            .tracks
            .iter()
            .cloned()
            .chain(self.track_sets.iter().flat_map(|set| set.expand()));

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();
        for spec in specs {
            let track = spec.resolve(self.raw_dir.as_deref())?;
            if !seen.insert(track.key.clone()) {
                return Err(ConfigError::DuplicateTrack(track.key));
            }
            tracks.push(track);
        }

        if tracks.is_empty() {
            return Err(ConfigError::NoTracks);
        }
        Ok(tracks)
    }
}

/// Resolutions must be positive, strictly ascending, and wider than the overlap.
pub fn validate_resolutions(resolutions: &[u64], overlap: u64) -> Result<(), ConfigError> {
    let Some(&finest) = resolutions.first() else {
        return Err(ConfigError::NoResolutions);
    };
    if resolutions.contains(&0) {
        return Err(ConfigError::ZeroResolution);
    }
    for pair in resolutions.windows(2) {
        if pair[0] == pair[1] {
            return Err(ConfigError::DuplicateResolution(pair[0]));
        }
        if pair[0] > pair[1] {
            return Err(ConfigError::UnsortedResolutions(resolutions.to_vec()));
        }
    }
    if overlap >= finest {
        return Err(ConfigError::OverlapTooLarge {
            overlap,
            resolution: finest,
        });
    }
    Ok(())
}

/// Every chromosome must fit at least one sample of the coarsest resolution.
pub fn validate_sample_width(
    catalog: &ChromosomeCatalog,
    coarsest: u64,
    chunk_size: u64,
) -> Result<(), ConfigError> {
    let width = coarsest.saturating_mul(chunk_size);
    match catalog.shortest() {
        Some(chrom) if width > chrom.length => Err(ConfigError::SampleWidthExceedsChromosome {
            width,
            resolution: coarsest,
            chrom: chrom.name.clone(),
            length: chrom.length,
        }),
        Some(_) => Ok(()),
        None => Err(ConfigError::NoChromosomes),
    }
}

///
/// Validated settings for one dataset: the chromosome catalog, the
/// resolution ladder, and the resolved track list.
///
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub name: Option<String>,
    pub cache_dir: PathBuf,
    pub catalog: ChromosomeCatalog,
    pub resolutions: Vec<u64>,
    pub overlap: u64,
    pub chunk_size: u64,
    pub storage_chunk_rows: usize,
    pub statistics: Vec<Statistic>,
    pub concurrency: usize,
    pub rebuild: bool,
    pub tracks: Vec<Track>,
}

impl RunConfig {
    pub fn coarsest_resolution(&self) -> u64 {
        // non-empty after validation
        self.resolutions.last().copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    use crate::models::SourceFormat;

    #[fixture]
    fn config() -> DatasetConfig {
        DatasetConfig {
            name: Some("test".to_string()),
            cache_dir: PathBuf::from("/tmp/cache"),
            raw_dir: Some(PathBuf::from("/tmp/raw")),
            chrom_sizes: None,
            chromosomes: vec![
                ChromosomeEntry::Sized(Chromosome::new("chr1", 10_000)),
                ChromosomeEntry::Sized(Chromosome::new("chr2", 5_000)),
            ],
            resolutions: vec![100, 1000],
            overlap: 0,
            chunk_size: 2,
            storage_chunk_rows: 10,
            statistics: vec![Statistic::Mean, Statistic::Max],
            concurrency: 2,
            rebuild: false,
            tracks: vec![TrackSpec {
                key: None,
                path: PathBuf::from("a.bedgraph"),
                format: None,
                url: None,
            }],
            track_sets: vec![],
        }
    }

    #[rstest]
    fn test_resolve_valid(config: DatasetConfig) {
        let run = config.resolve().unwrap();
        assert_eq!(run.catalog.len(), 2);
        assert_eq!(run.coarsest_resolution(), 1000);
        assert_eq!(run.tracks[0].key, "a");
        assert_eq!(run.tracks[0].path, PathBuf::from("/tmp/raw/a.bedgraph"));
        assert_eq!(run.tracks[0].format, SourceFormat::BedGraph);
    }

    #[rstest]
    #[case(vec![], "NoResolutions")]
    #[case(vec![0, 100], "ZeroResolution")]
    #[case(vec![1000, 100], "UnsortedResolutions")]
    #[case(vec![100, 100], "DuplicateResolution")]
    fn test_resolve_rejects_bad_resolutions(
        mut config: DatasetConfig,
        #[case] resolutions: Vec<u64>,
        #[case] expected: &str,
    ) {
        config.resolutions = resolutions;
        let err = config.resolve().unwrap_err();
        assert!(format!("{:?}", err).starts_with(expected));
    }

    #[rstest]
    fn test_resolve_rejects_overlap(mut config: DatasetConfig) {
        config.overlap = 100;
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::OverlapTooLarge {
                overlap: 100,
                resolution: 100
            })
        ));
    }

    #[rstest]
    fn test_resolve_rejects_zero_chunk_size(mut config: DatasetConfig) {
        config.chunk_size = 0;
        assert!(matches!(config.resolve(), Err(ConfigError::ZeroChunkSize)));
    }

    #[rstest]
    fn test_resolve_rejects_empty_statistics(mut config: DatasetConfig) {
        config.statistics.clear();
        assert!(matches!(config.resolve(), Err(ConfigError::NoStatistics)));
    }

    #[rstest]
    fn test_resolve_rejects_duplicate_statistics(mut config: DatasetConfig) {
        config.statistics = vec![Statistic::Mean, Statistic::Max, Statistic::Mean];
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::DuplicateStatistic(stat)) if stat == "mean"
        ));
    }

    #[rstest]
    fn test_resolve_rejects_track_key_outside_cache(mut config: DatasetConfig) {
        config.tracks[0].key = Some("../escape".to_string());
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidTrackKey(key)) if key == "../escape"
        ));
    }

    #[rstest]
    fn test_resolve_rejects_sample_wider_than_chromosome(mut config: DatasetConfig) {
        config.chunk_size = 6;
        let err = config.resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SampleWidthExceedsChromosome { width: 6000, ref chrom, length: 5000, .. } if chrom == "chr2"
        ));
    }

    #[rstest]
    fn test_resolve_rejects_unknown_chromosome(mut config: DatasetConfig) {
        config.chromosomes = vec![ChromosomeEntry::Name("chr99".to_string())];
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::UnsupportedChromosome(name)) if name == "chr99"
        ));
    }

    #[rstest]
    fn test_resolve_rejects_duplicate_tracks(mut config: DatasetConfig) {
        config.tracks.push(TrackSpec {
            key: None,
            path: PathBuf::from("other/a.bw"),
            format: None,
            url: None,
        });
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::DuplicateTrack(key)) if key == "a"
        ));
    }

    #[rstest]
    fn test_resolve_requires_tracks(mut config: DatasetConfig) {
        config.tracks.clear();
        assert!(matches!(config.resolve(), Err(ConfigError::NoTracks)));
    }

    #[rstest]
    fn test_named_chromosomes_come_from_hg19(mut config: DatasetConfig) {
        config.chromosomes = vec![
            ChromosomeEntry::Name("chr21".to_string()),
            ChromosomeEntry::Name("chr1".to_string()),
        ];
        let run = config.resolve().unwrap();
        let names: Vec<&str> = run.catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["chr21", "chr1"]);
        assert_eq!(run.catalog.length("chr21"), Some(48_129_895));
    }

    #[rstest]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        fs::write(
            &path,
            r#"
name = "roadmap"
cache_dir = "cache"
resolutions = [100, 1000]
overlap = 10
statistics = ["mean", "coverage"]
chromosomes = ["chr1", { name = "chrZ", length = 5000 }]

[[tracks]]
path = "dnase.bigwig"
url = "https://example.org/dnase.bigwig"

[[track_sets]]
template = "{assay}/{sample}.bedgraph.gz"
samples = ["E003"]
assays = ["H3K27ac"]
"#,
        )
        .unwrap();

        let config = DatasetConfig::try_from(path.as_path()).unwrap();
        assert_eq!(config.cache_dir, dir.path().join("cache"));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.storage_chunk_rows, DEFAULT_STORAGE_CHUNK_ROWS);

        let run = config.resolve().unwrap();
        let keys: Vec<&str> = run.tracks.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["dnase", "H3K27ac_E003"]);
        assert_eq!(run.tracks[1].path, dir.path().join("H3K27ac/E003.bedgraph.gz"));
        assert_eq!(run.catalog.length("chrZ"), Some(5000));
        assert_eq!(run.statistics, vec![Statistic::Mean, Statistic::Coverage]);
    }

    #[rstest]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.yaml");
        fs::write(
            &path,
            r#"
cache_dir: /abs/cache
resolutions: [200]
statistics: [max]
chromosomes:
  - { name: chrA, length: 1000 }
tracks:
  - path: muts.maf
"#,
        )
        .unwrap();

        let run = DatasetConfig::try_from(path.as_path())
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(run.cache_dir, PathBuf::from("/abs/cache"));
        assert_eq!(run.tracks[0].format, SourceFormat::Mutations);
    }

    #[rstest]
    fn test_load_rejects_unknown_statistic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        fs::write(
            &path,
            "cache_dir = \"c\"\nresolutions = [100]\nstatistics = [\"median\"]\n",
        )
        .unwrap();

        let err = DatasetConfig::try_from(path.as_path()).unwrap_err();
        assert!(err.to_string().contains("median"));
    }

    #[rstest]
    fn test_load_rejects_unknown_extension() {
        let result = DatasetConfig::try_from(Path::new("dataset.json"));
        assert!(matches!(result, Err(ConfigError::InvalidConfigFileType(_))));
    }
}

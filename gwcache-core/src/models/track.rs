use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

///
/// On-disk format of a raw signal source.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[serde(alias = "bw")]
    BigWig,
    #[serde(alias = "bg")]
    BedGraph,
    #[serde(alias = "maf")]
    Mutations,
}

const BIGWIG_EXTENSIONS: &[&str] = &["bw", "bigwig"];
const BEDGRAPH_EXTENSIONS: &[&str] = &["bedgraph", "bg"];
const MUTATION_EXTENSIONS: &[&str] = &["maf", "txt", "tsv"];

impl SourceFormat {
    ///
    /// Infer the format from a file extension. A trailing `.gz` is ignored
    /// for the text formats.
    ///
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let unknown = || ConfigError::UnknownSourceFormat(path.display().to_string());

        let (ext, gzipped) = split_extension(path).ok_or_else(unknown)?;
        let ext = ext.to_lowercase();

        if BIGWIG_EXTENSIONS.contains(&ext.as_str()) && !gzipped {
            Ok(SourceFormat::BigWig)
        } else if BEDGRAPH_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SourceFormat::BedGraph)
        } else if MUTATION_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SourceFormat::Mutations)
        } else {
            Err(unknown())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::BigWig => "bigwig",
            SourceFormat::BedGraph => "bedgraph",
            SourceFormat::Mutations => "mutations",
        }
    }
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bigwig" | "bw" => Ok(SourceFormat::BigWig),
            "bedgraph" | "bg" => Ok(SourceFormat::BedGraph),
            "mutations" | "maf" => Ok(SourceFormat::Mutations),
            _ => Err(ConfigError::UnknownSourceFormat(s.to_string())),
        }
    }
}

/// Last extension of `path` (ignoring `.gz`) and whether `.gz` was present.
fn split_extension(path: &Path) -> Option<(String, bool)> {
    let name = path.file_name()?.to_str()?;
    let (name, gzipped) = match name.strip_suffix(".gz") {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };
    let ext = Path::new(name).extension()?.to_str()?;
    Some((ext.to_string(), gzipped))
}

///
/// Check that `key` can name a directory under the cache root: non-empty,
/// free of path separators, and not `.` or `..`.
///
pub fn validate_track_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(ConfigError::InvalidTrackKey(key.to_string()));
    }
    Ok(())
}

///
/// Derive a track key from a file name by stripping `.gz` and one known
/// signal extension: `data/H3K4me1_E003.bigwig` becomes `H3K4me1_E003`.
///
pub fn track_key_from_path(path: &Path) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidTrackPath(path.to_path_buf());

    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let name = name.strip_suffix(".gz").unwrap_or(name);

    let stem = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext)
            if BIGWIG_EXTENSIONS
                .iter()
                .chain(BEDGRAPH_EXTENSIONS)
                .chain(MUTATION_EXTENSIONS)
                .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            &name[..name.len() - ext.len() - 1]
        }
        _ => name,
    };

    if stem.is_empty() {
        return Err(invalid());
    }
    Ok(stem.to_string())
}

///
/// One raw signal source with a stable key. The key names its cache folder
/// and prefixes its consolidated columns.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub key: String,
    pub path: PathBuf,
    pub format: SourceFormat,
    /// Where the raw file can be fetched from. Reported when the file is absent.
    pub url: Option<String>,
}

impl Track {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Track {
            key: key.into(),
            path: path.into(),
            format,
            url: None,
        }
    }

    /// Build a track with key and format inferred from the file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        Ok(Track::new(
            track_key_from_path(path)?,
            path,
            SourceFormat::from_path(path)?,
        ))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.path.display())
    }
}

/// A track as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSpec {
    pub key: Option<String>,
    pub path: PathBuf,
    pub format: Option<SourceFormat>,
    pub url: Option<String>,
}

impl TrackSpec {
    /// Resolve to a [`Track`]; relative paths are taken relative to `raw_dir`.
    pub fn resolve(&self, raw_dir: Option<&Path>) -> Result<Track, ConfigError> {
        let path = match raw_dir {
            Some(dir) if self.path.is_relative() => dir.join(&self.path),
            _ => self.path.clone(),
        };
        let key = match &self.key {
            Some(key) => key.clone(),
            None => track_key_from_path(&path)?,
        };
        validate_track_key(&key)?;
        let format = match self.format {
            Some(format) => format,
            None => SourceFormat::from_path(&path)?,
        };

        Ok(Track {
            key,
            path,
            format,
            url: self.url.clone(),
        })
    }
}

///
/// A family of tracks described by a file-name template over samples and
/// assays, e.g. `{assay}/{sample}-{assay}.bigwig`. Each (assay, sample) pair
/// becomes one track keyed `{assay}_{sample}`; with no assays the key is the
/// sample name.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSet {
    pub template: String,
    pub samples: Vec<String>,
    #[serde(default)]
    pub assays: Vec<String>,
    pub format: Option<SourceFormat>,
    pub url_template: Option<String>,
}

impl TrackSet {
    pub fn expand(&self) -> Vec<TrackSpec> {
        let render = |template: &str, assay: Option<&str>, sample: &str| {
            let rendered = template.replace("{sample}", sample);
            match assay {
                Some(assay) => rendered.replace("{assay}", assay),
                None => rendered,
            }
        };
        let make = |assay: Option<&str>, sample: &str| TrackSpec {
            key: Some(match assay {
                Some(assay) => format!("{}_{}", assay, sample),
                None => sample.to_string(),
            }),
            path: PathBuf::from(render(&self.template, assay, sample)),
            format: self.format,
            url: self.url_template.as_deref().map(|t| render(t, assay, sample)),
        };

        if self.assays.is_empty() {
            return self.samples.iter().map(|s| make(None, s)).collect();
        }
        self.assays
            .iter()
            .flat_map(|a| self.samples.iter().map(move |s| (a, s)))
            .map(|(a, s)| make(Some(a), s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("a/E003-H3K4me1.bigwig", SourceFormat::BigWig)]
    #[case("x.bw", SourceFormat::BigWig)]
    #[case("x.bedGraph", SourceFormat::BedGraph)]
    #[case("x.bg.gz", SourceFormat::BedGraph)]
    #[case("tcga.maf", SourceFormat::Mutations)]
    #[case("snv.tsv.gz", SourceFormat::Mutations)]
    fn test_source_format_from_path(#[case] path: &str, #[case] expected: SourceFormat) {
        assert_eq!(SourceFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[rstest]
    #[case("x.bam")]
    #[case("x.bw.gz")]
    #[case("noext")]
    fn test_source_format_unknown(#[case] path: &str) {
        assert!(matches!(
            SourceFormat::from_path(Path::new(path)),
            Err(ConfigError::UnknownSourceFormat(_))
        ));
    }

    #[rstest]
    #[case("dir/E003-H3K4me1.bigwig", "E003-H3K4me1")]
    #[case("E003.bedgraph.gz", "E003")]
    #[case("snv.tsv", "snv")]
    #[case("odd.name.v2.bw", "odd.name.v2")]
    fn test_track_key_from_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(track_key_from_path(Path::new(path)).unwrap(), expected);
    }

    #[rstest]
    fn test_track_spec_resolve_joins_raw_dir() {
        let spec = TrackSpec {
            key: None,
            path: PathBuf::from("dnase.bw"),
            format: None,
            url: Some("https://example.org/dnase.bw".to_string()),
        };
        let track = spec.resolve(Some(Path::new("/data/raw"))).unwrap();

        assert_eq!(track.key, "dnase");
        assert_eq!(track.path, PathBuf::from("/data/raw/dnase.bw"));
        assert_eq!(track.format, SourceFormat::BigWig);
        assert_eq!(track.url.as_deref(), Some("https://example.org/dnase.bw"));
    }

    #[rstest]
    fn test_track_spec_explicit_format_and_key() {
        let spec = TrackSpec {
            key: Some("muts".to_string()),
            path: PathBuf::from("/abs/calls.dat"),
            format: Some(SourceFormat::Mutations),
            url: None,
        };
        let track = spec.resolve(Some(Path::new("/ignored"))).unwrap();
        assert_eq!(track, Track::new("muts", "/abs/calls.dat", SourceFormat::Mutations));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../outside")]
    #[case("nested/key")]
    #[case("win\\key")]
    fn test_track_spec_rejects_unsafe_key(#[case] key: &str) {
        let spec = TrackSpec {
            key: Some(key.to_string()),
            path: PathBuf::from("dnase.bw"),
            format: None,
            url: None,
        };
        assert!(matches!(
            spec.resolve(Some(Path::new("/data/raw"))),
            Err(ConfigError::InvalidTrackKey(k)) if k == key
        ));
    }

    #[rstest]
    fn test_track_set_rejects_sample_with_separator() {
        let set = TrackSet {
            template: "{sample}.bw".to_string(),
            samples: vec!["a/b".to_string()],
            assays: vec![],
            format: None,
            url_template: None,
        };
        let specs = set.expand();
        assert!(matches!(
            specs[0].resolve(None),
            Err(ConfigError::InvalidTrackKey(_))
        ));
    }

    #[rstest]
    fn test_track_set_expand() {
        let set = TrackSet {
            template: "{assay}/{sample}-{assay}.bigwig".to_string(),
            samples: vec!["E003".to_string(), "E004".to_string()],
            assays: vec!["H3K4me1".to_string(), "DNase".to_string()],
            format: None,
            url_template: Some("https://host/{sample}-{assay}.bigwig".to_string()),
        };
        let specs = set.expand();
        let keys: Vec<&str> = specs.iter().map(|s| s.key.as_deref().unwrap()).collect();

        assert_eq!(
            keys,
            vec!["H3K4me1_E003", "H3K4me1_E004", "DNase_E003", "DNase_E004"]
        );
        assert_eq!(specs[2].path, PathBuf::from("DNase/E003-DNase.bigwig"));
        assert_eq!(
            specs[3].url.as_deref(),
            Some("https://host/E004-DNase.bigwig")
        );
    }

    #[rstest]
    fn test_track_set_without_assays() {
        let set = TrackSet {
            template: "{sample}.maf".to_string(),
            samples: vec!["BRCA".to_string()],
            assays: vec![],
            format: None,
            url_template: None,
        };
        let specs = set.expand();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].key.as_deref(), Some("BRCA"));
        assert_eq!(specs[0].path, PathBuf::from("BRCA.maf"));
    }
}

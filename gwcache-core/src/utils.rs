use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::ConfigError;
use crate::models::Chromosome;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> std::io::Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Read a `chrom.sizes` file (`name<whitespace>length` per line) into an
/// ordered list of chromosomes. Blank lines and `#` comments are skipped.
///
pub fn read_chrom_sizes<P: AsRef<Path>>(path: P) -> Result<Vec<Chromosome>, ConfigError> {
    let reader = get_dynamic_reader(path.as_ref())?;
    let mut chromosomes = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(name), Some(length)) = (fields.next(), fields.next()) else {
            return Err(ConfigError::ChromSizesParse {
                line: line_num + 1,
                message: "expected two columns: chrom and size".to_string(),
            });
        };
        let length = length.parse::<u64>().map_err(|_| ConfigError::ChromSizesParse {
            line: line_num + 1,
            message: format!("invalid chromosome size: {}", length),
        })?;

        chromosomes.push(Chromosome::new(name, length));
    }

    Ok(chromosomes)
}

/// Strip a leading `chr` so `chr1` and `1` compare equal.
pub fn bare_chrom_name(name: &str) -> &str {
    name.strip_prefix("chr").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    fn test_read_chrom_sizes_rejects_bad_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tabc").unwrap();

        let result = read_chrom_sizes(file.path());
        assert!(matches!(result, Err(ConfigError::ChromSizesParse { line: 1, .. })));
    }

    #[rstest]
    fn test_read_chrom_sizes_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sizes.txt.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        writeln!(encoder, "chr1 100").unwrap();
        writeln!(encoder, "chr2 50").unwrap();
        encoder.finish().unwrap();

        let chroms = read_chrom_sizes(&path).unwrap();
        assert_eq!(chroms, vec![Chromosome::new("chr1", 100), Chromosome::new("chr2", 50)]);
    }

    #[rstest]
    #[case("chr1", "1")]
    #[case("1", "1")]
    #[case("chrX", "X")]
    fn test_bare_chrom_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(bare_chrom_name(name), expected);
    }
}

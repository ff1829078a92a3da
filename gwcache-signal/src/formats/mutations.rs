use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use gwcache_core::errors::{CacheError, Result};
use gwcache_core::models::Chromosome;
use gwcache_core::utils::get_dynamic_reader;

use super::match_chromosome;
use crate::source::{Interval, SignalSource, overlapping};

///
/// A tab-delimited mutation table whose first two columns are the chromosome
/// and the 1-based position of each mutation. Every record adds a count of 1
/// at its base, so window statistics over this source are mutation densities.
///
/// Lines starting with `#` are skipped, as is a header row whose position
/// column is not a number.
///
/// Unlike signal files, a mutation table lists events rather than coverage:
/// a requested chromosome with no records is present and holds zero
/// mutations.
///
pub struct MutationSource {
    path: PathBuf,
    lengths: HashMap<String, u64>,
    counts: HashMap<String, Vec<Interval>>,
}

impl MutationSource {
    pub fn open<P: AsRef<Path>>(path: P, chromosomes: &[Chromosome]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader =
            get_dynamic_reader(&path).map_err(|e| CacheError::source_unavailable(&path, e))?;

        let mut positions: HashMap<String, Vec<u64>> = HashMap::new();
        let mut seen_record = false;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CacheError::source_unavailable(&path, e))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let (Some(chrom), Some(position)) = (fields.next(), fields.next()) else {
                return Err(CacheError::source_unavailable(
                    &path,
                    format!("line {}: expected chromosome and position columns", line_num + 1),
                ));
            };

            let position = match position.trim().parse::<u64>() {
                Ok(p) if p > 0 => p,
                // header row
                Err(_) if !seen_record => {
                    seen_record = true;
                    continue;
                }
                _ => {
                    return Err(CacheError::source_unavailable(
                        &path,
                        format!("line {}: invalid position '{}'", line_num + 1, position),
                    ));
                }
            };
            seen_record = true;

            if let Some(chromosome) = match_chromosome(chrom.trim(), chromosomes) {
                positions
                    .entry(chromosome.name.clone())
                    .or_default()
                    .push(position - 1);
            }
        }

        let counts = positions
            .into_iter()
            .map(|(chrom, list)| (chrom, count_positions(list)))
            .collect();
        let lengths = chromosomes
            .iter()
            .map(|c| (c.name.clone(), c.length))
            .collect();

        Ok(MutationSource {
            path,
            lengths,
            counts,
        })
    }
}

/// Collapse 0-based positions into one single-base interval per distinct
/// position, valued by the number of records at it.
fn count_positions(mut positions: Vec<u64>) -> Vec<Interval> {
    positions.sort_unstable();

    let mut counts: Vec<Interval> = Vec::new();
    for pos in positions {
        match counts.last_mut() {
            Some(last) if last.start == pos => last.value += 1.0,
            _ => counts.push(Interval::new(pos, pos + 1, 1.0)),
        }
    }
    counts
}

impl SignalSource for MutationSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        self.lengths.get(chrom).copied()
    }

    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<Interval>> {
        Ok(self
            .counts
            .get(chrom)
            .map(|list| overlapping(list, start, end))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[fixture]
    fn chromosomes() -> Vec<Chromosome> {
        vec![Chromosome::new("chr1", 1000), Chromosome::new("chrX", 300)]
    }

    #[rstest]
    fn test_mutations_counted_per_base(chromosomes: Vec<Chromosome>) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "## generated by a caller").unwrap();
        writeln!(file, "Chromosome\tStart_Position\tRef\tAlt").unwrap();
        writeln!(file, "1\t11\tA\tT").unwrap();
        writeln!(file, "chr1\t11\tA\tG").unwrap();
        writeln!(file, "chr1\t1\tC\tT").unwrap();
        writeln!(file, "X\t300\tG\tA").unwrap();
        writeln!(file, "7\t5\tG\tA").unwrap();
        file.flush().unwrap();

        let mut source = MutationSource::open(file.path(), &chromosomes).unwrap();

        assert_eq!(
            source.intervals("chr1", 0, 1000).unwrap(),
            vec![Interval::new(0, 1, 1.0), Interval::new(10, 11, 2.0)]
        );
        assert_eq!(
            source.intervals("chrX", 0, 300).unwrap(),
            vec![Interval::new(299, 300, 1.0)]
        );
        assert_eq!(source.chrom_length("chrX"), Some(300));
    }

    #[rstest]
    fn test_mutations_bad_position_after_header(chromosomes: Vec<Chromosome>) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t5").unwrap();
        writeln!(file, "chr1\tfive").unwrap();
        file.flush().unwrap();

        let err = MutationSource::open(file.path(), &chromosomes).err().unwrap();
        assert!(err.to_string().contains("line 2"));
    }

    #[rstest]
    fn test_mutations_chromosome_without_records_holds_zero(chromosomes: Vec<Chromosome>) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t5").unwrap();
        file.flush().unwrap();

        let mut source = MutationSource::open(file.path(), &chromosomes).unwrap();
        assert_eq!(source.chrom_length("chrX"), Some(300));
        assert!(source.intervals("chrX", 0, 300).unwrap().is_empty());
    }

    #[rstest]
    fn test_count_positions() {
        assert_eq!(
            count_positions(vec![5, 3, 5, 5]),
            vec![Interval::new(3, 4, 1.0), Interval::new(5, 6, 3.0)]
        );
    }
}

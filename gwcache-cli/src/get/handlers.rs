use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::ArgMatches;

use gwcache_dataset::{Sample, SignalDataset};

use crate::consts::CONFIG_ARG;

pub fn run_get(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>(CONFIG_ARG)
        .context("A path to a dataset configuration is required.")?;
    let index = *matches
        .get_one::<u64>("index")
        .context("A sample index is required.")?;

    let dataset = SignalDataset::from_path(config)
        .with_context(|| format!("failed to load dataset configuration {}", config))?;
    let sample = dataset.get(index)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if matches.get_flag("json") {
        serde_json::to_writer_pretty(&mut out, &sample)?;
        writeln!(out)?;
    } else {
        write_table(&mut out, &sample)?;
    }
    out.flush()?;

    Ok(())
}

/// One tab-separated line per row: the window followed by its values.
fn write_table<W: Write>(out: &mut W, sample: &Sample) -> io::Result<()> {
    write!(out, "chrom\tstart\tend\tresolution")?;
    for column in &sample.columns {
        write!(out, "\t{}", column)?;
    }
    writeln!(out)?;

    for (position, row) in sample.positions.iter().zip(sample.values.rows()) {
        write!(
            out,
            "{}\t{}\t{}\t{}",
            position.chrom, position.start, position.end, position.resolution
        )?;
        for value in row {
            write!(out, "\t{}", value)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use gwcache_dataset::Position;
    use ndarray::array;

    #[test]
    fn test_write_table() {
        let sample = Sample {
            index: 0,
            chrom: "chr1".to_string(),
            columns: vec!["A_mean".to_string(), "A_max".to_string()],
            positions: vec![
                Position {
                    chrom: "chr1".to_string(),
                    start: 0,
                    end: 100,
                    resolution: 100,
                },
                Position {
                    chrom: "chr1".to_string(),
                    start: 100,
                    end: 200,
                    resolution: 100,
                },
            ],
            values: array![[0.5, 1.0], [0.0, 0.0]],
        };

        let mut out = Vec::new();
        write_table(&mut out, &sample).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chrom\tstart\tend\tresolution\tA_mean\tA_max\n\
             chr1\t0\t100\t100\t0.5\t1\n\
             chr1\t100\t200\t100\t0\t0\n"
        );
    }
}

/// Result files
///
/// - `histogram.tsv`: the collapsed joint overlap histogram, one row per
///   (height score bin, plus 5' base, minus 5' base, local height), one
///   column per overlap
/// - `significance.tsv`: background mean, standard deviation, ping-pong
///   count and score per (height score bin, cell)
/// - optional bedGraph tracks of significant ping-pong loci (see [`bedgraph`])
/// - optional R plots of the histogram projections (see [`plot`])
pub mod bedgraph;
pub mod plot;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::histogram::{Cell, JointOverlapHistogram};
use crate::significance::SignificanceTable;

pub const HISTOGRAM_FILE: &str = "histogram.tsv";
pub const SIGNIFICANCE_FILE: &str = "significance.tsv";

/// Create the output directory (and its parents) if missing.
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf, Error> {
    fs::create_dir_all(path).map_err(|e| Error::io(e, path))?;
    Ok(path.to_path_buf())
}

/// Column name of an overlap; negative overlaps are spelled out.
pub(crate) fn overlap_column(overlap: i32) -> String {
    if overlap < 0 {
        format!("overlap_minus_{}", overlap.unsigned_abs())
    } else {
        format!("overlap_{overlap}")
    }
}

fn cell_columns(cell: Cell) -> String {
    format!(
        "{}\t{}\t{}",
        cell.plus.label(),
        cell.minus.label(),
        cell.local.label()
    )
}

pub fn write_histogram_table(path: &Path, histogram: &JointOverlapHistogram) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    let mut writer = BufWriter::new(file);

    let overlap_columns: Vec<String> = histogram.overlaps().map(overlap_column).collect();
    writeln!(
        writer,
        "bin\tplus_5prime\tminus_5prime\tlocal_height\t{}",
        overlap_columns.join("\t")
    )
    .map_err(|e| Error::io(e, path))?;

    for bin in 0..histogram.bins() {
        for cell in Cell::all() {
            let values: Vec<String> = histogram
                .overlaps()
                .map(|overlap| histogram.get(overlap, bin, cell).to_string())
                .collect();
            writeln!(writer, "{bin}\t{}\t{}", cell_columns(cell), values.join("\t"))
                .map_err(|e| Error::io(e, path))?;
        }
    }

    writer.flush().map_err(|e| Error::io(e, path))?;
    Ok(())
}

pub fn write_significance_table(path: &Path, table: &SignificanceTable) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "bin\tplus_5prime\tminus_5prime\tlocal_height\tmean\tstddev\tvalue\tscore"
    )
    .map_err(|e| Error::io(e, path))?;

    let mut scored = 0usize;
    for (bin, cell, entry) in table.iter() {
        let score = match entry.score {
            Some(score) => {
                scored += 1;
                format!("{score:.6}")
            }
            None => "NA".to_string(),
        };
        writeln!(
            writer,
            "{bin}\t{}\t{:.6}\t{:.6}\t{}\t{score}",
            cell_columns(cell),
            entry.mean,
            entry.stddev,
            entry.value
        )
        .map_err(|e| Error::io(e, path))?;
    }

    writer.flush().map_err(|e| Error::io(e, path))?;
    log::info!(
        "Wrote {} ({} of {} cells scored)",
        path.display(),
        scored,
        table.iter().count()
    );
    Ok(())
}

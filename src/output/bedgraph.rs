/// bedGraph export of significant ping-pong loci
///
/// A locus is a plus-strand stack at `p` with a minus-strand partner at the
/// ping-pong overlap. Each locus yields one interval per strand, at the 5'
/// base of the respective stack, with the significance score of the pair's
/// histogram cell as value.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::counts::{GenomeCounts, Strand};
use crate::error::Error;
use crate::histogram::window::{Neighbourhood, PairScorer};
use crate::histogram::{Cell, CollapsedHistogram, HeightFrequencyTable, ScoringParams};
use crate::significance::SignificanceTable;

pub const PLUS_FILE: &str = "ping_pong_plus.bedGraph";
pub const MINUS_FILE: &str = "ping_pong_minus.bedGraph";

/// A plus/minus stack pair at the ping-pong overlap with a reportable score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingPongLocus {
    pub contig: usize,
    /// 0-based 5' position of the plus-strand stack.
    pub plus_position: u64,
    /// Stack position of the minus-strand partner (one past its 5' base).
    pub minus_position: u64,
    pub score: f64,
}

/// Thresholds a pair must pass to be reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusFilter {
    pub min_stack_height: u32,
    pub min_score: f64,
}

/// Collect every ping-pong pair passing `filter`, ordered by contig and position.
pub fn find_loci(
    counts: &GenomeCounts,
    frequencies: &HeightFrequencyTable,
    collapsed: &CollapsedHistogram,
    significance: &SignificanceTable,
    params: &ScoringParams,
    filter: &LocusFilter,
) -> Vec<PingPongLocus> {
    let Some(scorer) = PairScorer::new(frequencies, params) else {
        return Vec::new();
    };
    let min_height = filter.min_stack_height as f64;

    let mut loci = Vec::new();
    for (contig, plus_stacks) in counts.contigs(Strand::Plus) {
        let Some(minus_stacks) = counts.contig(Strand::Minus, contig) else {
            continue;
        };

        for (&position, plus) in plus_stacks {
            if plus.reads < min_height {
                continue;
            }
            let neighbourhood = Neighbourhood::scan(minus_stacks, position, params);
            if neighbourhood.is_empty() {
                continue;
            }

            for obs in scorer.observations(plus, &neighbourhood) {
                if obs.overlap != params.ping_pong_overlap {
                    continue;
                }
                let partner_reads = minus_stacks
                    .get(&obs.minus_position)
                    .map_or(0.0, |stack| stack.reads);
                if partner_reads < min_height {
                    continue;
                }

                let cell = Cell::new(obs.plus_uridine, obs.minus_uridine, obs.local);
                let bin = collapsed.collapsed_bin(obs.height_bin);
                match significance.score(bin, cell) {
                    Some(score) if score >= filter.min_score => loci.push(PingPongLocus {
                        contig,
                        plus_position: position,
                        minus_position: obs.minus_position,
                        score,
                    }),
                    _ => {}
                }
            }
        }
    }
    loci
}

fn write_track(
    path: &Path,
    name: &str,
    loci: &[PingPongLocus],
    contig_names: &[String],
    interval: impl Fn(&PingPongLocus) -> (u64, u64),
) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "track type=bedGraph name=\"{name}\" description=\"ping-pong significance score\""
    )
    .map_err(|e| Error::io(e, path))?;

    for locus in loci {
        let contig = contig_names
            .get(locus.contig)
            .ok_or(Error::UnknownContig {
                index: locus.contig,
            })?;
        let (start, end) = interval(locus);
        writeln!(writer, "{contig}\t{start}\t{end}\t{:.4}", locus.score)
            .map_err(|e| Error::io(e, path))?;
    }

    writer.flush().map_err(|e| Error::io(e, path))?;
    Ok(())
}

/// Write one bedGraph file per strand into `dir`; returns their paths.
pub fn write_bedgraph(
    dir: &Path,
    loci: &[PingPongLocus],
    contig_names: &[String],
) -> Result<(PathBuf, PathBuf), Error> {
    let plus_path = dir.join(PLUS_FILE);
    write_track(&plus_path, "ping-pong plus", loci, contig_names, |locus| {
        (locus.plus_position, locus.plus_position + 1)
    })?;

    let minus_path = dir.join(MINUS_FILE);
    write_track(&minus_path, "ping-pong minus", loci, contig_names, |locus| {
        (locus.minus_position - 1, locus.minus_position)
    })?;

    log::info!("Wrote {} ping-pong loci to bedGraph", loci.len());
    Ok((plus_path, minus_path))
}

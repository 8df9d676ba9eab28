/// Parallel joint overlap histogram construction
use log::debug;
use rayon::prelude::*;

use crate::counts::{ContigStacks, GenomeCounts, StackPosition, Strand};

use super::frequency::HeightFrequencyTable;
use super::window::{Neighbourhood, PairScorer};
use super::{Cell, JointOverlapHistogram, ScoringParams, Uridine};

/// Bin every plus/minus stack pair of `counts` into a joint overlap histogram.
///
/// Plus-strand stacks are distributed over the current rayon thread pool.
/// Each worker folds into its own histogram; the partial histograms are
/// summed cell by cell at the end. An empty frequency table yields an
/// all-zero histogram.
pub fn build_histogram(
    counts: &GenomeCounts,
    frequencies: &HeightFrequencyTable,
    params: &ScoringParams,
) -> JointOverlapHistogram {
    let Some(scorer) = PairScorer::new(frequencies, params) else {
        return JointOverlapHistogram::for_params(params);
    };

    let plus_stacks: Vec<(&ContigStacks, u64, &StackPosition)> = counts
        .contigs(Strand::Plus)
        .filter_map(|(contig, plus)| {
            counts
                .contig(Strand::Minus, contig)
                .map(|minus| (minus, plus))
        })
        .flat_map(|(minus, plus)| plus.iter().map(move |(&pos, stack)| (minus, pos, stack)))
        .collect();

    debug!(
        "Binning {} plus-strand stacks against their minus-strand partners",
        plus_stacks.len()
    );

    plus_stacks
        .par_iter()
        .fold(
            || JointOverlapHistogram::for_params(params),
            |mut histogram, &(minus, position, plus)| {
                add_stack(&mut histogram, &scorer, minus, position, plus);
                histogram
            },
        )
        .reduce(
            || JointOverlapHistogram::for_params(params),
            |mut a, b| {
                a.merge(&b);
                a
            },
        )
}

/// Add all pairs of one plus-strand stack.
fn add_stack(
    histogram: &mut JointOverlapHistogram,
    scorer: &PairScorer,
    minus: &ContigStacks,
    position: u64,
    plus: &StackPosition,
) {
    let params = scorer.params();
    let neighbourhood = Neighbourhood::scan(minus, position, params);
    if neighbourhood.is_empty() {
        return;
    }

    let u = params.uridine_probability;
    let not_u = 1.0 - u;
    let background = [
        (Uridine::Uridine, Uridine::Uridine, u * u),
        (Uridine::NotUridine, Uridine::Uridine, not_u * u),
        (Uridine::Uridine, Uridine::NotUridine, u * not_u),
        (Uridine::NotUridine, Uridine::NotUridine, not_u * not_u),
    ];

    for obs in scorer.observations(plus, &neighbourhood) {
        if obs.overlap == params.ping_pong_overlap {
            let cell = Cell::new(obs.plus_uridine, obs.minus_uridine, obs.local);
            histogram.add(obs.overlap, obs.height_bin, cell, 1.0);
        } else {
            for (plus_base, minus_base, mass) in background {
                let cell = Cell::new(plus_base, minus_base, obs.local);
                histogram.add(obs.overlap, obs.height_bin, cell, mass);
            }
        }
    }
}

pub mod counts;
pub mod error;
pub mod histogram;
pub mod output;
pub mod params;
pub mod significance;
pub mod stats;
pub mod stopwatch;

use log::{info, warn};

use crate::counts::{ContigNames, GenomeCounts, ReadFilter, StackCounter};
use crate::error::Error;
use crate::histogram::{HeightFrequencyTable, build_histogram, collapse_bins};
use crate::output::bedgraph::{self, LocusFilter};
use crate::params::Parameters;
use crate::stats::CountingStats;
use crate::stopwatch::Stopwatch;

/// Top-level pipeline. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> anyhow::Result<()> {
    params.validate()?;

    info!("pingpong v{}", env!("CARGO_PKG_VERSION"));
    info!("threads: {}", params.threads);
    info!("multihits: {}", params.multi_hits);

    let scoring = params.scoring();
    let output_dir = output::prepare_output_dir(&params.output)?;

    let (counts, contig_names) = count_stacks(params)?;
    if counts.is_empty() {
        warn!("No read stacks found in the input; results will be empty");
    }

    let watch = Stopwatch::start("Binning stacks by overlap and height score");
    let frequencies = HeightFrequencyTable::build(&counts);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.threads)
        .build()
        .map_err(Error::from)?;
    let histogram = pool.install(|| build_histogram(&counts, &frequencies, &scoring));
    watch.finish();

    let watch = Stopwatch::start("Collapsing sparse height score bins");
    let original_bins = histogram.bins();
    let collapsed = collapse_bins(histogram, scoring.ping_pong_overlap);
    info!(
        "Collapsed {} height score bins into {}",
        original_bins,
        collapsed.histogram.bins()
    );
    watch.finish();

    let watch = Stopwatch::start("Estimating background noise");
    let significance = significance::estimate(&collapsed.histogram, scoring.ping_pong_overlap);
    watch.finish();

    let watch = Stopwatch::start("Writing results");
    output::write_histogram_table(&output_dir.join(output::HISTOGRAM_FILE), &collapsed.histogram)?;
    output::write_significance_table(
        &output_dir.join(output::SIGNIFICANCE_FILE),
        &significance,
    )?;

    if params.bedgraph {
        let filter = LocusFilter {
            min_stack_height: params.min_stack_height,
            min_score: params.min_score,
        };
        let loci = bedgraph::find_loci(
            &counts,
            &frequencies,
            &collapsed,
            &significance,
            &scoring,
            &filter,
        );
        bedgraph::write_bedgraph(&output_dir, &loci, &contig_names)?;
    }
    watch.finish();

    if params.plot {
        let watch = Stopwatch::start("Generating R plots");
        output::plot::plot_histograms(
            &output_dir,
            &collapsed.histogram,
            scoring.ping_pong_overlap,
        )?;
        watch.finish();
    }

    info!("Results written to {}", output_dir.display());
    Ok(())
}

/// Read all inputs into one set of stack counts.
fn count_stacks(params: &Parameters) -> Result<(GenomeCounts, ContigNames), Error> {
    let mut counter = StackCounter::new(ReadFilter::from_params(params));
    let mut total = CountingStats::new();

    for path in &params.input {
        let watch = Stopwatch::start(format!("Reading {}", path.display()));
        let stats = counter.count_file(path)?;
        stats.print_summary(&path.display().to_string());
        total.merge(&stats);
        watch.finish();
    }

    if params.input.len() > 1 {
        total.print_summary("all inputs");
    }
    let (counts, contig_names) = counter.finish();
    info!("{} read stacks on {} reference sequences", counts.len(), contig_names.len());
    Ok((counts, contig_names))
}

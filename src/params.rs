use std::path::PathBuf;

use clap::Parser;

use crate::error::Error;
use crate::histogram::ScoringParams;

// ---------------------------------------------------------------------------
// Multi-hit counting policy
// ---------------------------------------------------------------------------

/// How reads that map to several loci (`NH` > 1) contribute to stack heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiHits {
    /// Each alignment adds `1 / NH` to its stack.
    #[default]
    Weighted,
    /// Alignments of multi-mapping reads are ignored.
    Discard,
    /// Every alignment adds 1, regardless of `NH`.
    Unique,
}

impl std::str::FromStr for MultiHits {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted" => Ok(Self::Weighted),
            "discard" => Ok(Self::Discard),
            "unique" => Ok(Self::Unique),
            _ => Err(format!(
                "unknown multihits method '{s}'; expected 'weighted', 'discard' or 'unique'"
            )),
        }
    }
}

impl std::fmt::Display for MultiHits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weighted => write!(f, "weighted"),
            Self::Discard => write!(f, "discard"),
            Self::Unique => write!(f, "unique"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters struct
// ---------------------------------------------------------------------------

/// pingpong command-line parameters.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pingpong",
    about = "Find ping-pong signatures in small-RNA sequencing data",
    long_about = "Scans piRNA-Seq alignments for signs of ping-pong cycle activity. \
                  The ping-pong cycle produces piRNA molecules with complementary 5' ends, \
                  which appear as stacks of aligned reads whose 5' ends overlap with the \
                  5' ends of reads on the opposite strand by exactly 10 bases.",
    version
)]
pub struct Parameters {
    // ── Input ───────────────────────────────────────────────────────────
    /// Input file(s) in SAM/BAM format ("-" reads from stdin)
    #[arg(short = 'i', long = "input", num_args = 1.., default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Ignore reads shorter than this length
    #[arg(short = 'l', long = "min-read-length", default_value_t = 1)]
    pub min_read_length: usize,

    /// Ignore reads longer than this length
    #[arg(short = 'L', long = "max-read-length", default_value_t = 1000)]
    pub max_read_length: usize,

    /// How to count multi-mapping reads: weighted, discard or unique
    #[arg(short = 'm', long = "multihits", default_value = "weighted")]
    pub multi_hits: MultiHits,

    // ── Output ──────────────────────────────────────────────────────────
    /// Output directory (created if missing)
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output: PathBuf,

    /// Write loci with a ping-pong signature in bedGraph format
    #[arg(short = 'b', long = "bedgraph")]
    pub bedgraph: bool,

    /// Omit stacks with fewer reads than this from the bedGraph output
    #[arg(short = 's', long = "min-stack-height", default_value_t = 1)]
    pub min_stack_height: u32,

    /// Minimum significance score of a locus reported in the bedGraph output
    #[arg(long = "min-score", default_value_t = 2.0, allow_hyphen_values = true)]
    pub min_score: f64,

    /// Generate R plots of the background noise estimation (requires Rscript)
    #[arg(short = 'p', long = "plot")]
    pub plot: bool,

    // ── Scoring ─────────────────────────────────────────────────────────
    /// Local height score separating stacks above and below local coverage
    #[arg(long = "local-height-threshold", default_value_t = 0.2, allow_hyphen_values = true)]
    pub local_height_threshold: f64,

    /// Probability of uridine at the 5' end of reads without ping-pong signal
    #[arg(long = "uridine-probability", default_value_t = 0.25)]
    pub uridine_probability: f64,

    // ── Run ─────────────────────────────────────────────────────────────
    /// Number of threads used to bin stacks
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Print progress messages to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Parameters {
    /// Scoring constants for the histogram and significance stages.
    pub fn scoring(&self) -> ScoringParams {
        ScoringParams {
            local_height_threshold: self.local_height_threshold,
            uridine_probability: self.uridine_probability,
            ..ScoringParams::default()
        }
    }

    /// Validate parameter combinations that clap alone cannot enforce.
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_read_length == 0 {
            return Err(Error::Parameter("--min-read-length must be >= 1".into()));
        }

        if self.max_read_length == 0 {
            return Err(Error::Parameter("--max-read-length must be >= 1".into()));
        }

        if self.min_read_length > self.max_read_length {
            return Err(Error::Parameter(format!(
                "maximum read length ({}) must not be lower than minimum read length ({})",
                self.max_read_length, self.min_read_length
            )));
        }

        if self.min_stack_height == 0 {
            return Err(Error::Parameter("--min-stack-height must be >= 1".into()));
        }

        if !self.min_score.is_finite() {
            return Err(Error::Parameter("--min-score must be a finite number".into()));
        }

        if self.threads == 0 {
            return Err(Error::Parameter("--threads must be >= 1".into()));
        }

        self.scoring().validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: parse a command line (without program name).
    fn parse(args: &[&str]) -> Parameters {
        let mut full = vec!["pingpong"];
        full.extend_from_slice(args);
        Parameters::parse_from(full)
    }

    #[test]
    fn defaults() {
        let p = parse(&[]);
        assert_eq!(p.input, vec![PathBuf::from("-")]);
        assert_eq!(p.min_read_length, 1);
        assert_eq!(p.max_read_length, 1000);
        assert_eq!(p.multi_hits, MultiHits::Weighted);
        assert_eq!(p.output, PathBuf::from("."));
        assert!(!p.bedgraph);
        assert_eq!(p.min_stack_height, 1);
        assert!((p.min_score - 2.0).abs() < f64::EPSILON);
        assert!(!p.plot);
        assert!((p.local_height_threshold - 0.2).abs() < f64::EPSILON);
        assert!((p.uridine_probability - 0.25).abs() < f64::EPSILON);
        assert_eq!(p.threads, 1);
        assert!(!p.verbose);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn typical_command() {
        let p = parse(&[
            "-i",
            "a.bam",
            "b.sam",
            "-o",
            "/out/run1",
            "-l",
            "24",
            "-L",
            "32",
            "--multihits",
            "discard",
            "-s",
            "5",
            "--bedgraph",
            "--plot",
            "-t",
            "8",
            "-v",
        ]);
        assert_eq!(
            p.input,
            vec![PathBuf::from("a.bam"), PathBuf::from("b.sam")]
        );
        assert_eq!(p.output, PathBuf::from("/out/run1"));
        assert_eq!(p.min_read_length, 24);
        assert_eq!(p.max_read_length, 32);
        assert_eq!(p.multi_hits, MultiHits::Discard);
        assert_eq!(p.min_stack_height, 5);
        assert!(p.bedgraph);
        assert!(p.plot);
        assert_eq!(p.threads, 8);
        assert!(p.verbose);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn repeated_input_flag() {
        let p = parse(&["-i", "a.sam", "-i", "b.sam"]);
        assert_eq!(
            p.input,
            vec![PathBuf::from("a.sam"), PathBuf::from("b.sam")]
        );
    }

    #[test]
    fn multihits_parsing() {
        assert_eq!("weighted".parse::<MultiHits>(), Ok(MultiHits::Weighted));
        assert_eq!("discard".parse::<MultiHits>(), Ok(MultiHits::Discard));
        assert_eq!("unique".parse::<MultiHits>(), Ok(MultiHits::Unique));
        assert!("all".parse::<MultiHits>().is_err());
        assert_eq!(MultiHits::Discard.to_string(), "discard");
    }

    #[test]
    fn scoring_overrides() {
        let p = parse(&[
            "--local-height-threshold",
            "0.35",
            "--uridine-probability",
            "0.3",
        ]);
        let scoring = p.scoring();
        assert!((scoring.local_height_threshold - 0.35).abs() < f64::EPSILON);
        assert!((scoring.uridine_probability - 0.3).abs() < f64::EPSILON);
        assert_eq!(scoring.ping_pong_overlap, 10);
        assert_eq!(scoring.height_score_bins, 1000);
    }

    #[test]
    fn validate_read_length_order() {
        let p = parse(&["-l", "30", "-L", "20"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("must not be lower"));
    }

    #[test]
    fn validate_zero_threads() {
        let p = parse(&["-t", "0"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("--threads"));
    }

    #[test]
    fn validate_zero_stack_height() {
        let p = parse(&["-s", "0"]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_uridine_probability_range() {
        let p = parse(&["--uridine-probability", "1.5"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("uridine probability"));
    }
}

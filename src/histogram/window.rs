/// Partner scan and per-pair scoring
///
/// For a plus-strand stack at position `p`, every minus-strand stack at
/// `p + overlap` (overlap in the scoring window) is a partner. The partners'
/// heights define the local coverage the pair is compared against, and the
/// rarity of the two stack heights defines the height score bin.
use crate::counts::{ContigStacks, StackPosition};

use super::frequency::HeightFrequencyTable;
use super::{LocalCoverage, ScoringParams, Uridine};

/// A minus-strand stack inside the window of a plus-strand stack.
#[derive(Debug, Clone, Copy)]
pub struct Partner<'a> {
    pub overlap: i32,
    pub position: u64,
    pub stack: &'a StackPosition,
}

/// All partners of one plus-strand stack, with their height summary.
#[derive(Debug, Clone)]
pub struct Neighbourhood<'a> {
    partners: Vec<Partner<'a>>,
    mean_height: f64,
    max_height: f64,
    window_size: usize,
}

impl<'a> Neighbourhood<'a> {
    /// Collect the minus-strand partners of a plus-strand stack at `position`.
    pub fn scan(minus: &'a ContigStacks, position: u64, params: &ScoringParams) -> Self {
        let window_size = params.window_size();
        let start = position as i128 + params.min_overlap as i128;
        let end = position as i128 + params.max_overlap as i128;

        let partners: Vec<Partner<'a>> = if end < 0 {
            Vec::new()
        } else {
            let start = start.max(0) as u64;
            let end = end.min(u64::MAX as i128) as u64;
            minus
                .range(start..=end)
                .map(|(&partner_position, stack)| Partner {
                    overlap: (partner_position as i128 - position as i128) as i32,
                    position: partner_position,
                    stack,
                })
                .collect()
        };

        let sum: f64 = partners.iter().map(|p| p.stack.reads).sum();
        let max_height = partners
            .iter()
            .map(|p| p.stack.reads)
            .fold(0.0, f64::max);

        Self {
            partners,
            mean_height: sum / window_size.max(1) as f64,
            max_height,
            window_size,
        }
    }

    pub fn partners(&self) -> &[Partner<'a>] {
        &self.partners
    }

    /// No partner with a positive height.
    pub fn is_empty(&self) -> bool {
        self.max_height <= 0.0
    }

    /// Sum of partner heights divided by the window size.
    pub fn mean_height(&self) -> f64 {
        self.mean_height
    }

    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    /// Height of a partner relative to the other stacks of the window.
    pub fn local_height_score(&self, partner: &StackPosition) -> f64 {
        let adjusted_mean = self.mean_height - partner.reads / self.window_size as f64;
        (partner.reads - adjusted_mean) / self.max_height
    }
}

/// One plus/minus stack pair, classified into histogram coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairObservation {
    pub overlap: i32,
    pub minus_position: u64,
    pub height_bin: usize,
    pub local: LocalCoverage,
    pub plus_uridine: Uridine,
    pub minus_uridine: Uridine,
}

/// Maps stack pairs to height score bins and local coverage classes.
#[derive(Debug, Clone)]
pub struct PairScorer<'a> {
    frequencies: &'a HeightFrequencyTable,
    params: &'a ScoringParams,
    log_max_joint_frequency: f64,
}

impl<'a> PairScorer<'a> {
    /// Returns `None` for an empty frequency table (no stacks, nothing to score).
    pub fn new(frequencies: &'a HeightFrequencyTable, params: &'a ScoringParams) -> Option<Self> {
        let smallest = frequencies.smallest_height_frequency()? as f64;
        Some(Self {
            frequencies,
            params,
            log_max_joint_frequency: (smallest * smallest).log10(),
        })
    }

    pub fn params(&self) -> &ScoringParams {
        self.params
    }

    /// Height score bin of a pair: rare heights land in low bins, common ones in high bins.
    ///
    /// # Panics
    /// If either stack height is missing from the frequency table.
    pub fn height_score_bin(&self, plus: &StackPosition, minus: &StackPosition) -> usize {
        let joint_frequency = self.frequencies.frequency(plus.rounded_height()) as f64
            * self.frequencies.frequency(minus.rounded_height()) as f64;
        assert!(
            joint_frequency > 0.0,
            "stack heights {} and {} must be present in the frequency table",
            plus.reads,
            minus.reads
        );

        let last_bin = self.params.height_score_bins - 1;
        if self.log_max_joint_frequency <= 0.0 {
            return last_bin;
        }

        let bin = (joint_frequency.log10() / self.log_max_joint_frequency * last_bin as f64).round();
        bin.clamp(0.0, last_bin as f64) as usize
    }

    pub fn local_coverage(&self, neighbourhood: &Neighbourhood, partner: &StackPosition) -> LocalCoverage {
        if neighbourhood.local_height_score(partner) < self.params.local_height_threshold {
            LocalCoverage::Below
        } else {
            LocalCoverage::Above
        }
    }

    /// Classify every partner of a plus-strand stack.
    pub fn observations(
        &self,
        plus: &StackPosition,
        neighbourhood: &Neighbourhood,
    ) -> Vec<PairObservation> {
        let plus_uridine = Uridine::from_flag(plus.uridine_at_5prime());
        neighbourhood
            .partners()
            .iter()
            .map(|partner| PairObservation {
                overlap: partner.overlap,
                minus_position: partner.position,
                height_bin: self.height_score_bin(plus, partner.stack),
                local: self.local_coverage(neighbourhood, partner.stack),
                plus_uridine,
                minus_uridine: Uridine::from_flag(partner.stack.uridine_at_5prime()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::{GenomeCounts, Strand};

    fn minus_stacks(entries: &[(u64, f64)]) -> ContigStacks {
        entries
            .iter()
            .map(|&(pos, reads)| (pos, StackPosition::new(reads, false)))
            .collect()
    }

    #[test]
    fn test_scan_finds_partners_in_window() {
        let minus = minus_stacks(&[(99, 1.0), (100, 2.0), (110, 4.0), (120, 1.0), (121, 9.0)]);
        let params = ScoringParams::default();
        let hood = Neighbourhood::scan(&minus, 100, &params);

        let overlaps: Vec<i32> = hood.partners().iter().map(|p| p.overlap).collect();
        assert_eq!(overlaps, vec![0, 10, 20]);
        assert!((hood.mean_height() - 7.0 / 21.0).abs() < 1e-12);
        assert_eq!(hood.max_height(), 4.0);
        assert!(!hood.is_empty());
    }

    #[test]
    fn test_scan_without_partners() {
        let minus = minus_stacks(&[(5000, 3.0)]);
        let hood = Neighbourhood::scan(&minus, 100, &ScoringParams::default());
        assert!(hood.partners().is_empty());
        assert!(hood.is_empty());
    }

    #[test]
    fn test_scan_negative_window_near_contig_start() {
        let minus = minus_stacks(&[(0, 1.0), (3, 1.0)]);
        let params = ScoringParams {
            min_overlap: -5,
            max_overlap: 5,
            ping_pong_overlap: 0,
            ..ScoringParams::default()
        };
        let hood = Neighbourhood::scan(&minus, 2, &params);
        let overlaps: Vec<i32> = hood.partners().iter().map(|p| p.overlap).collect();
        assert_eq!(overlaps, vec![-2, 1]);
    }

    #[test]
    fn test_local_height_score() {
        let minus = minus_stacks(&[(105, 1.0), (110, 10.0)]);
        let params = ScoringParams::default();
        let hood = Neighbourhood::scan(&minus, 100, &params);

        // mean = 11/21, adjusted for the tall partner: 1/21
        let tall = StackPosition::new(10.0, false);
        let expected = (10.0 - 1.0 / 21.0) / 10.0;
        assert!((hood.local_height_score(&tall) - expected).abs() < 1e-12);

        let small = StackPosition::new(1.0, false);
        let expected = (1.0 - 10.0 / 21.0) / 10.0;
        assert!((hood.local_height_score(&small) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_local_coverage_threshold() {
        let minus = minus_stacks(&[(105, 1.0), (110, 10.0)]);
        let mut counts = GenomeCounts::new();
        counts.insert(Strand::Plus, 0, 100, StackPosition::new(1.0, false));
        let frequencies = HeightFrequencyTable::build(&counts);
        let params = ScoringParams::default();
        let scorer = PairScorer::new(&frequencies, &params).unwrap();
        let hood = Neighbourhood::scan(&minus, 100, &params);

        // (1 - 10/21) / 10 ~ 0.052 is below 0.2
        assert_eq!(
            scorer.local_coverage(&hood, &StackPosition::new(1.0, false)),
            LocalCoverage::Below
        );
        assert_eq!(
            scorer.local_coverage(&hood, &StackPosition::new(10.0, false)),
            LocalCoverage::Above
        );
    }

    #[test]
    fn test_height_score_bins() {
        let mut counts = GenomeCounts::new();
        // height 1 occurs 10 times, height 2 once
        for pos in 0..10 {
            counts.insert(Strand::Plus, 0, pos * 100, StackPosition::new(1.0, false));
        }
        counts.insert(Strand::Minus, 0, 5000, StackPosition::new(2.0, false));
        let frequencies = HeightFrequencyTable::build(&counts);
        let params = ScoringParams::default();
        let scorer = PairScorer::new(&frequencies, &params).unwrap();

        let one = StackPosition::new(1.0, false);
        let two = StackPosition::new(2.0, false);
        // log10(100) / log10(100)
        assert_eq!(scorer.height_score_bin(&one, &one), 999);
        // log10(10) / log10(100) = 0.5
        assert_eq!(scorer.height_score_bin(&one, &two), 500);
        // log10(1) = 0
        assert_eq!(scorer.height_score_bin(&two, &two), 0);
    }

    #[test]
    fn test_height_score_smallest_height_seen_once() {
        let mut counts = GenomeCounts::new();
        counts.insert(Strand::Plus, 0, 100, StackPosition::new(1.0, true));
        counts.insert(Strand::Minus, 0, 110, StackPosition::new(2.0, true));
        let frequencies = HeightFrequencyTable::build(&counts);
        let params = ScoringParams::default();
        let scorer = PairScorer::new(&frequencies, &params).unwrap();

        // log10(1 * 1) == 0: everything goes to the last bin
        let one = StackPosition::new(1.0, true);
        let two = StackPosition::new(2.0, true);
        assert_eq!(scorer.height_score_bin(&one, &two), 999);
    }

    #[test]
    #[should_panic(expected = "frequency table")]
    fn test_height_score_unknown_height() {
        let mut counts = GenomeCounts::new();
        counts.insert(Strand::Plus, 0, 100, StackPosition::new(1.0, false));
        let frequencies = HeightFrequencyTable::build(&counts);
        let params = ScoringParams::default();
        let scorer = PairScorer::new(&frequencies, &params).unwrap();
        scorer.height_score_bin(&StackPosition::new(1.0, false), &StackPosition::new(7.0, false));
    }

    #[test]
    fn test_empty_table_has_no_scorer() {
        let frequencies = HeightFrequencyTable::default();
        let params = ScoringParams::default();
        assert!(PairScorer::new(&frequencies, &params).is_none());
    }

    #[test]
    fn test_observations() {
        let mut counts = GenomeCounts::new();
        counts.insert(Strand::Plus, 0, 100, StackPosition::new(5.0, true));
        counts.insert(Strand::Minus, 0, 110, StackPosition::new(5.0, true));
        counts.insert(Strand::Minus, 0, 103, StackPosition::new(5.0, false));
        let frequencies = HeightFrequencyTable::build(&counts);
        let params = ScoringParams::default();
        let scorer = PairScorer::new(&frequencies, &params).unwrap();

        let minus = counts.contig(Strand::Minus, 0).unwrap();
        let plus = counts.get(Strand::Plus, 0, 100).unwrap();
        let hood = Neighbourhood::scan(minus, 100, &params);
        let obs = scorer.observations(plus, &hood);

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].overlap, 3);
        assert_eq!(obs[0].minus_uridine, Uridine::NotUridine);
        assert_eq!(obs[1].overlap, 10);
        assert_eq!(obs[1].minus_position, 110);
        assert_eq!(obs[1].plus_uridine, Uridine::Uridine);
        assert_eq!(obs[1].minus_uridine, Uridine::Uridine);
        assert_eq!(obs[1].local, LocalCoverage::Above);
    }
}

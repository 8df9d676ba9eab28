/// Joint overlap histograms of paired read stacks
///
/// This module handles:
/// - the stack height frequency table used as a rarity weight
/// - scanning minus-strand partners around every plus-strand stack
/// - accumulating pairs into a histogram over (overlap, height score bin,
///   plus 5' base, minus 5' base, local height score)
/// - collapsing sparse height score bins
/// - projecting the histogram onto a single dimension for plotting
pub mod build;
pub mod collapse;
pub mod frequency;
pub mod project;
pub mod window;

pub use build::build_histogram;
pub use collapse::{CollapsedHistogram, collapse_bins};
pub use frequency::HeightFrequencyTable;
pub use project::{Projection, project};
pub use window::{Neighbourhood, PairObservation, PairScorer};

use std::ops::RangeInclusive;

use crate::error::Error;

/// True ping-pong stacks overlap by this many nt.
pub const PING_PONG_OVERLAP: i32 = 10;

/// Overlaps in `[MIN_OVERLAP, MAX_OVERLAP]` other than `PING_PONG_OVERLAP`
/// estimate the background noise.
pub const MIN_OVERLAP: i32 = 0;
pub const MAX_OVERLAP: i32 = 20;

/// Number of height score bins before collapsing.
pub const HEIGHT_SCORE_BINS: usize = 1000;

/// Local height scores below this are considered below local coverage.
pub const LOCAL_HEIGHT_THRESHOLD: f64 = 0.2;

/// Probability of uridine at the 5' end of reads without ping-pong signal.
pub const URIDINE_PROBABILITY: f64 = 0.25;

/// Cells per (overlap, height score bin): 2 plus bases x 2 minus bases x 2 local bins.
pub const CELLS_PER_BIN: usize = 8;

/// 5' base category of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uridine {
    Uridine,
    NotUridine,
}

impl Uridine {
    pub const ALL: [Uridine; 2] = [Uridine::Uridine, Uridine::NotUridine];

    pub fn from_flag(is_uridine: bool) -> Self {
        if is_uridine {
            Self::Uridine
        } else {
            Self::NotUridine
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Uridine => 0,
            Self::NotUridine => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Uridine => "uridine",
            Self::NotUridine => "not uridine",
        }
    }
}

/// Whether a minus-strand partner is taller than the stacks around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalCoverage {
    Above,
    Below,
}

impl LocalCoverage {
    pub const ALL: [LocalCoverage; 2] = [LocalCoverage::Above, LocalCoverage::Below];

    pub fn index(self) -> usize {
        match self {
            Self::Above => 0,
            Self::Below => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Above => "above local coverage",
            Self::Below => "below local coverage",
        }
    }
}

/// One (plus 5' base, minus 5' base, local height) combination inside a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub plus: Uridine,
    pub minus: Uridine,
    pub local: LocalCoverage,
}

impl Cell {
    pub fn new(plus: Uridine, minus: Uridine, local: LocalCoverage) -> Self {
        Self { plus, minus, local }
    }

    /// All cells, in storage order.
    pub fn all() -> impl Iterator<Item = Cell> {
        Uridine::ALL.into_iter().flat_map(|plus| {
            Uridine::ALL.into_iter().flat_map(move |minus| {
                LocalCoverage::ALL
                    .into_iter()
                    .map(move |local| Cell::new(plus, minus, local))
            })
        })
    }

    pub fn index(self) -> usize {
        (self.plus.index() * 2 + self.minus.index()) * 2 + self.local.index()
    }
}

/// Tunable constants of the binning and significance stages.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub min_overlap: i32,
    pub max_overlap: i32,
    pub ping_pong_overlap: i32,
    pub height_score_bins: usize,
    pub local_height_threshold: f64,
    pub uridine_probability: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            min_overlap: MIN_OVERLAP,
            max_overlap: MAX_OVERLAP,
            ping_pong_overlap: PING_PONG_OVERLAP,
            height_score_bins: HEIGHT_SCORE_BINS,
            local_height_threshold: LOCAL_HEIGHT_THRESHOLD,
            uridine_probability: URIDINE_PROBABILITY,
        }
    }
}

impl ScoringParams {
    /// All tested overlaps.
    pub fn overlaps(&self) -> RangeInclusive<i32> {
        self.min_overlap..=self.max_overlap
    }

    /// Number of tested overlaps, i.e. the size of the partner window.
    pub fn window_size(&self) -> usize {
        (self.max_overlap - self.min_overlap + 1).max(0) as usize
    }

    pub fn is_background(&self, overlap: i32) -> bool {
        overlap != self.ping_pong_overlap
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_overlap > self.max_overlap {
            return Err(Error::Parameter(format!(
                "minimum overlap ({}) must not exceed maximum overlap ({})",
                self.min_overlap, self.max_overlap
            )));
        }

        if !self.overlaps().contains(&self.ping_pong_overlap) {
            return Err(Error::Parameter(format!(
                "ping-pong overlap ({}) must lie within [{}, {}]",
                self.ping_pong_overlap, self.min_overlap, self.max_overlap
            )));
        }

        if self.window_size() < 2 {
            return Err(Error::Parameter(
                "at least one background overlap is required".into(),
            ));
        }

        if self.height_score_bins == 0 {
            return Err(Error::Parameter("height score bins must be >= 1".into()));
        }

        if !self.local_height_threshold.is_finite() {
            return Err(Error::Parameter(
                "local height threshold must be a finite number".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.uridine_probability) {
            return Err(Error::Parameter(format!(
                "uridine probability ({}) must lie within [0, 1]",
                self.uridine_probability
            )));
        }

        Ok(())
    }
}

/// Dense histogram indexed by `[overlap][height score bin][plus base][minus base][local height]`.
///
/// Stored as one flat vector; the three binary dimensions form a block of
/// `CELLS_PER_BIN` values per (overlap, bin).
#[derive(Debug, Clone, PartialEq)]
pub struct JointOverlapHistogram {
    min_overlap: i32,
    n_overlaps: usize,
    bins: usize,
    values: Vec<f64>,
}

impl JointOverlapHistogram {
    /// All-zero histogram over `overlaps` with `bins` height score bins.
    pub fn new(overlaps: RangeInclusive<i32>, bins: usize) -> Self {
        let n_overlaps = (overlaps.end() - overlaps.start() + 1).max(0) as usize;
        Self {
            min_overlap: *overlaps.start(),
            n_overlaps,
            bins,
            values: vec![0.0; n_overlaps * bins * CELLS_PER_BIN],
        }
    }

    /// All-zero histogram shaped by the scoring parameters.
    pub fn for_params(params: &ScoringParams) -> Self {
        Self::new(params.overlaps(), params.height_score_bins)
    }

    pub fn overlaps(&self) -> RangeInclusive<i32> {
        self.min_overlap..=self.min_overlap + self.n_overlaps as i32 - 1
    }

    pub fn n_overlaps(&self) -> usize {
        self.n_overlaps
    }

    /// Number of height score bins.
    pub fn bins(&self) -> usize {
        self.bins
    }

    fn block_offset(&self, overlap: i32, bin: usize) -> usize {
        let overlap_index = overlap - self.min_overlap;
        assert!(
            overlap_index >= 0 && (overlap_index as usize) < self.n_overlaps,
            "overlap {overlap} outside histogram range {:?}",
            self.overlaps()
        );
        assert!(bin < self.bins, "bin {bin} outside histogram with {} bins", self.bins);
        (overlap_index as usize * self.bins + bin) * CELLS_PER_BIN
    }

    pub fn get(&self, overlap: i32, bin: usize, cell: Cell) -> f64 {
        self.values[self.block_offset(overlap, bin) + cell.index()]
    }

    pub fn add(&mut self, overlap: i32, bin: usize, cell: Cell, value: f64) {
        let offset = self.block_offset(overlap, bin);
        self.values[offset + cell.index()] += value;
    }

    /// The `CELLS_PER_BIN` values of one (overlap, bin), indexed by `Cell::index`.
    pub fn bin_cells(&self, overlap: i32, bin: usize) -> &[f64] {
        let offset = self.block_offset(overlap, bin);
        &self.values[offset..offset + CELLS_PER_BIN]
    }

    /// Add all cells of `other` to this histogram.
    pub fn merge(&mut self, other: &JointOverlapHistogram) {
        assert_eq!(
            (self.min_overlap, self.n_overlaps, self.bins),
            (other.min_overlap, other.n_overlaps, other.bins),
            "cannot merge histograms of different shape"
        );
        for (value, other) in self.values.iter_mut().zip(&other.values) {
            *value += other;
        }
    }

    /// Sum over all bins and cells of one overlap.
    pub fn overlap_total(&self, overlap: i32) -> f64 {
        (0..self.bins)
            .flat_map(|bin| self.bin_cells(overlap, bin))
            .sum()
    }

    /// Sum of one cell over all bins of one overlap.
    pub fn cell_total(&self, overlap: i32, cell: Cell) -> f64 {
        (0..self.bins).map(|bin| self.get(overlap, bin, cell)).sum()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_order_matches_index() {
        let indices: Vec<usize> = Cell::all().map(Cell::index).collect();
        assert_eq!(indices, (0..CELLS_PER_BIN).collect::<Vec<_>>());

        let first = Cell::all().next().unwrap();
        assert_eq!(
            first,
            Cell::new(Uridine::Uridine, Uridine::Uridine, LocalCoverage::Above)
        );
    }

    #[test]
    fn test_histogram_add_and_get() {
        let mut h = JointOverlapHistogram::new(0..=20, 10);
        let cell = Cell::new(Uridine::NotUridine, Uridine::Uridine, LocalCoverage::Below);
        h.add(10, 3, cell, 1.0);
        h.add(10, 3, cell, 0.5);

        assert_eq!(h.get(10, 3, cell), 1.5);
        assert_eq!(h.get(9, 3, cell), 0.0);
        assert_eq!(h.overlap_total(10), 1.5);
        assert_eq!(h.cell_total(10, cell), 1.5);
        assert_eq!(h.total(), 1.5);
        assert_eq!(h.bin_cells(10, 3)[cell.index()], 1.5);
    }

    #[test]
    fn test_histogram_negative_overlaps() {
        let mut h = JointOverlapHistogram::new(-5..=5, 2);
        let cell = Cell::new(Uridine::Uridine, Uridine::Uridine, LocalCoverage::Above);
        h.add(-5, 1, cell, 2.0);
        assert_eq!(h.overlaps(), -5..=5);
        assert_eq!(h.n_overlaps(), 11);
        assert_eq!(h.get(-5, 1, cell), 2.0);
    }

    #[test]
    #[should_panic(expected = "outside histogram range")]
    fn test_histogram_overlap_out_of_range() {
        let h = JointOverlapHistogram::new(0..=20, 10);
        let cell = Cell::new(Uridine::Uridine, Uridine::Uridine, LocalCoverage::Above);
        h.get(21, 0, cell);
    }

    #[test]
    fn test_merge() {
        let cell = Cell::new(Uridine::Uridine, Uridine::NotUridine, LocalCoverage::Above);
        let mut a = JointOverlapHistogram::new(0..=2, 4);
        let mut b = JointOverlapHistogram::new(0..=2, 4);
        a.add(1, 2, cell, 1.0);
        b.add(1, 2, cell, 2.0);
        b.add(0, 0, cell, 0.25);
        a.merge(&b);

        assert_eq!(a.get(1, 2, cell), 3.0);
        assert_eq!(a.get(0, 0, cell), 0.25);
    }

    #[test]
    fn test_default_scoring_params() {
        let params = ScoringParams::default();
        assert_eq!(params.window_size(), 21);
        assert!(params.is_background(9));
        assert!(!params.is_background(10));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_scoring_params_validation() {
        let outside = ScoringParams {
            ping_pong_overlap: 25,
            ..ScoringParams::default()
        };
        assert!(outside.validate().is_err());

        let no_background = ScoringParams {
            min_overlap: 10,
            max_overlap: 10,
            ..ScoringParams::default()
        };
        assert!(no_background.validate().is_err());

        let no_bins = ScoringParams {
            height_score_bins: 0,
            ..ScoringParams::default()
        };
        assert!(no_bins.validate().is_err());

        let bad_threshold = ScoringParams {
            local_height_threshold: f64::NAN,
            ..ScoringParams::default()
        };
        assert!(bad_threshold.validate().is_err());
    }
}

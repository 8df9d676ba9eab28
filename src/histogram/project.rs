/// One-dimensional projections of a joint overlap histogram
use super::{Cell, JointOverlapHistogram, LocalCoverage, Uridine};

/// A histogram dimension to sum onto, per overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    HeightScore,
    PlusUridine,
    MinusUridine,
    LocalHeight,
}

impl Projection {
    pub const ALL: [Projection; 4] = [
        Projection::HeightScore,
        Projection::PlusUridine,
        Projection::MinusUridine,
        Projection::LocalHeight,
    ];

    /// Axis title.
    pub fn title(self) -> &'static str {
        match self {
            Self::HeightScore => "height score",
            Self::PlusUridine => "base content at 5-prime end on forward strand",
            Self::MinusUridine => "base content at 5-prime end on reverse strand",
            Self::LocalHeight => "local height score",
        }
    }

    /// File name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::HeightScore => "height_score",
            Self::PlusUridine => "plus_strand_5prime_base",
            Self::MinusUridine => "minus_strand_5prime_base",
            Self::LocalHeight => "local_height_score",
        }
    }

    /// Bar labels; `None` for the height score, which is labelled by quantiles.
    pub fn labels(self) -> Option<[&'static str; 2]> {
        match self {
            Self::HeightScore => None,
            Self::PlusUridine | Self::MinusUridine => {
                Some([Uridine::Uridine.label(), Uridine::NotUridine.label()])
            }
            Self::LocalHeight => Some([LocalCoverage::Above.label(), LocalCoverage::Below.label()]),
        }
    }

    pub fn log_scale(self) -> bool {
        matches!(self, Self::HeightScore)
    }

    fn bars(self, histogram: &JointOverlapHistogram) -> usize {
        match self {
            Self::HeightScore => histogram.bins(),
            _ => 2,
        }
    }

    fn bar(self, bin: usize, cell: Cell) -> usize {
        match self {
            Self::HeightScore => bin,
            Self::PlusUridine => cell.plus.index(),
            Self::MinusUridine => cell.minus.index(),
            Self::LocalHeight => cell.local.index(),
        }
    }
}

/// Sum `histogram` over every dimension but `projection`.
///
/// Returns one row per overlap (in ascending order), one value per bar.
pub fn project(histogram: &JointOverlapHistogram, projection: Projection) -> Vec<Vec<f64>> {
    histogram
        .overlaps()
        .map(|overlap| {
            let mut bars = vec![0.0; projection.bars(histogram)];
            for bin in 0..histogram.bins() {
                for cell in Cell::all() {
                    bars[projection.bar(bin, cell)] += histogram.get(overlap, bin, cell);
                }
            }
            bars
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JointOverlapHistogram {
        let mut h = JointOverlapHistogram::new(0..=2, 3);
        h.add(1, 0, Cell::new(Uridine::Uridine, Uridine::Uridine, LocalCoverage::Above), 2.0);
        h.add(1, 2, Cell::new(Uridine::NotUridine, Uridine::Uridine, LocalCoverage::Below), 1.0);
        h.add(0, 1, Cell::new(Uridine::Uridine, Uridine::NotUridine, LocalCoverage::Below), 0.5);
        h
    }

    #[test]
    fn test_project_height_score() {
        let rows = project(&sample(), Projection::HeightScore);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![0.0, 0.5, 0.0]);
        assert_eq!(rows[1], vec![2.0, 0.0, 1.0]);
        assert_eq!(rows[2], vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_project_binary_dimensions() {
        let h = sample();
        assert_eq!(project(&h, Projection::PlusUridine)[1], vec![2.0, 1.0]);
        assert_eq!(project(&h, Projection::MinusUridine)[1], vec![3.0, 0.0]);
        assert_eq!(project(&h, Projection::MinusUridine)[0], vec![0.0, 0.5]);
        assert_eq!(project(&h, Projection::LocalHeight)[1], vec![2.0, 1.0]);
    }

    #[test]
    fn test_projections_preserve_totals() {
        let h = sample();
        for projection in Projection::ALL {
            let rows = project(&h, projection);
            for (row, overlap) in rows.iter().zip(h.overlaps()) {
                let sum: f64 = row.iter().sum();
                assert!((sum - h.overlap_total(overlap)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_labels() {
        assert!(Projection::HeightScore.labels().is_none());
        assert!(Projection::HeightScore.log_scale());
        assert_eq!(
            Projection::LocalHeight.labels(),
            Some(["above local coverage", "below local coverage"])
        );
        assert_eq!(
            Projection::PlusUridine.labels(),
            Some(["uridine", "not uridine"])
        );
    }
}

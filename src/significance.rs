/// Background noise estimation and ping-pong significance scores
///
/// For every collapsed height score bin and every (plus base, minus base,
/// local height) cell, the counts at the background overlaps give a mean and
/// standard deviation. The count at the ping-pong overlap is scored against
/// them with a z-score damped towards zero when the count is small compared
/// to the background:
///
/// ```text
/// score = (value - mean) / stddev * value / (value + mean)
/// ```
use crate::histogram::{CELLS_PER_BIN, Cell, JointOverlapHistogram};

/// Background statistics and score of one (bin, cell).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSignificance {
    pub mean: f64,
    pub stddev: f64,
    /// Count at the ping-pong overlap.
    pub value: f64,
    /// `None` when the score is undefined.
    pub score: Option<f64>,
}

/// Significance of every (collapsed bin, cell) of a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceTable {
    bins: usize,
    cells: Vec<CellSignificance>,
}

impl SignificanceTable {
    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn get(&self, bin: usize, cell: Cell) -> &CellSignificance {
        &self.cells[bin * CELLS_PER_BIN + cell.index()]
    }

    pub fn score(&self, bin: usize, cell: Cell) -> Option<f64> {
        self.get(bin, cell).score
    }

    /// All entries in (bin, cell) order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Cell, &CellSignificance)> + '_ {
        (0..self.bins).flat_map(move |bin| Cell::all().map(move |cell| (bin, cell, self.get(bin, cell))))
    }
}

/// Damped z-score of `value` against a background with `mean` and `stddev`.
pub fn score(value: f64, mean: f64, stddev: f64) -> Option<f64> {
    if stddev == 0.0 || value + mean == 0.0 {
        return None;
    }
    let score = (value - mean) / stddev * value / (value + mean);
    score.is_finite().then_some(score)
}

/// Sample mean and standard deviation (denominator `n - 1`).
fn mean_and_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Score the ping-pong overlap of every bin and cell of a collapsed histogram.
pub fn estimate(histogram: &JointOverlapHistogram, ping_pong_overlap: i32) -> SignificanceTable {
    let background: Vec<i32> = histogram
        .overlaps()
        .filter(|&overlap| overlap != ping_pong_overlap)
        .collect();
    let has_ping_pong = histogram.overlaps().contains(&ping_pong_overlap);

    let mut cells = Vec::with_capacity(histogram.bins() * CELLS_PER_BIN);
    let mut counts = Vec::with_capacity(background.len());
    for bin in 0..histogram.bins() {
        for cell in Cell::all() {
            counts.clear();
            counts.extend(background.iter().map(|&overlap| histogram.get(overlap, bin, cell)));

            let value = if has_ping_pong {
                histogram.get(ping_pong_overlap, bin, cell)
            } else {
                0.0
            };

            let entry = match mean_and_stddev(&counts) {
                Some((mean, stddev)) => CellSignificance {
                    mean,
                    stddev,
                    value,
                    score: score(value, mean, stddev),
                },
                None => CellSignificance {
                    mean: counts.first().copied().unwrap_or(0.0),
                    stddev: 0.0,
                    value,
                    score: None,
                },
            };
            cells.push(entry);
        }
    }

    SignificanceTable {
        bins: histogram.bins(),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{LocalCoverage, Uridine};

    fn uu_above() -> Cell {
        Cell::new(Uridine::Uridine, Uridine::Uridine, LocalCoverage::Above)
    }

    #[test]
    fn test_score_formula() {
        // (9 - 3) / 2 * 9 / 12
        let s = score(9.0, 3.0, 2.0).unwrap();
        assert!((s - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_score_undefined() {
        assert_eq!(score(5.0, 5.0, 0.0), None);
        assert_eq!(score(0.0, 0.0, 1.0), None);
    }

    #[test]
    fn test_mean_and_stddev() {
        let (mean, stddev) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((stddev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(mean_and_stddev(&[1.0]).is_none());
    }

    #[test]
    fn test_ping_pong_above_background() {
        let mut h = JointOverlapHistogram::new(0..=20, 1);
        for overlap in 0..=20 {
            let count = if overlap == 10 { 20.0 } else { 1.0 + (overlap % 3) as f64 };
            h.add(overlap, 0, uu_above(), count);
        }
        let table = estimate(&h, 10);
        let entry = table.get(0, uu_above());

        assert_eq!(table.bins(), 1);
        assert_eq!(entry.value, 20.0);
        assert!(entry.mean > 1.0 && entry.mean < 3.0);
        assert!(entry.stddev > 0.0);
        assert!(entry.score.unwrap() > 0.0);
    }

    #[test]
    fn test_flat_background_is_undefined() {
        let mut h = JointOverlapHistogram::new(0..=20, 1);
        for overlap in 0..=20 {
            h.add(overlap, 0, uu_above(), 2.0);
        }
        let table = estimate(&h, 10);
        assert_eq!(table.get(0, uu_above()).stddev, 0.0);
        assert_eq!(table.score(0, uu_above()), None);
    }

    #[test]
    fn test_empty_histogram_is_undefined() {
        let h = JointOverlapHistogram::new(0..=20, 1);
        let table = estimate(&h, 10);
        assert!(table.iter().all(|(_, _, entry)| entry.score.is_none()));
        assert_eq!(table.iter().count(), CELLS_PER_BIN);
    }

    #[test]
    fn test_single_background_overlap_is_undefined() {
        let mut h = JointOverlapHistogram::new(9..=10, 1);
        h.add(9, 0, uu_above(), 1.0);
        h.add(10, 0, uu_above(), 5.0);
        let table = estimate(&h, 10);
        assert_eq!(table.score(0, uu_above()), None);
    }
}

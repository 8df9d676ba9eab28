/// Height score bin collapsing
///
/// Rare stack heights leave many height score bins sparsely populated. Before
/// estimating the background, adjacent bins are merged until every background
/// overlap has a positive count in every cell of the merged bin.
use super::{CELLS_PER_BIN, Cell, JointOverlapHistogram};

/// A collapsed histogram and where each original bin ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedHistogram {
    pub histogram: JointOverlapHistogram,
    /// `bin_map[original_bin]` is the collapsed bin that absorbed it.
    pub bin_map: Vec<usize>,
}

impl CollapsedHistogram {
    /// Collapsed bin of an original height score bin.
    pub fn collapsed_bin(&self, original_bin: usize) -> usize {
        self.bin_map[original_bin]
    }
}

/// Merge consecutive height score bins of `histogram`.
///
/// Original bins are consumed from 0 upward into the current output bin.
/// The output bin is closed as soon as all cells of all background overlaps
/// are strictly positive; the last output bin takes whatever remains. The
/// ping-pong overlap follows the same bin boundaries.
pub fn collapse_bins(histogram: JointOverlapHistogram, ping_pong_overlap: i32) -> CollapsedHistogram {
    let background: Vec<i32> = histogram
        .overlaps()
        .filter(|&overlap| overlap != ping_pong_overlap)
        .collect();

    let mut bin_map = Vec::with_capacity(histogram.bins());
    let mut current = 0;
    let mut open = false;
    let mut sums = vec![0.0; background.len() * CELLS_PER_BIN];

    for bin in 0..histogram.bins() {
        if !open {
            sums.fill(0.0);
            open = true;
        }
        for (i, &overlap) in background.iter().enumerate() {
            let block = &mut sums[i * CELLS_PER_BIN..(i + 1) * CELLS_PER_BIN];
            for (sum, value) in block.iter_mut().zip(histogram.bin_cells(overlap, bin)) {
                *sum += value;
            }
        }
        bin_map.push(current);

        if sums.iter().all(|&sum| sum > 0.0) {
            current += 1;
            open = false;
        }
    }

    let collapsed_bins = if open { current + 1 } else { current };
    let mut collapsed = JointOverlapHistogram::new(histogram.overlaps(), collapsed_bins);
    for overlap in histogram.overlaps() {
        for (bin, &target) in bin_map.iter().enumerate() {
            for (cell, &value) in Cell::all().zip(histogram.bin_cells(overlap, bin)) {
                if value != 0.0 {
                    collapsed.add(overlap, target, cell, value);
                }
            }
        }
    }

    CollapsedHistogram {
        histogram: collapsed,
        bin_map,
    }
}

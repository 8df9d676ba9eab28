/// Stack height frequency table
use std::collections::BTreeMap;

use crate::counts::GenomeCounts;

/// How many stacks (over both strands and all contigs) have each rounded height.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeightFrequencyTable {
    counts: BTreeMap<u64, u64>,
}

impl HeightFrequencyTable {
    /// Count every stack of `counts` under its rounded height.
    pub fn build(counts: &GenomeCounts) -> Self {
        let mut table = Self::default();
        for stack in counts.stacks() {
            *table.counts.entry(stack.rounded_height()).or_insert(0) += 1;
        }
        table
    }

    /// Number of stacks with the given rounded height (0 if none).
    pub fn frequency(&self, height: u64) -> u64 {
        self.counts.get(&height).copied().unwrap_or(0)
    }

    /// Frequency of the smallest observed height, normally the most common one.
    pub fn smallest_height_frequency(&self) -> Option<u64> {
        self.counts.values().next().copied()
    }

    /// (height, frequency) pairs in ascending height order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(&h, &f)| (h, f))
    }

    /// Number of distinct heights.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of stacks counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Read counting statistics tracking and reporting
use log::info;

/// Tracks what happened to the alignment records of one or more input files
#[derive(Default, Debug, Clone, PartialEq)]
pub struct CountingStats {
    /// Total number of alignment records read
    pub total_records: u64,
    /// Records that were added to a stack
    pub counted: u64,
    /// Records without a mapping position
    pub unmapped: u64,
    /// Records whose read length is outside the allowed range
    pub length_filtered: u64,
    /// Multi-mapping records dropped by the `discard` policy
    pub multi_hit_discarded: u64,
    /// Sum of the weights added to stacks
    pub total_weight: f64,
}

impl CountingStats {
    /// Create new statistics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the statistics of another input
    pub fn merge(&mut self, other: &CountingStats) {
        self.total_records += other.total_records;
        self.counted += other.counted;
        self.unmapped += other.unmapped;
        self.length_filtered += other.length_filtered;
        self.multi_hit_discarded += other.multi_hit_discarded;
        self.total_weight += other.total_weight;
    }

    /// Number of records that were not counted for any reason
    pub fn skipped(&self) -> u64 {
        self.unmapped + self.length_filtered + self.multi_hit_discarded
    }

    /// Get percentage of counted records
    pub fn counted_percent(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            100.0 * self.counted as f64 / self.total_records as f64
        }
    }

    /// Print summary statistics to log
    pub fn print_summary(&self, source: &str) {
        if self.total_records == 0 {
            info!("{source}: no alignment records");
            return;
        }

        info!(
            "{source}: {} records, {} counted ({:.2}%), stack height added: {:.2}",
            self.total_records,
            self.counted,
            self.counted_percent(),
            self.total_weight
        );
        if self.skipped() > 0 {
            info!(
                "{source}: skipped {} unmapped, {} outside read length range, {} multi-mapping",
                self.unmapped, self.length_filtered, self.multi_hit_discarded
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = CountingStats::default();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.counted, 0);
        assert_eq!(stats.skipped(), 0);
        assert_eq!(stats.counted_percent(), 0.0);
    }

    #[test]
    fn test_merge() {
        let mut a = CountingStats {
            total_records: 4,
            counted: 2,
            unmapped: 1,
            length_filtered: 1,
            multi_hit_discarded: 0,
            total_weight: 1.5,
        };
        let b = CountingStats {
            total_records: 2,
            counted: 1,
            unmapped: 0,
            length_filtered: 0,
            multi_hit_discarded: 1,
            total_weight: 1.0,
        };
        a.merge(&b);
        assert_eq!(a.total_records, 6);
        assert_eq!(a.counted, 3);
        assert_eq!(a.skipped(), 3);
        assert!((a.total_weight - 2.5).abs() < 1e-12);
        assert!((a.counted_percent() - 50.0).abs() < 0.01);
    }
}

/// Genome-wide read stack counts
///
/// For every position on the genome where at least one read starts, we keep
/// the (possibly fractional) number of reads in the stack and how many of
/// them carry a uridine at their 5' end. Stacks are grouped by strand and
/// contig; within a contig they are ordered by position so that the
/// partner lookups of the histogram builder stay cheap.
pub mod reader;

pub use reader::{ContigNames, ReadFilter, StackCounter};

use std::collections::BTreeMap;

/// Strand of a read stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    fn index(self) -> usize {
        match self {
            Self::Plus => 0,
            Self::Minus => 1,
        }
    }
}

/// A stack of reads sharing strand and 5' position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StackPosition {
    /// Accumulated stack height.
    pub reads: f64,
    /// Part of `reads` contributed by reads with uridine at the 5' end.
    pub uridine_reads: f64,
}

impl StackPosition {
    /// Stack with the given height whose reads all share the same 5' base class.
    pub fn new(reads: f64, uridine_at_5prime: bool) -> Self {
        Self {
            reads,
            uridine_reads: if uridine_at_5prime { reads } else { 0.0 },
        }
    }

    /// Add one read (or a fraction of one) to the stack.
    pub fn add_read(&mut self, weight: f64, uridine: bool) {
        self.reads += weight;
        if uridine {
            self.uridine_reads += weight;
        }
    }

    /// Whether the stack predominantly consists of reads with uridine at the 5' end.
    pub fn uridine_at_5prime(&self) -> bool {
        self.reads > 0.0 && 2.0 * self.uridine_reads >= self.reads
    }

    /// Stack height rounded to the nearest integer.
    pub fn rounded_height(&self) -> u64 {
        (self.reads + 0.5).floor() as u64
    }
}

/// Stacks of one contig on one strand, keyed by 0-based position.
pub type ContigStacks = BTreeMap<u64, StackPosition>;

/// Per-strand, per-contig stack counts for a whole genome.
#[derive(Debug, Clone, Default)]
pub struct GenomeCounts {
    strands: [BTreeMap<usize, ContigStacks>; 2],
}

impl GenomeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read to the stack at `position`, creating the stack if needed.
    pub fn add_read(
        &mut self,
        strand: Strand,
        contig: usize,
        position: u64,
        weight: f64,
        uridine: bool,
    ) {
        self.strands[strand.index()]
            .entry(contig)
            .or_default()
            .entry(position)
            .or_default()
            .add_read(weight, uridine);
    }

    /// Insert a complete stack, replacing any existing one.
    pub fn insert(&mut self, strand: Strand, contig: usize, position: u64, stack: StackPosition) {
        self.strands[strand.index()]
            .entry(contig)
            .or_default()
            .insert(position, stack);
    }

    pub fn get(&self, strand: Strand, contig: usize, position: u64) -> Option<&StackPosition> {
        self.contig(strand, contig)
            .and_then(|stacks| stacks.get(&position))
    }

    /// All stacks of a contig on one strand.
    pub fn contig(&self, strand: Strand, contig: usize) -> Option<&ContigStacks> {
        self.strands[strand.index()].get(&contig)
    }

    /// Contigs with at least one stack on the given strand, with their stacks.
    pub fn contigs(&self, strand: Strand) -> impl Iterator<Item = (usize, &ContigStacks)> {
        self.strands[strand.index()]
            .iter()
            .map(|(&contig, stacks)| (contig, stacks))
    }

    /// Every stack on both strands.
    pub fn stacks(&self) -> impl Iterator<Item = &StackPosition> {
        self.strands
            .iter()
            .flat_map(|contigs| contigs.values())
            .flat_map(|stacks| stacks.values())
    }

    /// Number of (strand, contig, position) entries.
    pub fn len(&self) -> usize {
        self.strands
            .iter()
            .flat_map(|contigs| contigs.values())
            .map(|stacks| stacks.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SAM/BAM reader that accumulates read stacks
use crate::counts::{GenomeCounts, Strand};
use crate::error::Error;
use crate::params::{MultiHits, Parameters};
use crate::stats::CountingStats;
use flate2::read::MultiGzDecoder;
use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// First bytes of a gzip (and therefore BGZF) stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// First bytes of decompressed BAM data.
const BAM_MAGIC: [u8; 4] = *b"BAM\x01";

/// Reference sequence names in header order; index = contig id.
pub type ContigNames = Vec<String>;

/// Which alignment records contribute to stacks, and with which weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFilter {
    pub min_read_length: usize,
    pub max_read_length: usize,
    pub multi_hits: MultiHits,
}

impl ReadFilter {
    pub fn from_params(params: &Parameters) -> Self {
        Self {
            min_read_length: params.min_read_length,
            max_read_length: params.max_read_length,
            multi_hits: params.multi_hits,
        }
    }
}

impl Default for ReadFilter {
    fn default() -> Self {
        Self {
            min_read_length: 1,
            max_read_length: 1000,
            multi_hits: MultiHits::Weighted,
        }
    }
}

/// Accumulates the stacks of one or more SAM/BAM inputs into a `GenomeCounts`.
///
/// All inputs must share the same reference sequences, since stacks are
/// keyed by contig id.
pub struct StackCounter {
    filter: ReadFilter,
    counts: GenomeCounts,
    contig_names: Option<ContigNames>,
}

impl StackCounter {
    pub fn new(filter: ReadFilter) -> Self {
        Self {
            filter,
            counts: GenomeCounts::new(),
            contig_names: None,
        }
    }

    /// Count the reads of a SAM or BAM file ("-" reads from stdin).
    ///
    /// Plain and gzip/BGZF compressed input is detected from the first bytes,
    /// so the file extension does not matter.
    pub fn count_file(&mut self, path: &Path) -> Result<CountingStats, Error> {
        let reader = open_input(path)?;
        self.count_reader(reader, path)
    }

    /// Count the reads of an uncompressed SAM or BAM stream.
    ///
    /// `path` is only used in error messages.
    pub fn count_reader<R: BufRead>(
        &mut self,
        mut reader: R,
        path: &Path,
    ) -> Result<CountingStats, Error> {
        let is_bam = reader
            .fill_buf()
            .map_err(|e| Error::io(e, path))?
            .starts_with(&BAM_MAGIC);

        if is_bam {
            let mut reader = bam::io::Reader::from(reader);
            let header = reader.read_header().map_err(|e| Error::io(e, path))?;
            self.check_header(&header, path)?;
            self.count_records(reader.record_bufs(&header), path)
        } else {
            let mut reader = sam::io::Reader::new(reader);
            let header = reader.read_header().map_err(|e| Error::io(e, path))?;
            self.check_header(&header, path)?;
            self.count_records(reader.record_bufs(&header), path)
        }
    }

    fn count_records(
        &mut self,
        records: impl Iterator<Item = io::Result<RecordBuf>>,
        path: &Path,
    ) -> Result<CountingStats, Error> {
        let mut stats = CountingStats::new();
        for result in records {
            let record = result.map_err(|e| Error::Alignment {
                path: path.to_path_buf(),
                message: format!("failed to read record: {e}"),
            })?;
            self.add_record(&record, path, &mut stats)?;
        }
        Ok(stats)
    }

    /// Remember the reference sequence names of the first input and make sure
    /// later inputs use the same ones.
    fn check_header(&mut self, header: &sam::Header, path: &Path) -> Result<(), Error> {
        let names: ContigNames = header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect();

        match &self.contig_names {
            None => {
                log::debug!("{}: {} reference sequences", path.display(), names.len());
                self.contig_names = Some(names);
                Ok(())
            }
            Some(known) if *known == names => Ok(()),
            Some(_) => Err(Error::HeaderMismatch {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Add a single alignment record to its stack.
    ///
    /// Plus-strand reads stack at their 0-based alignment start; minus-strand
    /// reads stack one past the last aligned reference base, so a plus stack
    /// at `p` and a minus stack at `p + 10` have 5' ends overlapping by 10 nt.
    pub fn add_record(
        &mut self,
        record: &RecordBuf,
        path: &Path,
        stats: &mut CountingStats,
    ) -> Result<(), Error> {
        stats.total_records += 1;

        let flags = record.flags();
        let (contig, start) = match (record.reference_sequence_id(), record.alignment_start()) {
            (Some(contig), Some(start)) if !flags.is_unmapped() => (contig, usize::from(start) - 1),
            _ => {
                stats.unmapped += 1;
                return Ok(());
            }
        };

        let read_length = record.sequence().len();
        if read_length < self.filter.min_read_length || read_length > self.filter.max_read_length {
            stats.length_filtered += 1;
            return Ok(());
        }

        let Some(weight) = self.read_weight(record, path)? else {
            stats.multi_hit_discarded += 1;
            return Ok(());
        };

        let cigar = record.cigar().as_ref();
        let sequence = record.sequence().as_ref();

        let (strand, position, uridine) = if flags.is_reverse_complemented() {
            let span: usize = cigar
                .iter()
                .filter(|op| consumes_reference(op.kind()))
                .map(|op| op.len())
                .sum();
            let clipped = soft_clip_len(cigar.iter().rev());
            // SAM stores the reverse complement, so a 5' uridine shows up as a trailing A
            let five_prime = read_length
                .checked_sub(clipped + 1)
                .and_then(|i| sequence.get(i));
            (
                Strand::Minus,
                (start + span) as u64,
                matches!(five_prime, Some(b'A' | b'a')),
            )
        } else {
            let clipped = soft_clip_len(cigar.iter());
            (
                Strand::Plus,
                start as u64,
                matches!(sequence.get(clipped), Some(b'T' | b't')),
            )
        };

        self.counts.add_read(strand, contig, position, weight, uridine);
        stats.counted += 1;
        stats.total_weight += weight;
        Ok(())
    }

    /// Stack height contribution of a record, or `None` if it must be skipped.
    fn read_weight(&self, record: &RecordBuf, path: &Path) -> Result<Option<f64>, Error> {
        if self.filter.multi_hits == MultiHits::Unique {
            return Ok(Some(1.0));
        }

        let hits = match record.data().get(&Tag::ALIGNMENT_HIT_COUNT) {
            None => 1,
            Some(value) => value
                .as_int()
                .filter(|&n| n > 0)
                .ok_or_else(|| Error::Alignment {
                    path: path.to_path_buf(),
                    message: format!("invalid NH value: {value:?}"),
                })?,
        };

        Ok(match self.filter.multi_hits {
            MultiHits::Discard => (hits == 1).then_some(1.0),
            _ => Some(1.0 / hits as f64),
        })
    }

    /// Reference sequence names seen so far (empty before the first input).
    pub fn contig_names(&self) -> &[String] {
        self.contig_names.as_deref().unwrap_or(&[])
    }

    /// Hand over the accumulated stacks and reference sequence names.
    pub fn finish(self) -> (GenomeCounts, ContigNames) {
        (self.counts, self.contig_names.unwrap_or_default())
    }
}

/// Length of the soft clip at one end of a CIGAR, looking past hard clips.
///
/// `ops` walks the CIGAR from the end of interest inwards.
fn soft_clip_len<'a>(mut ops: impl Iterator<Item = &'a Op>) -> usize {
    match ops.find(|op| op.kind() != Kind::HardClip) {
        Some(op) if op.kind() == Kind::SoftClip => op.len(),
        _ => 0,
    }
}

/// CIGAR operations that advance along the reference.
fn consumes_reference(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match | Kind::Skip | Kind::Deletion | Kind::SequenceMatch | Kind::SequenceMismatch
    )
}

/// Open an input file ("-" = stdin), transparently decompressing gzip/BGZF.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let inner: Box<dyn Read> = if path == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path).map_err(|e| Error::io(e, path))?)
    };

    let mut reader = BufReader::new(inner);
    let is_gzipped = reader
        .fill_buf()
        .map_err(|e| Error::io(e, path))?
        .starts_with(&GZIP_MAGIC);

    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

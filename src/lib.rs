// mdcigar: Reconcile CIGAR strings and MD tags of SAM alignment records.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! mdcigar is a library and a command-line client for:
//!
//!   - Filling in missing NM and MD tags of [SAM](https://samtools.github.io/hts-specs/SAMv1.pdf) records.
//!   - Refreshing NM, MD, jM and jI tags after the CIGAR or sequence of a record has changed.
//!   - Checking that the CIGAR, MD and NM of a record agree with each other and with the reference.
//!   - Writing the read sequences of SAM records in FASTA format.
//!
//! The CIGAR string and the MD tag both describe how a read differs from the
//! reference but neither contains all of the information. CIGAR has no
//! mismatch positions and MD has no insertions, clipping or introns. mdcigar
//! decodes both into [runs](Run) of [operations](OpKind) and
//! [merges](merge::merge) them into a single stream that covers every read
//! and reference base.
//!
//! NM and MD can also be recomputed from scratch by comparing the read to the
//! reference with [nm_md_from_reference](recompute::nm_md_from_reference).
//! This is what is written out when records are printed.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The mdcigar CLI supports the following subcommands:
//!   - `mdcigar refresh` recompute NM/MD/jM/jI tags and write SAM.
//!   - `mdcigar fasta` write the read sequences in FASTA format.
//!   - `mdcigar check` report records whose stored NM/MD disagree with the CIGAR or the reference.
//!
//! All subcommands need the reference genome as a FASTA file.
//!
//! ### Rust API
//!
//! The API provides functions operating on structs that implement [Read] and/or
//! [Write] for processing entire SAM files.
//!
//! For use cases requiring access to a single record at a time, the following
//! are provided:
//!
//!   - [AlignmentRecord](record::AlignmentRecord): a single SAM record with its tags.
//!   - [Parser](parser::Parser): takes a [Read] containing SAM lines and converts them into [AlignmentRecord](record::AlignmentRecord).
//!   - [Printer](printer::Printer): takes an iterator over [AlignmentRecord](record::AlignmentRecord) and formats them in a [Format].
//!
//! Reference sequences are accessed through the [Genome](genome::Genome)
//! trait and splice junctions are classified through the
//! [JunctionClassifier](junction::JunctionClassifier) trait.
//!
//! ```rust
//! use mdcigar::convert_from_read_to_write;
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::junction::MotifCodeClassifier;
//! use mdcigar::Format;
//! use std::io::Cursor;
//!
//! let genome = FastaGenome::from_reader(Cursor::new(b">chr1\nAAAAACAAAAA\n".to_vec())).unwrap();
//!
//! let mut input: Vec<u8> = b"@HD\tVN:1.6\n".to_vec();
//! input.append(&mut b"read1\t0\tchr1\t1\t60\t5M1D5M\t*\t0\t0\tAAAAAAAAAA\tIIIIIIIIII\tAS:i:9\n".to_vec());
//!
//! let mut output: Vec<u8> = Vec::new();
//! let rejected = convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, true, &mut Cursor::new(input), &mut output).unwrap();
//!
//! let mut expected: Vec<u8> = b"@HD\tVN:1.6\n".to_vec();
//! expected.append(&mut b"read1\t0\tchr1\t1\t60\t5M1D5M\t*\t0\t0\tAAAAAAAAAA\tIIIIIIIIII\tAS:i:9\tNM:i:1\tMD:Z:5^C5\n".to_vec());
//!
//! assert_eq!(rejected, 0);
//! assert_eq!(output, expected);
//! ```
//!

use std::io::Read;
use std::io::Write;

use log::info;
use log::warn;

use genome::Genome;
use junction::JunctionClassifier;

pub mod cigar;
pub mod genome;
pub mod junction;
pub mod md;
pub mod merge;
pub mod parser;
pub mod printer;
pub mod recompute;
pub mod record;
pub mod tags;

type E = Box<dyn std::error::Error>;

/// Supported output formats.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    SAM,
    FASTA,
}

/// Strand of an alignment.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Alignment operations.
///
/// CIGAR runs may have any kind. Runs decoded from MD are always
/// [Match](OpKind::Match), [Mismatch](OpKind::Mismatch) or
/// [Deletion](OpKind::Deletion).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpKind {
    Match,
    Mismatch,
    Insertion,
    Deletion,
    SoftClip,
    HardClip,
    Skip,
}

impl OpKind {
    /// Operation for a CIGAR letter.
    pub fn from_cigar_char(
        c: char,
    ) -> Option<Self> {
        match c {
            'M' => Some(OpKind::Match),
            'X' => Some(OpKind::Mismatch),
            'I' => Some(OpKind::Insertion),
            'D' => Some(OpKind::Deletion),
            'S' => Some(OpKind::SoftClip),
            'H' => Some(OpKind::HardClip),
            'N' => Some(OpKind::Skip),
            _ => None,
        }
    }

    pub fn to_cigar_char(
        self,
    ) -> char {
        match self {
            OpKind::Match => 'M',
            OpKind::Mismatch => 'X',
            OpKind::Insertion => 'I',
            OpKind::Deletion => 'D',
            OpKind::SoftClip => 'S',
            OpKind::HardClip => 'H',
            OpKind::Skip => 'N',
        }
    }

    pub fn consumes_reference(
        self,
    ) -> bool {
        matches!(self, OpKind::Match | OpKind::Mismatch | OpKind::Deletion | OpKind::Skip)
    }

    pub fn consumes_read(
        self,
    ) -> bool {
        matches!(self, OpKind::Match | OpKind::Mismatch | OpKind::Insertion | OpKind::SoftClip)
    }
}

/// A run of `len` consecutive operations of the same kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Run {
    pub kind: OpKind,
    pub len: usize,
}

impl Run {
    pub fn new(
        kind: OpKind,
        len: usize,
    ) -> Self {
        Run { kind, len }
    }
}

impl std::fmt::Display for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.len, self.kind.to_cigar_char())
    }
}

/// Reasons for rejecting a record.
///
/// All variants carry the offending value so that the rejected record can be
/// identified from the message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AlignmentError {
    /// A field or tag does not parse.
    MalformedInput { field: String, value: String },
    /// CIGAR and MD do not describe the same alignment.
    AlignmentInconsistency { cigar: String, md: String },
    /// The reference could not provide the bases `start..=end` of `contig`.
    LookupFailure { contig: String, start: usize, end: usize, reason: String },
}

impl std::fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AlignmentError::MalformedInput { field, value } => {
                write!(f, "malformed {}: '{}'", field, value)
            },
            AlignmentError::AlignmentInconsistency { cigar, md } => {
                write!(f, "CIGAR '{}' and MD '{}' describe different alignments", cigar, md)
            },
            AlignmentError::LookupFailure { contig, start, end, reason } => {
                write!(f, "could not fetch {}:{}-{}: {}", contig, start, end, reason)
            },
        }
    }
}

impl std::error::Error for AlignmentError {}

/// Summary of [check_from_read_to_write].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CheckSummary {
    /// Records that were parsed and checked.
    pub checked: usize,
    /// Checked records with tags that disagree.
    pub inconsistent: usize,
    /// Records that could not be parsed.
    pub rejected: usize,
}

/// Convert SAM data from [Read] to refreshed SAM or FASTA data in [Write].
///
/// SAM header lines are passed through unchanged when writing SAM and
/// `with_header` is true. Set it to false when appending records to output
/// that already has a header. NM and MD
/// are recomputed from the reference for every record, and jM and jI for
/// records with splice junctions.
///
/// Records that cannot be parsed or printed are logged and skipped.
///
/// Returns the number of skipped records.
///
/// ## Errors
///
/// Terminates with an error if reading from `conn_in` or writing to
/// `conn_out` fails.
///
pub fn convert_from_read_to_write<R: Read, W: Write, G: Genome + ?Sized, C: JunctionClassifier>(
    genome: &G,
    classifier: &C,
    format: Format,
    with_header: bool,
    conn_in: &mut R,
    conn_out: &mut W,
) -> Result<usize, E> {
    let mut parser = crate::parser::Parser::new(conn_in, genome, classifier)?;
    let header = parser.header().to_vec();

    let mut n_printed = 0_usize;
    let mut n_unprinted = 0_usize;
    {
        let mut records = std::iter::from_fn(|| parser.next_valid());
        let mut printer = crate::printer::Printer::new(&mut records, genome, format).with_header(&header);

        if with_header {
            if let Some(bytes) = printer.print_header() {
                conn_out.write_all(&bytes)?;
            }
        }
        for line in printer.by_ref() {
            match line {
                Ok(bytes) => {
                    conn_out.write_all(&bytes)?;
                    n_printed += 1;
                },
                Err(e) if e.is::<AlignmentError>() => {
                    warn!("Skipping record: {}", e);
                    n_unprinted += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    if let Some(e) = parser.take_error() {
        return Err(Box::new(e))
    }
    conn_out.flush()?;

    let n_rejected = parser.rejected() + n_unprinted;
    info!("Wrote {} records, skipped {}", n_printed, n_rejected);

    Ok(n_rejected)
}

/// Check the stored tags of all SAM records in [Read].
///
/// Writes one line for each record whose stored NM or MD disagrees with the
/// CIGAR or the reference, or whose MD cannot be merged with the CIGAR.
/// Records that were missing MD are filled in from the reference and are
/// always consistent.
///
/// ## Errors
///
/// Terminates with an error if reading from `conn_in` or writing to
/// `conn_out` fails.
///
pub fn check_from_read_to_write<R: Read, W: Write, G: Genome + ?Sized, C: JunctionClassifier>(
    genome: &G,
    classifier: &C,
    conn_in: &mut R,
    conn_out: &mut W,
) -> Result<CheckSummary, E> {
    let mut parser = crate::parser::Parser::new(conn_in, genome, classifier)?;

    let mut summary = CheckSummary::default();
    while let Some(record) = parser.next_valid() {
        summary.checked += 1;
        match record.check_tags(genome) {
            Ok(check) => {
                if !check.is_consistent() {
                    summary.inconsistent += 1;
                    conn_out.write_all(format!("{}\n", check).as_bytes())?;
                }
            },
            Err(e) => {
                summary.inconsistent += 1;
                conn_out.write_all(format!("{}\t{}\n", record.query_name(), e).as_bytes())?;
            },
        }
    }

    if let Some(e) = parser.take_error() {
        return Err(Box::new(e))
    }
    conn_out.flush()?;

    summary.rejected = parser.rejected();
    info!("Checked {} records, {} inconsistent, {} rejected", summary.checked, summary.inconsistent, summary.rejected);

    Ok(summary)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn convert_from_read_to_write_sam() {
        use super::convert_from_read_to_write;
        use crate::Format;
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"ACGTACGTACGGGGGGGGGG");

        let mut data: Vec<u8> = b"@HD\tVN:1.6\tSO:unsorted\n".to_vec();
        data.append(&mut b"@SQ\tSN:chr1\tLN:20\n".to_vec());
        data.append(&mut b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:3\tMD:Z:1A8\tXS:i:0\n".to_vec());
        data.append(&mut b"r2\t16\tchr1\t3\t60\t4M\t*\t0\t0\tGTAA\tIIII\n".to_vec());

        let mut expected: Vec<u8> = b"@HD\tVN:1.6\tSO:unsorted\n".to_vec();
        expected.append(&mut b"@SQ\tSN:chr1\tLN:20\n".to_vec());
        expected.append(&mut b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tXS:i:0\tNM:i:0\tMD:Z:10\n".to_vec());
        expected.append(&mut b"r2\t16\tchr1\t3\t60\t4M\t*\t0\t0\tGTAA\tIIII\tNM:i:1\tMD:Z:3C0\n".to_vec());

        let mut input = Cursor::new(data);
        let mut got: Vec<u8> = Vec::new();
        let rejected = convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, true, &mut input, &mut got).unwrap();

        assert_eq!(rejected, 0);
        assert_eq!(got, expected);
    }

    #[test]
    fn convert_from_read_to_write_fasta() {
        use super::convert_from_read_to_write;
        use crate::Format;
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"ACGTACGTACGGGGGGGGGG");

        let mut data: Vec<u8> = b"@HD\tVN:1.6\tSO:unsorted\n".to_vec();
        data.append(&mut b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:0\tMD:Z:10\n".to_vec());
        data.append(&mut b"r2\t0\tchr1\t3\t60\t4M\t*\t0\t0\tGTAC\tIIII\n".to_vec());

        let expected: Vec<u8> = b">r1\nACGTACGTAC\n>r2\nGTAC\n".to_vec();

        let mut input = Cursor::new(data);
        let mut got: Vec<u8> = Vec::new();
        convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::FASTA, true, &mut input, &mut got).unwrap();

        assert_eq!(got, expected);
    }

    #[test]
    fn convert_from_read_to_write_skips_bad_records() {
        use super::convert_from_read_to_write;
        use crate::Format;
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"ACGTACGTACGGGGGGGGGG");

        let mut data: Vec<u8> = b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\n".to_vec();
        data.append(&mut b"r2\t0\tchr1\t3\t60\t4Q\t*\t0\t0\tGTAC\tIIII\n".to_vec());
        data.append(&mut b"r3\t0\tchr2\t3\t60\t4M\t*\t0\t0\tGTAC\tIIII\n".to_vec());
        data.append(&mut b"r4\t0\tchr2\t3\t60\t4M\t*\t0\t0\tGTAC\tIIII\tNM:i:0\tMD:Z:4\n".to_vec());

        let expected: Vec<u8> = b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:0\tMD:Z:10\n".to_vec();

        let mut input = Cursor::new(data);
        let mut got: Vec<u8> = Vec::new();
        let rejected = convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, true, &mut input, &mut got).unwrap();

        // r2 and r3 fail to parse, r4 has its tags but fails the lookup when printed
        assert_eq!(rejected, 3);
        assert_eq!(got, expected);
    }

    #[test]
    fn check_from_read_to_write_reports_stale_tags() {
        use super::{check_from_read_to_write, CheckSummary};
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"ACGTACGTACGGGGGGGGGG");

        let mut data: Vec<u8> = b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:0\tMD:Z:10\n".to_vec();
        data.append(&mut b"r2\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:1\tMD:Z:1A8\n".to_vec());
        data.append(&mut b"r3\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\tNM:i:0\tMD:Z:8\n".to_vec());
        data.append(&mut b"r4\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII\n".to_vec());

        let mut input = Cursor::new(data);
        let mut got: Vec<u8> = Vec::new();
        let summary = check_from_read_to_write(&genome, &MotifCodeClassifier, &mut input, &mut got).unwrap();

        let expected_summary = CheckSummary { checked: 4, inconsistent: 2, rejected: 0 };
        let mut expected: Vec<u8> = b"r2\tNM:i:1\tmerged:1\treference:0\tMD:Z:1A8\tMD:Z:10\n".to_vec();
        expected.append(&mut b"r3\tCIGAR '10M' and MD 'MD:Z:8' describe different alignments\n".to_vec());

        assert_eq!(summary, expected_summary);
        assert_eq!(got, expected);
    }

    #[test]
    fn convert_from_read_to_write_appends_without_header() {
        use super::convert_from_read_to_write;
        use crate::Format;
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"ACGTACGTACGGGGGGGGGG");

        let mut first: Vec<u8> = b"@SQ\tSN:chr1\tLN:20\n".to_vec();
        first.append(&mut b"r1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\t*\n".to_vec());
        let mut second: Vec<u8> = b"@SQ\tSN:chr1\tLN:20\n".to_vec();
        second.append(&mut b"r2\t0\tchr1\t5\t60\t4M\t*\t0\t0\tACGT\t*\n".to_vec());

        let mut got: Vec<u8> = Vec::new();
        convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, true, &mut Cursor::new(first), &mut got).unwrap();
        convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, false, &mut Cursor::new(second), &mut got).unwrap();

        let mut expected: Vec<u8> = b"@SQ\tSN:chr1\tLN:20\n".to_vec();
        expected.append(&mut b"r1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\t*\tNM:i:0\tMD:Z:4\n".to_vec());
        expected.append(&mut b"r2\t0\tchr1\t5\t60\t4M\t*\t0\t0\tACGT\t*\tNM:i:0\tMD:Z:4\n".to_vec());

        assert_eq!(got, expected);
    }

    #[test]
    fn convert_from_read_to_write_rederives_junction_motifs() {
        use super::convert_from_read_to_write;
        use crate::Format;
        use crate::genome::FastaGenome;
        use crate::junction::{MotifCodeClassifier, ReferenceMotifClassifier};
        use std::io::Cursor;

        let mut genome = FastaGenome::new();
        // GT...AG intron at 9-16
        genome.add_contig("chr2", b"AAAACCCCGTTTTTAGCCCCAAAA");

        let data: Vec<u8> = b"r1\t0\tchr2\t5\t255\t4M8N4M\t*\t0\t0\tCCCCCCCC\t*\tjM:B:c,0\tjI:B:i,9,16\n".to_vec();

        let mut got: Vec<u8> = Vec::new();
        convert_from_read_to_write(&genome, &ReferenceMotifClassifier, Format::SAM, true, &mut Cursor::new(data.clone()), &mut got).unwrap();
        assert_eq!(got, b"r1\t0\tchr2\t5\t255\t4M8N4M\t*\t0\t0\tCCCCCCCC\t*\tNM:i:0\tMD:Z:8\tjM:B:c,1\tjI:B:i,9,16\n".to_vec());

        let mut got: Vec<u8> = Vec::new();
        convert_from_read_to_write(&genome, &MotifCodeClassifier, Format::SAM, true, &mut Cursor::new(data), &mut got).unwrap();
        assert_eq!(got, b"r1\t0\tchr2\t5\t255\t4M8N4M\t*\t0\t0\tCCCCCCCC\t*\tNM:i:0\tMD:Z:8\tjM:B:c,0\tjI:B:i,9,16\n".to_vec());
    }

    #[test]
    fn run_display() {
        use crate::{OpKind, Run};

        assert_eq!(Run::new(OpKind::Skip, 1204).to_string(), "1204N");
        assert_eq!(Run::new(OpKind::Mismatch, 1).to_string(), "1X");
    }
}

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

//! Printer for outputting [AlignmentRecord]s as plain text in any supported [Format].
//!
//! Can be used to convert any iterator over [AlignmentRecord] data to their
//! plain text representation. When printing SAM, the NM and MD tags of every
//! record are recomputed from the reference and the jM and jI tags from the
//! current splice junctions.
//!
//! Returns 1 record at a time using next(). Records that cannot be printed
//! return an error and the Printer can continue with the next record.
//!
//! If the output format has header lines, these can be formatted by Printer
//! using [print_header](Printer::print_header).
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::junction::MotifCodeClassifier;
//! use mdcigar::printer::Printer;
//! use mdcigar::record::AlignmentRecord;
//! use mdcigar::Format;
//!
//! let mut genome = FastaGenome::new();
//! genome.add_contig("chr1", b"ACGTACGTAC");
//!
//! let line = "r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t*\tNM:i:4\tMD:Z:10";
//! let data = vec![AlignmentRecord::from_line(line, &genome, &MotifCodeClassifier).unwrap()];
//!
//! let mut iter = data.into_iter();
//! let header = vec!["@SQ\tSN:chr1\tLN:10".to_string()];
//! let mut printer = Printer::new(&mut iter, &genome, Format::SAM).with_header(&header);
//!
//! let mut output: Vec<u8> = printer.print_header().unwrap();
//! for line in printer.by_ref() {
//!     output.append(&mut line.unwrap());
//! }
//!
//! let mut expected: Vec<u8> = b"@SQ\tSN:chr1\tLN:10\n".to_vec();
//! expected.append(&mut b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t*\tNM:i:0\tMD:Z:10\n".to_vec());
//!
//! assert_eq!(output, expected);
//! ```
//!

use crate::genome::Genome;
use crate::record::AlignmentRecord;
use crate::Format;

use fasta::format_fasta_record;
use sam::format_sam_line;

// Format specific implementations
pub mod fasta;
pub mod sam;

type E = Box<dyn std::error::Error>;

/// Line width of FASTA output.
pub const FASTA_LINE_WIDTH: usize = 80;

pub struct Printer<'a, I: Iterator, G: Genome + ?Sized> where I: Iterator<Item=AlignmentRecord> {
    // Inputs
    records: &'a mut I,
    genome: &'a G,

    header: Vec<String>,

    pub format: Format,
}

impl<'a, I: Iterator, G: Genome + ?Sized> Printer<'a, I, G> where I: Iterator<Item=AlignmentRecord> {
    pub fn new(
        records: &'a mut I,
        genome: &'a G,
        format: Format,
    ) -> Self {
        Printer{
            records, genome,
            header: Vec::new(),
            format,
        }
    }

    /// Set the SAM header lines to print.
    pub fn with_header(
        mut self,
        header: &[String],
    ) -> Self {
        self.header = header.to_vec();
        self
    }

    /// Format the header lines.
    ///
    /// Returns None if the format has no header or there are no header
    /// lines.
    pub fn print_header(
        &self,
    ) -> Option<Vec<u8>> {
        match self.format {
            Format::SAM => {
                if self.header.is_empty() {
                    return None
                }
                let mut out: Vec<u8> = Vec::new();
                self.header.iter().for_each(|line| {
                    out.extend_from_slice(line.as_bytes());
                    out.push(b'\n');
                });
                Some(out)
            },
            Format::FASTA => None,
        }
    }
}

impl<I: Iterator, G: Genome + ?Sized> Iterator for Printer<'_, I, G> where I: Iterator<Item=AlignmentRecord> {
    type Item = Result<Vec<u8>, E>;

    fn next(
        &mut self,
    ) -> Option<Result<Vec<u8>, E>> {
        let record = self.records.next()?;

        let mut out: Vec<u8> = Vec::new();
        let res = match self.format {
            Format::SAM => format_sam_line(&record, self.genome, &mut out),
            Format::FASTA => format_fasta_record(&record, FASTA_LINE_WIDTH, &mut out),
        };

        Some(res.map(|_| out))
    }
}

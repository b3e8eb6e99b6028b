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

//! Parser for reading [SAM](https://samtools.github.io/hts-specs/SAMv1.pdf)
//! data into [AlignmentRecord]s.
//!
//! The header lines are consumed when the Parser is created and are
//! available through [header](Parser::header). Records are returned 1 at a
//! time using next().
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::junction::MotifCodeClassifier;
//! use mdcigar::parser::Parser;
//! use std::io::Cursor;
//!
//! let mut genome = FastaGenome::new();
//! genome.add_contig("chr1", b"ACGTACGTAC");
//!
//! let mut data: Vec<u8> = b"@SQ\tSN:chr1\tLN:10\n".to_vec();
//! data.append(&mut b"r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t*\n".to_vec());
//! data.append(&mut b"r2\t0\tchr1\t1\t60\t10Q\t*\t0\t0\tACGTACGTAC\t*\n".to_vec());
//!
//! let mut input = Cursor::new(data);
//! let mut parser = Parser::new(&mut input, &genome, &MotifCodeClassifier).unwrap();
//!
//! assert_eq!(parser.header(), &["@SQ\tSN:chr1\tLN:10".to_string()]);
//!
//! let first = parser.next_valid().unwrap();
//! assert_eq!(first.md(), "MD:Z:10");
//!
//! assert!(parser.next_valid().is_none());
//! assert_eq!(parser.rejected(), 1);
//! ```
//!

// Format specific implementations
pub mod sam;

use crate::genome::Genome;
use crate::junction::JunctionClassifier;
use crate::parser::sam::read_sam;
use crate::record::AlignmentRecord;
use crate::AlignmentError;

use std::io::BufRead;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;

use log::debug;
use log::warn;

type E = Box<dyn std::error::Error>;

pub struct Parser<'a, R: Read, G: Genome + ?Sized, C: JunctionClassifier> {
    reader: BufReader<&'a mut R>,
    // First record line, read while consuming the header
    buf: Vec<u8>,
    header: Vec<String>,

    genome: &'a G,
    classifier: &'a C,

    rejected: usize,
    error: Option<std::io::Error>,
}

fn trim_line_end(
    line: &mut Vec<u8>,
) {
    while line.last().is_some_and(|x| *x == b'\n' || *x == b'\r') {
        line.pop();
    }
}

impl<'a, R: Read, G: Genome + ?Sized, C: JunctionClassifier> Parser<'a, R, G, C> {
    /// Start parsing SAM data from `conn`.
    ///
    /// Consumes the header lines.
    ///
    /// ## Errors
    ///
    /// Terminates with an error if reading from `conn` fails or the header
    /// is not valid SAM.
    ///
    pub fn new(
        conn: &'a mut R,
        genome: &'a G,
        classifier: &'a C,
    ) -> Result<Self, E> {
        let mut reader = BufReader::new(conn);
        let mut header_contents = Cursor::new(Vec::<u8>::new());
        let mut header: Vec<String> = Vec::new();
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let mut next_line: Vec<u8> = Vec::new();
            if reader.read_until(b'\n', &mut next_line)? == 0 {
                break;
            }
            if next_line.first() == Some(&b'@') {
                header_contents.get_mut().extend_from_slice(&next_line);
                trim_line_end(&mut next_line);
                header.push(String::from_utf8(next_line)?);
            } else {
                buf = next_line;
                break;
            }
        }

        if !header.is_empty() {
            if header_contents.get_ref().last() != Some(&b'\n') {
                header_contents.get_mut().push(b'\n');
            }
            let mut sam_reader = noodles_sam::io::reader::Builder::default().build_from_reader(&mut header_contents)?;
            let sam_header = sam_reader.read_header()?;
            debug!("Read SAM header with {} reference sequences", sam_header.reference_sequences().len());
        }

        Ok(Self {
            reader, buf, header,
            genome, classifier,
            rejected: 0, error: None,
        })
    }
}

impl<R: Read, G: Genome + ?Sized, C: JunctionClassifier> Parser<'_, R, G, C> {
    /// Header lines without line endings.
    pub fn header(
        &self,
    ) -> &[String] {
        &self.header
    }

    /// Number of records skipped by [next_valid](Parser::next_valid).
    pub fn rejected(
        &self,
    ) -> usize {
        self.rejected
    }

    /// Error that stopped reading the input, if any.
    pub fn take_error(
        &mut self,
    ) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Next record that could be parsed.
    ///
    /// Records that fail to parse are logged and counted in
    /// [rejected](Parser::rejected).
    pub fn next_valid(
        &mut self,
    ) -> Option<AlignmentRecord> {
        loop {
            match self.next()? {
                Ok(record) => return Some(record),
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    self.rejected += 1;
                },
            }
        }
    }
}

impl<R: Read, G: Genome + ?Sized, C: JunctionClassifier> Iterator for Parser<'_, R, G, C> {
    type Item = Result<AlignmentRecord, AlignmentError>;

    fn next(
        &mut self,
    ) -> Option<Result<AlignmentRecord, AlignmentError>> {
        loop {
            let mut line: Vec<u8> = std::mem::take(&mut self.buf);
            if line.is_empty() {
                match self.reader.read_until(b'\n', &mut line) {
                    Ok(0) => return None,
                    Ok(_) => (),
                    Err(e) => {
                        self.error = Some(e);
                        return None
                    },
                }
            }
            trim_line_end(&mut line);
            if !line.is_empty() {
                return Some(read_sam(&line, self.genome, self.classifier))
            }
        }
    }
}

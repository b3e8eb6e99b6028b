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
use std::io::Write;

use crate::record::AlignmentRecord;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct InvalidLineWidth;

impl std::fmt::Display for InvalidLineWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "FASTA line width must be positive")
    }
}

impl std::error::Error for InvalidLineWidth {}

/// Format the read sequence of a record in FASTA format
///
/// Writes the query name as the header line and the stored sequence of
/// `record` wrapped at `width` characters to `conn`.
///
/// Terminates with [InvalidLineWidth] if `width` is 0.
///
pub fn format_fasta_record<W: Write>(
    record: &AlignmentRecord,
    width: usize,
    conn: &mut W,
) -> Result<(), E> {
    if width == 0 {
        return Err(Box::new(InvalidLineWidth{}))
    }

    conn.write_all(b">")?;
    conn.write_all(record.query_name().as_bytes())?;
    conn.write_all(b"\n")?;
    for chunk in record.sequence().as_bytes().chunks(width) {
        conn.write_all(chunk)?;
        conn.write_all(b"\n")?;
    }

    Ok(())
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn format_fasta_record_wraps_sequence() {
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use crate::record::AlignmentRecord;
        use super::format_fasta_record;

        let genome = FastaGenome::new();
        let line = "r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t*\tNM:i:0\tMD:Z:10";
        let record = AlignmentRecord::from_line(line, &genome, &MotifCodeClassifier).unwrap();

        let expected: Vec<u8> = b">r1\nACGT\nACGT\nAC\n".to_vec();

        let mut got: Vec<u8> = Vec::new();
        format_fasta_record(&record, 4, &mut got).unwrap();

        assert_eq!(got, expected);
    }

    #[test]
    fn format_fasta_record_exact_width() {
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use crate::record::AlignmentRecord;
        use super::format_fasta_record;

        let genome = FastaGenome::new();
        let line = "r1\t0\tchr1\t1\t60\t10M\t*\t0\t0\tACGTACGTAC\t*\tNM:i:0\tMD:Z:10";
        let record = AlignmentRecord::from_line(line, &genome, &MotifCodeClassifier).unwrap();

        let mut got: Vec<u8> = Vec::new();
        format_fasta_record(&record, 10, &mut got).unwrap();

        assert_eq!(got, b">r1\nACGTACGTAC\n".to_vec());
        assert!(format_fasta_record(&record, 0, &mut got).is_err());
    }
}

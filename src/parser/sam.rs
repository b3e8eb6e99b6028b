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
use bstr::ByteSlice;

use crate::genome::Genome;
use crate::junction::JunctionClassifier;
use crate::record::AlignmentRecord;
use crate::AlignmentError;

/// Parse a line from a [SAM](https://samtools.github.io/hts-specs/SAMv1.pdf) file.
///
/// `line` should not contain the line ending.
///
/// Returns the [record](AlignmentRecord) on the line.
///
pub fn read_sam<G: Genome + ?Sized, C: JunctionClassifier>(
    line: &[u8],
    genome: &G,
    classifier: &C,
) -> Result<AlignmentRecord, AlignmentError> {
    let contents = line.to_str().map_err(|_| {
        AlignmentError::MalformedInput { field: "record".to_string(), value: line.to_str_lossy().to_string() }
    })?;
    AlignmentRecord::from_line(contents, genome, classifier)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn read_sam_single() {
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use crate::tags::OptionalField;
        use crate::Strand;
        use super::read_sam;
        use std::io::BufRead;
        use std::io::BufReader;
        use std::io::Cursor;

        let data: Vec<u8> =b"ERR4035126.1\t16\tOZ038621.1\t4541508\t60\t151M\t*\t0\t0\tAGTATTTAGTGACCTAAGTCAATAAAATTTTAATTTACTCACGGCAGGTAACCAGTTCAGAAGCTGCTATCAGACACTCTTTTTTTAATCCACACAGAGACATATTGCCCGTTGCAGTCAGAATGAAAAGCTGAAAATCACTTACTAAGGC\tFJ<<JJFJAA<-JFAJFAF<JFFJJJJJJJFJFJJA<A<AJJAAAFFJJJJFJJFJFJAJJ7JJJJJFJJJJJFFJFFJFJJJJJJFJ7FFJAJJJJJJJJFJJFJJFJFJJJJFJJFJJJJJJJJJFFJJJJJJJJJJJJJFJJJFFAAA\tNM:i:0\tMD:Z:151\tAS:i:151\tXS:i:0\n".to_vec();

        // NM and MD are present so the reference is not needed
        let genome = FastaGenome::new();

        let cursor = Cursor::new(data);
        let reader = BufReader::new(cursor);
        let got: Vec<(String, String, usize, Strand, usize, String, Vec<OptionalField>)> = reader.lines().map(|line| {
            let record = read_sam(line.unwrap().as_bytes(), &genome, &MotifCodeClassifier).unwrap();
            (record.query_name().to_string(), record.contig().to_string(), record.position(), record.strand(), record.nm(), record.md().to_string(), record.other_fields().to_vec())
        }).collect();

        let expected = vec![
            ("ERR4035126.1".to_string(), "OZ038621.1".to_string(), 4541508, Strand::Reverse, 0, "MD:Z:151".to_string(),
             vec![OptionalField::Other("AS:i:151".to_string()), OptionalField::Other("XS:i:0".to_string())]),
        ];

        assert_eq!(got, expected);
    }

    #[test]
    fn read_sam_rejects_invalid_utf8() {
        use crate::genome::FastaGenome;
        use crate::junction::MotifCodeClassifier;
        use super::read_sam;

        let genome = FastaGenome::new();
        let line: Vec<u8> = b"r1\t0\tchr1\t1\t60\t1M\t*\t0\t0\t\xff\t*\tNM:i:0\tMD:Z:1".to_vec();

        assert!(read_sam(&line, &genome, &MotifCodeClassifier).is_err());
    }
}

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

//! Splice junctions of spliced alignments.
//!
//! Junctions are described by the jM (motif codes) and jI (intron start and
//! end positions) tags written by [STAR](https://github.com/alexdobin/STAR).
//! The motif codes are
//!
//!   - 0: non-canonical
//!   - 1: GT/AG, 2: CT/AC
//!   - 3: GC/AG, 4: CT/GC
//!   - 5: AT/AC, 6: GT/AT
//!
//! with 20 added to junctions that are annotated.
//!
//! Deciding whether a junction is canonical is delegated to a
//! [JunctionClassifier]. [MotifCodeClassifier] trusts the codes in jM and
//! [ReferenceMotifClassifier] reads the intron ends from the reference.
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::junction::{classify_junctions, MotifCodeClassifier};
//! use mdcigar::Strand;
//!
//! let genome = FastaGenome::new();
//!
//! let junctions = classify_junctions("read1", "chr1", Strand::Forward, &[21, 0], &[101, 200, 301, 400], &genome, &MotifCodeClassifier).unwrap();
//!
//! assert!(junctions[0].canonical);
//! assert!(!junctions[1].canonical);
//! assert_eq!(junctions[1].start, 301);
//! ```
//!

use crate::genome::Genome;
use crate::AlignmentError;
use crate::Strand;

type E = Box<dyn std::error::Error>;

/// Added to the motif code of annotated junctions.
pub const ANNOTATED_OFFSET: i32 = 20;

/// One intron of an alignment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpliceJunction {
    /// 0-based index of the junction in the record.
    pub index: usize,
    /// First base of the intron (1-based).
    pub start: usize,
    /// Last base of the intron (1-based).
    pub end: usize,
    pub motif: i32,
    pub canonical: bool,
}

/// Everything a [JunctionClassifier] is told about a junction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JunctionQuery<'a> {
    pub read_id: &'a str,
    pub index: usize,
    pub contig: &'a str,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub motif: i32,
}

/// Result of classifying a junction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JunctionVerdict {
    pub canonical: bool,
    /// Motif code to write in jM.
    pub motif: i32,
}

#[derive(Debug, Clone)]
pub struct InvalidMotifCode {
    pub motif: i32,
}

impl std::fmt::Display for InvalidMotifCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "invalid splice junction motif code {}", self.motif)
    }
}

impl std::error::Error for InvalidMotifCode {}

/// Decides whether splice junctions are canonical.
pub trait JunctionClassifier {
    fn classify<G: Genome + ?Sized>(
        &self,
        query: &JunctionQuery,
        genome: &G,
    ) -> Result<JunctionVerdict, E>;
}

fn is_valid_motif(
    motif: i32,
) -> bool {
    (0..=6).contains(&motif) || (ANNOTATED_OFFSET..=(ANNOTATED_OFFSET + 6)).contains(&motif)
}

fn is_canonical_motif(
    motif: i32,
) -> bool {
    (1..=6).contains(&(motif % ANNOTATED_OFFSET))
}

/// Classify junctions by the motif code they were given in jM.
#[derive(Clone, Copy, Debug, Default)]
pub struct MotifCodeClassifier;

impl JunctionClassifier for MotifCodeClassifier {
    fn classify<G: Genome + ?Sized>(
        &self,
        query: &JunctionQuery,
        _genome: &G,
    ) -> Result<JunctionVerdict, E> {
        if !is_valid_motif(query.motif) {
            return Err(Box::new(InvalidMotifCode { motif: query.motif }))
        }
        Ok(JunctionVerdict { canonical: is_canonical_motif(query.motif), motif: query.motif })
    }
}

/// Motif code of an intron from its first and last two bases.
pub fn motif_code(
    donor: &str,
    acceptor: &str,
) -> i32 {
    match (donor.to_ascii_uppercase().as_str(), acceptor.to_ascii_uppercase().as_str()) {
        ("GT", "AG") => 1,
        ("CT", "AC") => 2,
        ("GC", "AG") => 3,
        ("CT", "GC") => 4,
        ("AT", "AC") => 5,
        ("GT", "AT") => 6,
        _ => 0,
    }
}

/// Classify junctions by reading the intron ends from the reference.
///
/// The annotation offset of the input motif code is kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceMotifClassifier;

impl JunctionClassifier for ReferenceMotifClassifier {
    fn classify<G: Genome + ?Sized>(
        &self,
        query: &JunctionQuery,
        genome: &G,
    ) -> Result<JunctionVerdict, E> {
        if !is_valid_motif(query.motif) || query.end < query.start + 1 {
            return Err(Box::new(InvalidMotifCode { motif: query.motif }))
        }
        let donor = genome.sequence(query.contig, query.start, query.start + 1)?;
        let acceptor = genome.sequence(query.contig, query.end - 1, query.end)?;

        let code = motif_code(&donor, &acceptor);
        let annotated = if query.motif >= ANNOTATED_OFFSET { ANNOTATED_OFFSET } else { 0 };

        Ok(JunctionVerdict { canonical: code > 0, motif: code + annotated })
    }
}

/// Build and classify the junctions of a record.
///
/// `bounds` holds the start and end of each intron in the same order as
/// `motifs`.
///
/// ## Errors
///
/// [AlignmentError::MalformedInput] if there are not exactly two bounds per
/// motif or an intron is empty. [AlignmentError::LookupFailure] if the
/// classifier fails.
///
pub fn classify_junctions<G: Genome + ?Sized, C: JunctionClassifier>(
    read_id: &str,
    contig: &str,
    strand: Strand,
    motifs: &[i32],
    bounds: &[usize],
    genome: &G,
    classifier: &C,
) -> Result<Vec<SpliceJunction>, AlignmentError> {
    if bounds.len() != 2 * motifs.len() || bounds.chunks(2).any(|x| x[0] == 0 || x[0] > x[1]) {
        let value = bounds.iter().map(|x| x.to_string()).collect::<Vec<String>>().join(",");
        return Err(AlignmentError::MalformedInput { field: "jI".to_string(), value })
    }

    motifs.iter().zip(bounds.chunks(2)).enumerate().map(|(index, (motif, bound))| {
        let query = JunctionQuery { read_id, index, contig, start: bound[0], end: bound[1], strand, motif: *motif };
        let verdict = classifier.classify(&query, genome).map_err(|e| {
            AlignmentError::LookupFailure { contig: contig.to_string(), start: query.start, end: query.end, reason: e.to_string() }
        })?;
        Ok(SpliceJunction { index, start: query.start, end: query.end, motif: verdict.motif, canonical: verdict.canonical })
    }).collect()
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn motif_code_classifier() {
        use crate::genome::FastaGenome;
        use crate::Strand;
        use super::{JunctionClassifier, JunctionQuery, JunctionVerdict, MotifCodeClassifier};

        let genome = FastaGenome::new();
        let mut query = JunctionQuery { read_id: "r1", index: 0, contig: "chr1", start: 10, end: 20, strand: Strand::Forward, motif: 0 };

        for (motif, canonical) in [(0, false), (1, true), (6, true), (20, false), (23, true)] {
            query.motif = motif;
            let got = MotifCodeClassifier.classify(&query, &genome).unwrap();
            assert_eq!(got, JunctionVerdict { canonical, motif });
        }

        for motif in [-1, 7, 19, 27] {
            query.motif = motif;
            assert!(MotifCodeClassifier.classify(&query, &genome).is_err());
        }
    }

    #[test]
    fn reference_motif_classifier() {
        use crate::genome::FastaGenome;
        use crate::Strand;
        use super::{JunctionClassifier, JunctionQuery, JunctionVerdict, ReferenceMotifClassifier};

        let mut genome = FastaGenome::new();
        genome.add_contig("chr1", b"AAAAGTCCCCAGAAAACTGGGGACAAAA");

        // GT...AG at 5-12, CT...AC at 17-24
        let forward = JunctionQuery { read_id: "r1", index: 0, contig: "chr1", start: 5, end: 12, strand: Strand::Forward, motif: 0 };
        let reverse = JunctionQuery { read_id: "r1", index: 1, contig: "chr1", start: 17, end: 24, strand: Strand::Reverse, motif: 22 };
        let neither = JunctionQuery { read_id: "r1", index: 2, contig: "chr1", start: 4, end: 12, strand: Strand::Forward, motif: 1 };

        assert_eq!(ReferenceMotifClassifier.classify(&forward, &genome).unwrap(), JunctionVerdict { canonical: true, motif: 1 });
        assert_eq!(ReferenceMotifClassifier.classify(&reverse, &genome).unwrap(), JunctionVerdict { canonical: true, motif: 22 });
        assert_eq!(ReferenceMotifClassifier.classify(&neither, &genome).unwrap(), JunctionVerdict { canonical: false, motif: 0 });
    }

    #[test]
    fn classify_junctions_pairs_bounds() {
        use crate::genome::FastaGenome;
        use crate::Strand;
        use super::{classify_junctions, MotifCodeClassifier, SpliceJunction};

        let genome = FastaGenome::new();
        let got = classify_junctions("r1", "chr1", Strand::Reverse, &[2, 0], &[100, 200, 300, 400], &genome, &MotifCodeClassifier).unwrap();
        let expected = vec![
            SpliceJunction { index: 0, start: 100, end: 200, motif: 2, canonical: true },
            SpliceJunction { index: 1, start: 300, end: 400, motif: 0, canonical: false },
        ];

        assert_eq!(got, expected);
    }

    #[test]
    fn classify_junctions_rejects_unpaired_bounds() {
        use crate::genome::FastaGenome;
        use crate::{AlignmentError, Strand};
        use super::{classify_junctions, MotifCodeClassifier};

        let genome = FastaGenome::new();
        let got = classify_junctions("r1", "chr1", Strand::Forward, &[1, 1], &[100, 200, 300], &genome, &MotifCodeClassifier).unwrap_err();
        let expected = AlignmentError::MalformedInput { field: "jI".to_string(), value: "100,200,300".to_string() };

        assert_eq!(got, expected);
    }

    #[test]
    fn classify_junctions_reports_classifier_errors() {
        use crate::genome::FastaGenome;
        use crate::{AlignmentError, Strand};
        use super::{classify_junctions, ReferenceMotifClassifier};

        let genome = FastaGenome::new();
        let got = classify_junctions("r1", "chr1", Strand::Forward, &[1], &[100, 200], &genome, &ReferenceMotifClassifier).unwrap_err();

        assert!(matches!(got, AlignmentError::LookupFailure { start: 100, end: 200, .. }));
    }
}

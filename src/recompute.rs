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

//! Recompute NM and MD by comparing a read against the reference.
//!
//! Existing MD tags are not used. The reference is fetched once per aligned
//! or deleted CIGAR run through a [Genome].
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::cigar::decode_cigar;
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::recompute::nm_md_from_reference;
//!
//! let mut genome = FastaGenome::new();
//! genome.add_contig("chr1", b"AAAAACAAAAA");
//!
//! let cigar = decode_cigar("5M1D5M").unwrap();
//! let (nm, md) = nm_md_from_reference(&cigar, "AAAAAAAAAA", "chr1", 1, &genome).unwrap();
//!
//! assert_eq!(nm, 1);
//! assert_eq!(md, "MD:Z:5^C5");
//! ```
//!

use crate::cigar::read_len;
use crate::genome::Genome;
use crate::md::MD_PREFIX;
use crate::AlignmentError;
use crate::OpKind;
use crate::Run;

/// Fetch `len` reference bases starting from `start`.
fn fetch<G: Genome + ?Sized>(
    genome: &G,
    contig: &str,
    start: usize,
    len: usize,
) -> Result<Vec<u8>, AlignmentError> {
    let end = start.saturating_add(len - 1);
    let lookup_failure = |reason: String| AlignmentError::LookupFailure { contig: contig.to_string(), start, end, reason };
    if start.checked_add(len - 1).is_none() {
        return Err(lookup_failure("interval end does not fit in usize".to_string()))
    }

    let bases = genome.sequence(contig, start, end).map_err(|e| lookup_failure(e.to_string()))?;
    if bases.len() != len {
        return Err(lookup_failure(format!("expected {} bases, got {}", len, bases.len())))
    }

    Ok(bases.into_bytes())
}

/// Compute NM and MD for a read from the reference.
///
/// `sequence` is the stored read sequence, `contig` and `start` the 1-based
/// leftmost reference position of the alignment. Returns the edit distance
/// and the MD field including its `MD:Z:` prefix.
///
/// Bases are compared case-insensitively and reference bases are written to
/// MD in upper case. Every base under a CIGAR `X` counts as a mismatch, even
/// when it equals the reference base. The MD value always ends in a match count, which is 0
/// when the alignment ends in a mismatch or a deletion.
///
/// ## Errors
///
/// [AlignmentError::MalformedInput] if the CIGAR does not cover every base of
/// `sequence`. [AlignmentError::LookupFailure] if the reference cannot provide
/// an interval covered by the alignment.
///
pub fn nm_md_from_reference<G: Genome + ?Sized>(
    cigar: &[Run],
    sequence: &str,
    contig: &str,
    start: usize,
    genome: &G,
) -> Result<(usize, String), AlignmentError> {
    let read = sequence.as_bytes();
    if read_len(cigar) != read.len() {
        return Err(AlignmentError::MalformedInput { field: "SEQ".to_string(), value: sequence.to_string() })
    }

    let mut nm: usize = 0;
    let mut md = String::from(MD_PREFIX);
    let mut matched: usize = 0;

    let mut ref_pos = start;
    let mut read_pos: usize = 0;

    for run in cigar.iter().filter(|run| run.len > 0) {
        match run.kind {
            OpKind::Match | OpKind::Mismatch => {
                let reference = fetch(genome, contig, ref_pos, run.len)?;
                for (read_base, ref_base) in read[read_pos..(read_pos + run.len)].iter().zip(reference.iter()) {
                    if run.kind == OpKind::Match && read_base.eq_ignore_ascii_case(ref_base) {
                        matched += 1;
                    } else {
                        md += &matched.to_string();
                        md.push(ref_base.to_ascii_uppercase() as char);
                        matched = 0;
                        nm += 1;
                    }
                }
                ref_pos = ref_pos.saturating_add(run.len);
                read_pos += run.len;
            },
            OpKind::Deletion => {
                let reference = fetch(genome, contig, ref_pos, run.len)?;
                md += &matched.to_string();
                md.push('^');
                md.extend(reference.iter().map(|base| base.to_ascii_uppercase() as char));
                matched = 0;
                nm += run.len;
                ref_pos = ref_pos.saturating_add(run.len);
            },
            OpKind::Insertion => {
                nm += run.len;
                read_pos += run.len;
            },
            OpKind::SoftClip => {
                read_pos += run.len;
            },
            OpKind::Skip => {
                ref_pos = ref_pos.saturating_add(run.len);
            },
            OpKind::HardClip => (),
        }
    }
    md += &matched.to_string();

    Ok((nm, md))
}

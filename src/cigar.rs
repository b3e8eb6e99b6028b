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

//! Decoding and encoding [CIGAR](https://samtools.github.io/hts-specs/SAMv1.pdf) strings.
//!
//! A CIGAR string is a sequence of `<length><operation>` pairs. The
//! operations understood here are `M`, `I`, `D`, `N`, `S`, `H` and `X`.
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::cigar::{decode_cigar, encode_cigar, read_len, reference_len};
//! use mdcigar::{OpKind, Run};
//!
//! let runs = decode_cigar("2S5M1D3M").unwrap();
//!
//! assert_eq!(runs[0], Run::new(OpKind::SoftClip, 2));
//! assert_eq!(reference_len(&runs), 9);
//! assert_eq!(read_len(&runs), 10);
//! assert_eq!(encode_cigar(&runs), "2S5M1D3M");
//! ```
//!

use crate::AlignmentError;
use crate::OpKind;
use crate::Run;

fn malformed(cigar: &str) -> AlignmentError {
    AlignmentError::MalformedInput { field: "CIGAR".to_string(), value: cigar.to_string() }
}

/// Split a CIGAR string into [runs](Run).
///
/// Runs are returned in input order.
///
/// Terminates with [AlignmentError::MalformedInput] if digit groups and
/// operation letters do not alternate 1:1, if an operation letter is not one
/// of `MIDNSHX`, or if a length is zero.
///
pub fn decode_cigar(
    cigar: &str,
) -> Result<Vec<Run>, AlignmentError> {
    let mut runs: Vec<Run> = Vec::new();
    let mut digits: usize = 0;
    let mut len: usize = 0;

    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            len = len.checked_mul(10)
                .and_then(|x| x.checked_add(digit as usize))
                .ok_or_else(|| malformed(cigar))?;
            digits += 1;
        } else {
            let kind = OpKind::from_cigar_char(c).ok_or_else(|| malformed(cigar))?;
            if digits == 0 || len == 0 {
                return Err(malformed(cigar))
            }
            runs.push(Run::new(kind, len));
            digits = 0;
            len = 0;
        }
    }

    // Trailing digits or an empty string
    if digits > 0 || runs.is_empty() {
        return Err(malformed(cigar))
    }

    Ok(runs)
}

/// Format [runs](Run) back into a CIGAR string.
pub fn encode_cigar(
    runs: &[Run],
) -> String {
    runs.iter().map(|run| run.to_string()).collect::<String>()
}

/// Number of reference bases covered by `runs`.
///
/// Counts matches, mismatches, deletions and intron skips.
pub fn reference_len(
    runs: &[Run],
) -> usize {
    runs.iter().filter(|run| run.kind.consumes_reference()).map(|run| run.len).sum()
}

/// Number of bases of the stored read sequence covered by `runs`.
///
/// Hard clipped bases are not part of the stored sequence and are not counted.
pub fn read_len(
    runs: &[Run],
) -> usize {
    runs.iter().filter(|run| run.kind.consumes_read()).map(|run| run.len).sum()
}

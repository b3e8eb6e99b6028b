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

//! Decoding the MD tag.
//!
//! The MD tag lists the reference bases at mismatching and deleted positions
//! of an alignment, eg. `MD:Z:5A0C3^GT10`. Decoding produces [runs](Run) over
//! the restricted alphabet {[Match](OpKind::Match),
//! [Mismatch](OpKind::Mismatch), [Deletion](OpKind::Deletion)}.
//!
//! Zero-length match runs such as the `0` in `A0C` are kept in the output.
//! They mark the boundary between two tokens and
//! [merge](crate::merge::merge) depends on them being present.
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::md::decode_md;
//! use mdcigar::{OpKind, Run};
//!
//! let runs = decode_md("MD:Z:5A0C3^GT10").unwrap();
//!
//! assert_eq!(runs, vec![
//!     Run::new(OpKind::Match, 5),
//!     Run::new(OpKind::Mismatch, 1),
//!     Run::new(OpKind::Match, 0),
//!     Run::new(OpKind::Mismatch, 1),
//!     Run::new(OpKind::Match, 3),
//!     Run::new(OpKind::Deletion, 2),
//!     Run::new(OpKind::Match, 10),
//! ]);
//! ```
//!

use crate::AlignmentError;
use crate::OpKind;
use crate::Run;

/// Prefix of an MD optional field.
pub const MD_PREFIX: &str = "MD:Z:";

// IUPAC nucleotide codes
const REFERENCE_BASES: &[u8] = b"ACGTUNRYKMSWBDHV";

fn is_reference_base(c: char) -> bool {
    c.is_ascii() && REFERENCE_BASES.contains(&(c.to_ascii_uppercase() as u8))
}

/// Split an MD field into [runs](Run).
///
/// `md` is the whole optional field including the `MD:Z:` prefix.
///
/// Digit tokens become match runs of the given length (including 0).
/// Tokens starting with `^` become deletion runs of the number of bases after
/// the caret. Other tokens become mismatch runs with one base per mismatch.
///
/// Terminates with [AlignmentError::MalformedInput] if the prefix is missing,
/// the value is empty, or the value contains anything besides digits, `^`
/// starting a token, and reference bases.
///
pub fn decode_md(
    md: &str,
) -> Result<Vec<Run>, AlignmentError> {
    let malformed = || AlignmentError::MalformedInput { field: "MD".to_string(), value: md.to_string() };

    let value = md.strip_prefix(MD_PREFIX).ok_or_else(malformed)?;
    if value.is_empty() {
        return Err(malformed())
    }

    let mut runs: Vec<Run> = Vec::new();
    let mut chars = value.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut len: usize = 0;
            while let Some(digit) = chars.peek().and_then(|x| x.to_digit(10)) {
                len = len.checked_mul(10)
                    .and_then(|x| x.checked_add(digit as usize))
                    .ok_or_else(malformed)?;
                chars.next();
            }
            runs.push(Run::new(OpKind::Match, len));
        } else {
            let is_deletion = c == '^';
            if is_deletion {
                chars.next();
            }
            let mut len: usize = 0;
            while let Some(&base) = chars.peek() {
                if base.is_ascii_digit() {
                    break
                }
                if !is_reference_base(base) {
                    return Err(malformed())
                }
                len += 1;
                chars.next();
            }
            if len == 0 {
                return Err(malformed())
            }
            let kind = if is_deletion { OpKind::Deletion } else { OpKind::Mismatch };
            runs.push(Run::new(kind, len));
        }
    }

    Ok(runs)
}

/// Number of reference bases described by decoded MD runs.
pub fn reference_len(
    runs: &[Run],
) -> usize {
    runs.iter().map(|run| run.len).sum()
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn decode_md_matches_only() {
        use crate::{OpKind, Run};
        use super::decode_md;

        let got = decode_md("MD:Z:151").unwrap();
        let expected = vec![Run::new(OpKind::Match, 151)];

        assert_eq!(got, expected);
    }

    #[test]
    fn decode_md_deletion() {
        use crate::{OpKind, Run};
        use super::decode_md;

        let got = decode_md("MD:Z:5^C5").unwrap();
        let expected = vec![
            Run::new(OpKind::Match, 5),
            Run::new(OpKind::Deletion, 1),
            Run::new(OpKind::Match, 5),
        ];

        assert_eq!(got, expected);
    }

    #[test]
    fn decode_md_keeps_zero_length_placeholders() {
        use crate::{OpKind, Run};
        use super::decode_md;

        let got = decode_md("MD:Z:0A0^TT0C4").unwrap();
        let expected = vec![
            Run::new(OpKind::Match, 0),
            Run::new(OpKind::Mismatch, 1),
            Run::new(OpKind::Match, 0),
            Run::new(OpKind::Deletion, 2),
            Run::new(OpKind::Match, 0),
            Run::new(OpKind::Mismatch, 1),
            Run::new(OpKind::Match, 4),
        ];

        assert_eq!(got, expected);
    }

    #[test]
    fn decode_md_adjacent_mismatches_form_one_run() {
        use crate::{OpKind, Run};
        use super::decode_md;

        let got = decode_md("MD:Z:3ACg2").unwrap();
        let expected = vec![
            Run::new(OpKind::Match, 3),
            Run::new(OpKind::Mismatch, 3),
            Run::new(OpKind::Match, 2),
        ];

        assert_eq!(got, expected);
    }

    #[test]
    fn decode_md_rejects_missing_prefix() {
        use crate::AlignmentError;
        use super::decode_md;

        let got = decode_md("5^C5").unwrap_err();
        let expected = AlignmentError::MalformedInput { field: "MD".to_string(), value: "5^C5".to_string() };

        assert_eq!(got, expected);
    }

    #[test]
    fn decode_md_rejects_bad_characters() {
        use super::decode_md;

        assert!(decode_md("MD:Z:5*5").is_err());
        assert!(decode_md("MD:Z:5A^C5").is_err());
        assert!(decode_md("MD:Z:5^5").is_err());
        assert!(decode_md("MD:Z:").is_err());
        assert!(decode_md("NM:i:5").is_err());
    }

    #[test]
    fn reference_len_counts_all_runs() {
        use super::{decode_md, reference_len};

        let runs = decode_md("MD:Z:5A0C3^GT10").unwrap();

        assert_eq!(reference_len(&runs), 5 + 1 + 1 + 3 + 2 + 10);
    }
}

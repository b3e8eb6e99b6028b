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

//! Optional fields of a SAM record.
//!
//! Fields are identified by their two-letter tag. NM, MD, jM and jI are
//! parsed into their own variants and all other fields are kept as raw text
//! in [OptionalField::Other].
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::tags::OptionalField;
//!
//! let nm = OptionalField::parse("NM:i:3").unwrap();
//! let jm = OptionalField::parse("jM:B:c,22,-1").unwrap();
//! let other = OptionalField::parse("XS:A:+").unwrap();
//!
//! assert_eq!(nm, OptionalField::EditDistance(3));
//! assert_eq!(jm, OptionalField::JunctionMotifs(vec![22, -1]));
//! assert_eq!(other.to_string(), "XS:A:+");
//! ```
//!

use crate::md::decode_md;
use crate::AlignmentError;

pub const NM_PREFIX: &str = "NM:i:";
pub const JM_PREFIX: &str = "jM:B:c,";
pub const JI_PREFIX: &str = "jI:B:i,";

/// Motif code of a record without splice junctions.
pub const NO_JUNCTIONS: i32 = -1;

/// A parsed optional field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OptionalField {
    /// NM: edit distance to the reference.
    EditDistance(usize),
    /// MD: the whole field including the `MD:Z:` prefix.
    MismatchDescriptor(String),
    /// jM: motif codes of the splice junctions.
    JunctionMotifs(Vec<i32>),
    /// jI: start and end of every intron, flattened.
    IntronBounds(Vec<i64>),
    /// Any other field, verbatim.
    Other(String),
}

fn parse_list<T: std::str::FromStr>(
    field: &str,
    raw: &str,
    prefix: &str,
) -> Result<Vec<T>, AlignmentError> {
    let malformed = || AlignmentError::MalformedInput { field: field.to_string(), value: raw.to_string() };
    let values = raw.strip_prefix(prefix).ok_or_else(malformed)?;
    values.split(',').map(|x| x.parse::<T>().map_err(|_| malformed())).collect()
}

fn join_list<T: std::fmt::Display>(
    values: &[T],
) -> String {
    values.iter().map(|x| x.to_string()).collect::<Vec<String>>().join(",")
}

impl OptionalField {
    /// Parse a `TAG:TYPE:VALUE` field.
    ///
    /// Terminates with [AlignmentError::MalformedInput] if the field has one
    /// of the recognized tags but its type or value is invalid.
    ///
    pub fn parse(
        raw: &str,
    ) -> Result<Self, AlignmentError> {
        match raw.get(0..2) {
            Some("NM") => {
                let nm = raw.strip_prefix(NM_PREFIX)
                    .and_then(|x| x.parse::<usize>().ok())
                    .ok_or_else(|| AlignmentError::MalformedInput { field: "NM".to_string(), value: raw.to_string() })?;
                Ok(OptionalField::EditDistance(nm))
            },
            Some("MD") => {
                decode_md(raw)?;
                Ok(OptionalField::MismatchDescriptor(raw.to_string()))
            },
            Some("jM") => Ok(OptionalField::JunctionMotifs(parse_list::<i32>("jM", raw, JM_PREFIX)?)),
            Some("jI") => Ok(OptionalField::IntronBounds(parse_list::<i64>("jI", raw, JI_PREFIX)?)),
            _ => Ok(OptionalField::Other(raw.to_string())),
        }
    }

    /// True for a jM field that marks a record without splice junctions.
    pub fn is_junction_sentinel(
        &self,
    ) -> bool {
        matches!(self, OptionalField::JunctionMotifs(motifs) if motifs.contains(&NO_JUNCTIONS))
    }
}

impl std::fmt::Display for OptionalField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OptionalField::EditDistance(nm) => write!(f, "{}{}", NM_PREFIX, nm),
            OptionalField::MismatchDescriptor(md) => write!(f, "{}", md),
            OptionalField::JunctionMotifs(motifs) => write!(f, "{}{}", JM_PREFIX, join_list(motifs)),
            OptionalField::IntronBounds(bounds) => write!(f, "{}{}", JI_PREFIX, join_list(bounds)),
            OptionalField::Other(raw) => write!(f, "{}", raw),
        }
    }
}

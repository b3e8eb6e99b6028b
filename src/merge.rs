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

//! Merge decoded CIGAR and MD runs into a single operation stream.
//!
//! CIGAR knows about insertions, clipping and intron skips but uses `M` for
//! both matches and mismatches. MD knows which aligned bases mismatch but
//! nothing about bases that are absent from the reference. Neither is enough
//! on its own to say what happens at every base of the alignment.
//!
//! The merge walks both run sequences with one cursor each. Runs that only
//! CIGAR can express are copied as is. For the rest, the shorter of the two
//! current runs is emitted and subtracted from the longer one, so the output
//! is split at every breakpoint of either input.
//!
//! The cursor state is kept in [MergeState] and advanced one emission at a
//! time by [step], which makes it possible to test the sweep without going
//! through [merge].
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::cigar::decode_cigar;
//! use mdcigar::md::decode_md;
//! use mdcigar::merge::{edit_distance, merge};
//! use mdcigar::{OpKind, Run};
//!
//! let cigar = decode_cigar("3M1I3M").unwrap();
//! let md = decode_md("MD:Z:2A3").unwrap();
//!
//! let unified = merge(&cigar, &md).unwrap();
//!
//! assert_eq!(unified, vec![
//!     Run::new(OpKind::Match, 2),
//!     Run::new(OpKind::Mismatch, 1),
//!     Run::new(OpKind::Insertion, 1),
//!     Run::new(OpKind::Match, 3),
//! ]);
//! assert_eq!(edit_distance(&unified), 2);
//! ```
//!

use crate::cigar::encode_cigar;
use crate::AlignmentError;
use crate::OpKind;
use crate::Run;

/// Position of the merge in both inputs.
///
/// `cigar_remaining` and `md_remaining` hold the unconsumed length of the
/// runs at `cigar_index` and `md_index`. They are 0 once the index is past
/// the end of its input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MergeState {
    pub cigar_index: usize,
    pub cigar_remaining: usize,
    pub md_index: usize,
    pub md_remaining: usize,
}

impl MergeState {
    /// Start of a merge over `cigar` and `md`.
    pub fn new(
        cigar: &[Run],
        md: &[Run],
    ) -> Self {
        MergeState {
            cigar_index: 0,
            cigar_remaining: cigar.first().map_or(0, |run| run.len),
            md_index: 0,
            md_remaining: md.first().map_or(0, |run| run.len),
        }
    }

    fn next_cigar(
        self,
        cigar: &[Run],
    ) -> Self {
        let cigar_index = self.cigar_index + 1;
        let cigar_remaining = cigar.get(cigar_index).map_or(0, |run| run.len);
        MergeState { cigar_index, cigar_remaining, ..self }
    }

    fn next_md(
        self,
        md: &[Run],
    ) -> Self {
        let md_index = self.md_index + 1;
        let md_remaining = md.get(md_index).map_or(0, |run| run.len);
        MergeState { md_index, md_remaining, ..self }
    }
}

/// CIGAR operations that have no counterpart in MD.
fn is_cigar_only(
    kind: OpKind,
) -> bool {
    matches!(kind, OpKind::Insertion | OpKind::SoftClip | OpKind::HardClip | OpKind::Skip)
}

/// Operation for bases covered by both a CIGAR and an MD run.
///
/// MD decides between match and mismatch inside a CIGAR `M`. Returns None if
/// the two runs cannot describe the same bases.
fn unified_kind(
    cigar_kind: OpKind,
    md_kind: OpKind,
) -> Option<OpKind> {
    match (cigar_kind, md_kind) {
        (OpKind::Match, OpKind::Match) => Some(OpKind::Match),
        (OpKind::Match, OpKind::Mismatch) => Some(OpKind::Mismatch),
        (OpKind::Mismatch, OpKind::Mismatch) => Some(OpKind::Mismatch),
        (OpKind::Deletion, OpKind::Deletion) => Some(OpKind::Deletion),
        _ => None,
    }
}

fn inconsistency(
    cigar: &[Run],
    md: &[Run],
) -> AlignmentError {
    AlignmentError::AlignmentInconsistency { cigar: encode_cigar(cigar), md: encode_cigar(md) }
}

/// Advance the merge by one step.
///
/// Returns the next state and the run emitted by this step, if any. Steps
/// that only consume a zero-length run do not emit anything. Returns None
/// when both inputs have been consumed.
///
/// Terminates with [AlignmentError::AlignmentInconsistency] if one input is
/// consumed while the other still has bases left, or if the current runs
/// disagree on the kind of operation.
///
pub fn step(
    state: MergeState,
    cigar: &[Run],
    md: &[Run],
) -> Result<Option<(MergeState, Option<Run>)>, AlignmentError> {
    let cigar_run = cigar.get(state.cigar_index);
    let md_run = md.get(state.md_index);

    match (cigar_run, md_run) {
        (None, None) => Ok(None),

        (Some(_), _) if state.cigar_remaining == 0 => Ok(Some((state.next_cigar(cigar), None))),

        (Some(run), _) if is_cigar_only(run.kind) => {
            let emitted = Run::new(run.kind, state.cigar_remaining);
            Ok(Some((state.next_cigar(cigar), Some(emitted))))
        },

        // Zero-length MD placeholders
        (_, Some(_)) if state.md_remaining == 0 => Ok(Some((state.next_md(md), None))),

        (Some(_), None) | (None, Some(_)) => Err(inconsistency(cigar, md)),

        (Some(cigar_op), Some(md_op)) => {
            let kind = unified_kind(cigar_op.kind, md_op.kind).ok_or_else(|| inconsistency(cigar, md))?;

            if state.cigar_remaining < state.md_remaining {
                let emitted = Run::new(kind, state.cigar_remaining);
                let next = MergeState { md_remaining: state.md_remaining - state.cigar_remaining, ..state };
                Ok(Some((next.next_cigar(cigar), Some(emitted))))
            } else if state.cigar_remaining > state.md_remaining {
                let emitted = Run::new(kind, state.md_remaining);
                let next = MergeState { cigar_remaining: state.cigar_remaining - state.md_remaining, ..state };
                Ok(Some((next.next_md(md), Some(emitted))))
            } else {
                let emitted = Run::new(kind, state.md_remaining);
                Ok(Some((state.next_cigar(cigar).next_md(md), Some(emitted))))
            }
        },
    }
}

/// Merge decoded CIGAR and MD runs.
///
/// The result covers every read and reference base once. Matches and
/// mismatches inside CIGAR `M` operations are resolved from MD, and
/// insertions, clipping and intron skips are copied from CIGAR.
///
/// Terminates with [AlignmentError::AlignmentInconsistency] if the inputs do
/// not describe the same alignment.
///
pub fn merge(
    cigar: &[Run],
    md: &[Run],
) -> Result<Vec<Run>, AlignmentError> {
    let mut unified: Vec<Run> = Vec::with_capacity(cigar.len() + md.len());
    let mut state = MergeState::new(cigar, md);

    while let Some((next, emitted)) = step(state, cigar, md)? {
        if let Some(run) = emitted {
            unified.push(run);
        }
        state = next;
    }

    Ok(unified)
}

/// Edit distance of a merged operation stream.
///
/// Sum of mismatched, inserted and deleted bases.
pub fn edit_distance(
    runs: &[Run],
) -> usize {
    runs.iter()
        .filter(|run| matches!(run.kind, OpKind::Mismatch | OpKind::Insertion | OpKind::Deletion))
        .map(|run| run.len)
        .sum()
}

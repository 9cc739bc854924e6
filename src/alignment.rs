//! Alignment results and edit-script decoding.
//!
//! The engine reports one raw byte per alignment operation; this module
//! decodes a slot's byte range into a coalesced run-length edit script and
//! assembles the caller-facing [`AlignmentResult`]. Decoding is a pure
//! function of the input bytes, so a batch can be decoded slot-parallel.

use crate::engine::{RawAlignmentRecord, RawBatch};
use crate::error::{GasalError, Result};
use rayon::prelude::*;
use std::fmt;

/// One alignment operation, in the engine's code space.
///
/// The engine encodes each operation unit in the low two bits of a byte:
/// 0 match, 1 mismatch, 2 deletion (base in target only), 3 insertion
/// (base in query only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Match,
    Mismatch,
    Insertion,
    Deletion,
}

impl EditOp {
    /// Decodes the low two bits of a raw edit-script byte.
    #[inline]
    pub fn from_raw(byte: u8) -> EditOp {
        match byte & 0x3 {
            0 => EditOp::Match,
            1 => EditOp::Mismatch,
            2 => EditOp::Deletion,
            _ => EditOp::Insertion,
        }
    }

    /// Extended-CIGAR operator character.
    pub fn code(self) -> char {
        match self {
            EditOp::Match => '=',
            EditOp::Mismatch => 'X',
            EditOp::Insertion => 'I',
            EditOp::Deletion => 'D',
        }
    }

    /// True if the operation consumes a query symbol.
    pub fn consumes_query(self) -> bool {
        !matches!(self, EditOp::Deletion)
    }

    /// True if the operation consumes a target symbol.
    pub fn consumes_target(self) -> bool {
        !matches!(self, EditOp::Insertion)
    }
}

/// Run-length-encoded edit script with adjacent identical operations
/// coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditScript {
    runs: Vec<(EditOp, u32)>,
}

impl EditScript {
    /// Decodes a raw byte range, one operation unit per byte, coalescing
    /// consecutive identical operations into runs.
    pub fn from_raw(bytes: &[u8]) -> EditScript {
        EditScript {
            runs: coalesce(bytes.iter().map(|&b| (EditOp::from_raw(b), 1))),
        }
    }

    /// Builds a script from (operation, run-length) pairs, coalescing any
    /// adjacent runs of the same operation.
    pub fn from_runs(runs: impl IntoIterator<Item = (EditOp, u32)>) -> EditScript {
        EditScript {
            runs: coalesce(runs),
        }
    }

    /// The coalesced (operation, run-length) pairs.
    pub fn runs(&self) -> &[(EditOp, u32)] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of query symbols the script consumes.
    pub fn query_span(&self) -> u32 {
        self.runs
            .iter()
            .filter(|(op, _)| op.consumes_query())
            .map(|&(_, n)| n)
            .sum()
    }

    /// Number of target symbols the script consumes.
    pub fn target_span(&self) -> u32 {
        self.runs
            .iter()
            .filter(|(op, _)| op.consumes_target())
            .map(|&(_, n)| n)
            .sum()
    }

    /// Total matching bases.
    pub fn matches(&self) -> u32 {
        self.op_total(EditOp::Match)
    }

    /// Total mismatching bases.
    pub fn mismatches(&self) -> u32 {
        self.op_total(EditOp::Mismatch)
    }

    /// Total gapped bases (insertions plus deletions).
    pub fn gap_len(&self) -> u32 {
        self.op_total(EditOp::Insertion) + self.op_total(EditOp::Deletion)
    }

    fn op_total(&self, which: EditOp) -> u32 {
        self.runs
            .iter()
            .filter(|&&(op, _)| op == which)
            .map(|&(_, n)| n)
            .sum()
    }

    /// Formats the script as an extended CIGAR string ('=' and 'X').
    pub fn to_cigar(&self) -> String {
        self.runs
            .iter()
            .map(|&(op, n)| format!("{}{}", n, op.code()))
            .collect()
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cigar())
    }
}

/// Merges adjacent runs of the same operation. Idempotent: coalescing an
/// already-coalesced run list returns it unchanged. Zero-length runs are
/// dropped.
fn coalesce(runs: impl IntoIterator<Item = (EditOp, u32)>) -> Vec<(EditOp, u32)> {
    let mut out: Vec<(EditOp, u32)> = Vec::new();
    for (op, n) in runs {
        if n == 0 {
            continue;
        }
        match out.last_mut() {
            Some((last, count)) if *last == op => *count += n,
            _ => out.push((op, n)),
        }
    }
    out
}

/// One alignment, decoded and owned by the caller.
///
/// Coordinates are 0-based inclusive, matching the engine convention: an
/// alignment covering the first five query symbols reports
/// `query_start = 0, query_end = 4`. An empty alignment reports
/// `end = start - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    /// Alignment score under the session's scoring configuration
    pub score: i32,

    /// First aligned query symbol (0-based)
    pub query_start: i32,

    /// Last aligned query symbol (0-based, inclusive)
    pub query_end: i32,

    /// First aligned target symbol (0-based)
    pub target_start: i32,

    /// Last aligned target symbol (0-based, inclusive)
    pub target_end: i32,

    /// Coalesced edit script
    pub edit_script: EditScript,
}

impl AlignmentResult {
    /// Identity fraction: matches / (matches + mismatches + gaps).
    pub fn identity(&self) -> f64 {
        let total = self.edit_script.matches()
            + self.edit_script.mismatches()
            + self.edit_script.gap_len();
        if total > 0 {
            self.edit_script.matches() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Extended CIGAR string for this alignment.
    pub fn cigar(&self) -> String {
        self.edit_script.to_cigar()
    }
}

impl fmt::Display for AlignmentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score={} q:[{},{}] t:[{},{}] {}",
            self.score,
            self.query_start,
            self.query_end,
            self.target_start,
            self.target_end,
            self.edit_script
        )
    }
}

/// Decodes one slot's raw record against the cycle's shared edit-script
/// buffer. `slot` labels decode failures.
///
/// A record whose claimed operation count extends past the byte range is a
/// [`GasalError::TruncatedEditScript`]; nothing is silently truncated.
pub fn decode_record(
    slot: usize,
    record: &RawAlignmentRecord,
    edit_bytes: &[u8],
) -> Result<AlignmentResult> {
    let start = record.edit_offset as usize;
    let claimed = record.n_ops as usize;
    let available = edit_bytes.len().saturating_sub(start);
    if claimed > available {
        return Err(GasalError::TruncatedEditScript {
            slot,
            claimed,
            available,
        });
    }

    Ok(AlignmentResult {
        score: record.score,
        query_start: record.query_start,
        query_end: record.query_end,
        target_start: record.target_start,
        target_end: record.target_end,
        edit_script: EditScript::from_raw(&edit_bytes[start..start + claimed]),
    })
}

/// Decodes a full collected batch, slot-parallel.
///
/// A failing slot does not abort the rest: each slot carries its own
/// result, index-aligned with the records.
pub fn decode_batch(batch: &RawBatch) -> Vec<Result<AlignmentResult>> {
    batch
        .records
        .par_iter()
        .enumerate()
        .map(|(slot, record)| decode_record(slot, record, &batch.edit_bytes))
        .collect()
}

//! Host-side batch staging.
//!
//! The batch buffer owns the fixed-capacity staging arrays for one cycle of
//! sequence pairs: a shared packed payload per role plus parallel offset
//! and true-length arrays. It is the only component that computes transfer
//! rounding — every payload is appended padded to an 8-byte boundary, so
//! the buffer lengths handed to the engine are 8-byte multiples by
//! construction and an unpadded submission cannot be expressed.

use crate::error::{GasalError, Result};
use crate::sequence::{encode, transfer_bytes, Role, Sequence};

/// Staging buffers for one batch of sequence pairs.
///
/// Capacity is fixed at construction; payload storage is reused across
/// cycles (cleared, not shrunk). Slot `i` of every parallel array belongs
/// to the `i`-th filled pair.
#[derive(Debug)]
pub struct BatchBuffer {
    max_batch: usize,
    max_query_len: usize,
    max_target_len: usize,

    query_data: Vec<u8>,
    target_data: Vec<u8>,
    query_offsets: Vec<u32>,
    target_offsets: Vec<u32>,
    query_lens: Vec<u32>,
    target_lens: Vec<u32>,

    current_n_alns: usize,
}

/// Borrowed view of one staged cycle, in the shape the engine submits.
///
/// `query_data.len()` and `target_data.len()` are the transfer byte counts;
/// the manager guarantees both are multiples of 8.
#[derive(Debug, Clone, Copy)]
pub struct BatchView<'a> {
    pub query_data: &'a [u8],
    pub target_data: &'a [u8],
    pub query_offsets: &'a [u32],
    pub target_offsets: &'a [u32],
    /// True symbol lengths, not padded byte counts
    pub query_lens: &'a [u32],
    pub target_lens: &'a [u32],
    pub n_alns: usize,
}

impl BatchBuffer {
    pub fn new(max_batch: usize, max_query_len: usize, max_target_len: usize) -> Self {
        BatchBuffer {
            max_batch,
            max_query_len,
            max_target_len,
            query_data: Vec::new(),
            target_data: Vec::new(),
            query_offsets: Vec::with_capacity(max_batch),
            target_offsets: Vec::with_capacity(max_batch),
            query_lens: Vec::with_capacity(max_batch),
            target_lens: Vec::with_capacity(max_batch),
            current_n_alns: 0,
        }
    }

    /// Number of fully populated slots in the current cycle.
    pub fn current_n_alns(&self) -> usize {
        self.current_n_alns
    }

    /// Maximum length accepted for `role`.
    pub fn max_len(&self, role: Role) -> usize {
        match role {
            Role::Query => self.max_query_len,
            Role::Target => self.max_target_len,
        }
    }

    /// Starts a new cycle: slot count drops to zero and all staged payload
    /// is logically invalidated (storage is kept for reuse).
    pub fn reset(&mut self) {
        self.query_data.clear();
        self.target_data.clear();
        self.query_offsets.clear();
        self.target_offsets.clear();
        self.query_lens.clear();
        self.target_lens.clear();
        self.current_n_alns = 0;
    }

    /// Checks that a sequence of `len` symbols fits `role`'s configured
    /// bound, without committing anything. `slot` only labels the error.
    pub fn check_capacity(&self, role: Role, slot: usize, len: usize) -> Result<()> {
        let max = self.max_len(role);
        if len > max {
            return Err(GasalError::SequenceTooLong {
                role,
                slot,
                len,
                max,
            });
        }
        Ok(())
    }

    /// Appends a packed sequence to `role`'s shared payload and records its
    /// offset and true symbol length.
    ///
    /// Offset and length are committed together or not at all: every check
    /// runs before the first write. Returns the byte offset at which the
    /// payload was placed (always a multiple of 8).
    pub fn fill(&mut self, role: Role, seq: &Sequence) -> Result<u32> {
        let slot = self.slot_count(role);
        if slot >= self.max_batch {
            return Err(GasalError::BatchFull {
                max: self.max_batch,
            });
        }
        self.check_capacity(role, slot, seq.len())?;

        let packed = encode(seq);
        let padded = transfer_bytes(seq.len());
        let (data, offsets, lens) = match role {
            Role::Query => (
                &mut self.query_data,
                &mut self.query_offsets,
                &mut self.query_lens,
            ),
            Role::Target => (
                &mut self.target_data,
                &mut self.target_offsets,
                &mut self.target_lens,
            ),
        };

        let offset = data.len() as u32;
        data.extend_from_slice(packed.as_bytes());
        data.resize(offset as usize + padded, 0);
        offsets.push(offset);
        lens.push(seq.len() as u32);
        Ok(offset)
    }

    /// Marks one more pair as fully populated. Both roles of the slot must
    /// have been filled first.
    pub fn commit_slot(&mut self) {
        debug_assert!(self.query_lens.len() > self.current_n_alns);
        debug_assert!(self.target_lens.len() > self.current_n_alns);
        self.current_n_alns += 1;
    }

    /// The staged cycle as the engine consumes it.
    pub fn view(&self) -> BatchView<'_> {
        BatchView {
            query_data: &self.query_data,
            target_data: &self.target_data,
            query_offsets: &self.query_offsets,
            target_offsets: &self.target_offsets,
            query_lens: &self.query_lens,
            target_lens: &self.target_lens,
            n_alns: self.current_n_alns,
        }
    }

    fn slot_count(&self, role: Role) -> usize {
        match role {
            Role::Query => self.query_lens.len(),
            Role::Target => self.target_lens.len(),
        }
    }
}

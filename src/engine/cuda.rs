//! FFI bindings to the native GASAL2 shim.
//!
//! This module provides low-level unsafe bindings to the C shim shipped
//! with libgasal, wrapped by [`CudaEngine`] which implements the safe
//! engine contract. Only compiled with the `cuda` feature; build.rs emits
//! the link directives.
//!
//! Shim conventions:
//! - `gasal_shim_poll` returns -1 while the batch is still running, 0 on
//!   completion, and a positive CUDA error code on device failure.
//! - Fill/submit return 0 (or a byte offset) on success and a negative
//!   value on failure.
//! - Result arrays returned by `gasal_shim_read` alias the shim's host
//!   buffers and are only valid until the next submission; we copy them
//!   out immediately.

use crate::batch::BatchView;
use crate::config::{AlignmentMode, ScoringConfig};
use crate::engine::{AlignmentEngine, EngineLimits, PollStatus, RawAlignmentRecord, RawBatch};
use crate::error::{GasalError, Result};
use crate::sequence::transfer_bytes;
use libc::{c_int, c_uint};
use std::ptr;

/// Opaque shim context: GPU storage vector, stream pair, scoring tables.
#[repr(C)]
pub struct ShimContext {
    _private: [u8; 0],
}

/// Scoring table passed to the device at context creation.
#[repr(C)]
struct ShimScores {
    match_score: c_int,
    mismatch_score: c_int,
    gap_open: c_int,
    gap_extend: c_int,
    /// Meaningful only when `has_n_penalty` is nonzero
    n_penalty: c_int,
    has_n_penalty: c_int,
    n_code: u8,
}

/// Host-side result arrays exposed by the shim, indexed by slot.
#[repr(C)]
struct ShimResults {
    scores: *const c_int,
    query_start: *const c_int,
    query_end: *const c_int,
    target_start: *const c_int,
    target_end: *const c_int,
    n_ops: *const c_uint,
    edit_offsets: *const c_uint,
    edit_bytes: *const u8,
    edit_bytes_len: c_uint,
}

const ROLE_QUERY: c_int = 0;
const ROLE_TARGET: c_int = 1;

extern "C" {
    fn gasal_shim_create(
        scores: *const ShimScores,
        query_head_free: c_int,
        query_tail_free: c_int,
        max_query_len: c_uint,
        max_target_len: c_uint,
        max_batch: c_uint,
    ) -> *mut ShimContext;

    fn gasal_shim_fill(
        ctx: *mut ShimContext,
        slot: c_uint,
        role: c_int,
        packed: *const u8,
        packed_bytes: c_uint,
        symbol_len: c_uint,
    ) -> c_int;

    fn gasal_shim_submit(
        ctx: *mut ShimContext,
        query_batch_bytes: c_uint,
        target_batch_bytes: c_uint,
        n_alns: c_uint,
    ) -> c_int;

    fn gasal_shim_poll(ctx: *mut ShimContext) -> c_int;

    fn gasal_shim_read(ctx: *mut ShimContext, out: *mut ShimResults) -> c_int;

    fn gasal_shim_destroy(ctx: *mut ShimContext);
}

/// GASAL2 device backend.
///
/// Owns the shim context (GPU storage, ping-pong stream pair) and releases
/// it exactly once on drop, pending work included.
pub struct CudaEngine {
    ctx: *mut ShimContext,
    n_alns: usize,
}

// The context is only ever driven through &mut self from one session.
unsafe impl Send for CudaEngine {}

impl CudaEngine {
    pub fn create(
        scoring: &ScoringConfig,
        mode: &AlignmentMode,
        limits: &EngineLimits,
    ) -> Result<Self> {
        let scores = ShimScores {
            match_score: scoring.match_score,
            mismatch_score: scoring.mismatch_score,
            gap_open: scoring.gap_open,
            gap_extend: scoring.gap_extend,
            n_penalty: scoring.n_penalty.unwrap_or(0),
            has_n_penalty: scoring.n_penalty.is_some() as c_int,
            n_code: scoring.n_code,
        };

        let ctx = unsafe {
            gasal_shim_create(
                &scores,
                mode.query_free.head_free() as c_int,
                mode.query_free.tail_free() as c_int,
                limits.max_query_len as c_uint,
                limits.max_target_len as c_uint,
                limits.max_batch as c_uint,
            )
        };
        if ctx.is_null() {
            return Err(GasalError::InvalidConfig(
                "GASAL2 context allocation failed (device memory?)".to_string(),
            ));
        }
        Ok(CudaEngine { ctx, n_alns: 0 })
    }
}

impl AlignmentEngine for CudaEngine {
    fn submit(&mut self, batch: BatchView<'_>) -> Result<()> {
        for slot in 0..batch.n_alns {
            let q_off = batch.query_offsets[slot] as usize;
            let t_off = batch.target_offsets[slot] as usize;
            let q_len = batch.query_lens[slot] as usize;
            let t_len = batch.target_lens[slot] as usize;
            let q_bytes = transfer_bytes(q_len);
            let t_bytes = transfer_bytes(t_len);

            let rc = unsafe {
                gasal_shim_fill(
                    self.ctx,
                    slot as c_uint,
                    ROLE_QUERY,
                    batch.query_data[q_off..q_off + q_bytes].as_ptr(),
                    q_bytes as c_uint,
                    q_len as c_uint,
                )
            };
            if rc < 0 {
                return Err(GasalError::Engine(format!(
                    "fill failed for query slot {slot}: rc={rc}"
                )));
            }
            let rc = unsafe {
                gasal_shim_fill(
                    self.ctx,
                    slot as c_uint,
                    ROLE_TARGET,
                    batch.target_data[t_off..t_off + t_bytes].as_ptr(),
                    t_bytes as c_uint,
                    t_len as c_uint,
                )
            };
            if rc < 0 {
                return Err(GasalError::Engine(format!(
                    "fill failed for target slot {slot}: rc={rc}"
                )));
            }
        }

        let rc = unsafe {
            gasal_shim_submit(
                self.ctx,
                batch.query_data.len() as c_uint,
                batch.target_data.len() as c_uint,
                batch.n_alns as c_uint,
            )
        };
        if rc < 0 {
            return Err(GasalError::Engine(format!("async submit failed: rc={rc}")));
        }
        self.n_alns = batch.n_alns;
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        match unsafe { gasal_shim_poll(self.ctx) } {
            -1 => Ok(PollStatus::NotDone),
            0 => Ok(PollStatus::Done),
            code => Err(GasalError::Engine(format!(
                "device failure while polling: CUDA error {code}"
            ))),
        }
    }

    fn read_results(&mut self) -> Result<RawBatch> {
        let mut raw = ShimResults {
            scores: ptr::null(),
            query_start: ptr::null(),
            query_end: ptr::null(),
            target_start: ptr::null(),
            target_end: ptr::null(),
            n_ops: ptr::null(),
            edit_offsets: ptr::null(),
            edit_bytes: ptr::null(),
            edit_bytes_len: 0,
        };
        let rc = unsafe { gasal_shim_read(self.ctx, &mut raw) };
        if rc < 0 {
            return Err(GasalError::Engine(format!("result read failed: rc={rc}")));
        }

        let n = self.n_alns;
        let mut out = RawBatch::default();
        unsafe {
            let scores = std::slice::from_raw_parts(raw.scores, n);
            let q_beg = std::slice::from_raw_parts(raw.query_start, n);
            let q_end = std::slice::from_raw_parts(raw.query_end, n);
            let t_beg = std::slice::from_raw_parts(raw.target_start, n);
            let t_end = std::slice::from_raw_parts(raw.target_end, n);
            let n_ops = std::slice::from_raw_parts(raw.n_ops, n);
            let offsets = std::slice::from_raw_parts(raw.edit_offsets, n);
            for i in 0..n {
                out.records.push(RawAlignmentRecord {
                    score: scores[i],
                    query_start: q_beg[i],
                    query_end: q_end[i],
                    target_start: t_beg[i],
                    target_end: t_end[i],
                    n_ops: n_ops[i],
                    edit_offset: offsets[i],
                });
            }
            if raw.edit_bytes_len > 0 {
                out.edit_bytes =
                    std::slice::from_raw_parts(raw.edit_bytes, raw.edit_bytes_len as usize)
                        .to_vec();
            }
        }
        self.n_alns = 0;
        Ok(out)
    }
}

impl Drop for CudaEngine {
    fn drop(&mut self) {
        unsafe {
            if !self.ctx.is_null() {
                // Abandons any in-flight batch; the shim tears down streams
                // before the storage vector.
                gasal_shim_destroy(self.ctx);
                self.ctx = ptr::null_mut();
            }
        }
    }
}

//! Compute-engine capability interface.
//!
//! The alignment kernel is an opaque collaborator behind [`AlignmentEngine`]:
//! the session drives it through submit/poll/read and never sees device
//! state. Two backends implement the contract — the host-side
//! [`reference::ReferenceEngine`] (default, deterministic) and the native
//! `cuda::CudaEngine` behind the `cuda` feature.

pub mod reference;

#[cfg(feature = "cuda")]
pub mod cuda;

use crate::batch::BatchView;
use crate::config::{AlignmentMode, ScoringConfig};
use crate::error::Result;

/// Capacity bounds an engine's device resources are sized to.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    pub max_query_len: usize,
    pub max_target_len: usize,
    pub max_batch: usize,
}

/// Non-blocking completion state of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The engine is still running; poll again
    NotDone,
    /// Results are ready to read
    Done,
}

/// Engine output for one slot.
///
/// Coordinates are 0-based inclusive, the engine's `int` convention; an
/// empty alignment reports `end = start - 1`. `edit_offset` indexes the
/// cycle's shared edit-script buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawAlignmentRecord {
    pub score: i32,
    pub query_start: i32,
    pub query_end: i32,
    pub target_start: i32,
    pub target_end: i32,
    pub n_ops: u32,
    pub edit_offset: u32,
}

/// One cycle's raw engine output: per-slot records index-aligned with fill
/// order, plus the shared edit-script byte buffer they point into.
///
/// Owned by whoever reads it; the engine's own buffers may be overwritten
/// by the next submission.
#[derive(Debug, Default)]
pub struct RawBatch {
    pub records: Vec<RawAlignmentRecord>,
    pub edit_bytes: Vec<u8>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The opaque alignment engine, reduced to the capability the session
/// needs: asynchronous submission, non-blocking completion polling, and a
/// one-shot result read per cycle.
///
/// Scoring, mode, and limits are fixed when the backend is constructed.
/// Implementations own a ping-pong pair of execution slots and alternate
/// between them per submission; the session never addresses streams
/// directly.
pub trait AlignmentEngine: Send {
    /// Queues transfer and execution for one staged batch. Never blocks.
    /// Any raw output from the previous cycle becomes invalid.
    fn submit(&mut self, batch: BatchView<'_>) -> Result<()>;

    /// Non-blocking completion check for the in-flight batch.
    fn poll(&mut self) -> Result<PollStatus>;

    /// Moves the completed cycle's output off the engine. Valid only after
    /// [`poll`](Self::poll) returns [`PollStatus::Done`].
    fn read_results(&mut self) -> Result<RawBatch>;
}

/// Builds the default backend for this build: the CUDA engine when the
/// `cuda` feature is enabled, the host reference engine otherwise.
pub fn default_engine(
    scoring: &ScoringConfig,
    mode: &AlignmentMode,
    limits: &EngineLimits,
) -> Result<Box<dyn AlignmentEngine>> {
    #[cfg(feature = "cuda")]
    {
        Ok(Box::new(cuda::CudaEngine::create(scoring, mode, limits)?))
    }
    #[cfg(not(feature = "cuda"))]
    {
        Ok(Box::new(reference::ReferenceEngine::create(
            scoring, mode, limits,
        )?))
    }
}

//! Error types for the gasal2-rs library.

use crate::sequence::Role;
use thiserror::Error;

/// Result type alias for GASAL2 operations.
pub type Result<T> = std::result::Result<T, GasalError>;

/// Errors that can occur during alignment operations.
#[derive(Error, Debug)]
pub enum GasalError {
    /// A query or target exceeds the configured maximum length
    #[error("{role} sequence in slot {slot} is {len} symbols, exceeds configured maximum of {max}")]
    SequenceTooLong {
        role: Role,
        slot: usize,
        len: usize,
        max: usize,
    },

    /// More pairs passed to a single call than the session can stage
    #[error("batch of {n} pairs exceeds configured max_batch of {max}")]
    BatchTooLarge { n: usize, max: usize },

    /// All batch slots are already populated
    #[error("batch is full: all {max} slots populated")]
    BatchFull { max: usize },

    /// Invalid configuration parameter or failed engine allocation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The compute engine reported a device-level failure
    #[error("engine error: {0}")]
    Engine(String),

    /// Raw edit script shorter than the operation count it claims
    #[error("truncated edit script in slot {slot}: {claimed} ops claimed, {available} bytes available")]
    TruncatedEditScript {
        slot: usize,
        claimed: usize,
        available: usize,
    },

    /// collect() called before poll() reported completion
    #[error("results not ready: poll() has not reported completion")]
    NotReady,

    /// submit() called while a previous batch is still live
    #[error("a batch is already in flight; collect its results before submitting another")]
    BatchInFlight,

    /// poll()/collect() called with no submitted batch
    #[error("no batch in flight")]
    NoBatchInFlight,

    /// submit() called with no staged sequence pairs
    #[error("no sequence pairs staged for submission")]
    EmptyBatch,
}

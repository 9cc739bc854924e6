//! # GASAL2-RS: Rust Bindings for the GASAL2 GPU Sequence Aligner
//!
//! This library provides safe Rust bindings around a GASAL2-style batched
//! alignment engine, enabling GPU-accelerated semi-global alignment of
//! DNA/RNA sequence pairs with full traceback.
//!
//! ## Overview
//!
//! GASAL2-RS allows you to:
//! - Align batches of (query, target) pairs in one asynchronous device
//!   submission
//! - Recover run-length edit scripts with explicit match ('=') and
//!   mismatch ('X') operators
//! - Configure scoring (match/mismatch/affine gaps, optional `N` penalty)
//!   per session
//! - Drive submission and completion explicitly (submit/poll/collect) or
//!   through blocking convenience calls
//!
//! ## Key Features
//!
//! - **Batched execution**: sequences are 2-bit packed into a shared
//!   staging buffer and shipped to the device in one transfer per role
//! - **Non-blocking completion**: `poll()` never blocks; callers choose
//!   their own cadence
//! - **Deterministic testing**: the engine is a capability interface with
//!   a host reference backend, so everything above the kernel runs and
//!   tests without a GPU
//! - **Typed failures**: capacity, configuration, decode, and engine
//!   errors are distinct; no silent wrong results
//!
//! ## Example Usage
//!
//! ```
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! use gasal2_rs::{Config, GasalAligner};
//!
//! // Session with default scoring (match 2, mismatch -3, gap 5/2)
//! let mut aligner = GasalAligner::new(Config::default())?;
//!
//! let result = aligner.align(b"AACTG", b"AACGG")?;
//! println!("score {} cigar {}", result.score, result.cigar());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is structured in several modules:
//! - `sequence`: sanitization to {A,C,G,T,N} and 2-bit packing
//! - `batch`: fixed-capacity staging buffers and transfer rounding
//! - `session`: engine resources and the submit/poll/collect cycle
//! - `alignment`: edit-script decoding and caller-facing results
//! - `engine`: the opaque compute-engine capability (reference backend by
//!   default, CUDA backend behind the `cuda` feature)
//! - `error`: error types for the library
//!
//! ## Thread Safety
//!
//! A session is driven by one logical caller at a time (`&mut self`
//! surface). Sessions are independent: each owns its engine context and
//! scoring, so different sessions can run concurrently on separate
//! threads.

pub mod alignment;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod sequence;
pub mod session;

pub use alignment::{decode_batch, decode_record, AlignmentResult, EditOp, EditScript};
pub use config::{AlignmentMode, Config, FreeEnds, ScoringConfig};
pub use error::{GasalError, Result};
pub use sequence::{sanitize, Role};
pub use session::Session;

/// Main interface to the alignment engine.
///
/// Wraps a [`Session`] with the default backend for this build and exposes
/// the blocking convenience paths. Use [`Session`] directly for explicit
/// submit/poll/collect control.
pub struct GasalAligner {
    inner: Session,
}

impl GasalAligner {
    /// Creates a new aligner with the given configuration.
    ///
    /// # Example
    /// ```
    /// # use anyhow::Result;
    /// # fn main() -> Result<()> {
    /// use gasal2_rs::{Config, GasalAligner};
    ///
    /// let config = Config::builder()
    ///     .match_score(2)
    ///     .mismatch_score(-3)
    ///     .gap_open(5)
    ///     .gap_extend(2)
    ///     .max_batch(128)
    ///     .build();
    ///
    /// let aligner = GasalAligner::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        Ok(GasalAligner {
            inner: Session::new(config)?,
        })
    }

    /// Aligns one (query, target) pair and blocks until the result is
    /// decoded.
    ///
    /// Input text is sanitized: case-insensitive {A,C,G,T,N}, anything
    /// else coerced to `N`.
    ///
    /// # Errors
    /// Returns an error if either sequence exceeds the configured bounds,
    /// the engine fails, or the edit script cannot be decoded.
    pub fn align(&mut self, query: &[u8], target: &[u8]) -> Result<AlignmentResult> {
        self.inner.align_one(query, target)
    }

    /// Aligns up to `max_batch` pairs in one device cycle, returning
    /// results in input order.
    pub fn align_batch(
        &mut self,
        pairs: &[(impl AsRef<[u8]>, impl AsRef<[u8]>)],
    ) -> Result<Vec<AlignmentResult>> {
        self.inner.align_batch(pairs)
    }

    /// The underlying session, for explicit submit/poll/collect control.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.inner
    }
}

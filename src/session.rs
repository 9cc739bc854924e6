//! Batched alignment execution sessions.
//!
//! A [`Session`] owns the engine context, the staging batch buffer, and the
//! submit/poll/collect cycle. One logical caller drives one session; the
//! `&mut self` surface makes external serialization structural. Multiple
//! sessions, each with its own engine resources and scoring, can coexist.

use crate::alignment::{decode_batch, decode_record, AlignmentResult};
use crate::batch::BatchBuffer;
use crate::config::Config;
use crate::engine::{default_engine, AlignmentEngine, EngineLimits, PollStatus, RawBatch};
use crate::error::{GasalError, Result};
use crate::sequence::{sanitize, Role};
use std::thread;
use std::time::Duration;

/// Spins this many polls before the blocking drivers start sleeping
/// between checks.
const POLL_SPIN_LIMIT: u32 = 64;
const POLL_SLEEP: Duration = Duration::from_micros(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    /// Nothing submitted; staging may be in progress
    Staging,
    /// A batch has been submitted and not yet observed complete
    InFlight,
    /// poll() reported done; results await collection
    Ready,
}

/// An alignment session bound to one engine context.
///
/// Scoring, mode, and capacity bounds are fixed at construction. The
/// session supports at most one in-flight batch: a second submission
/// before the first is collected is a typed error, never a reorder.
pub struct Session {
    config: Config,
    engine: Box<dyn AlignmentEngine>,
    batch: BatchBuffer,
    cycle: Cycle,
}

impl Session {
    /// Creates a session with the default backend for this build.
    ///
    /// # Errors
    /// [`GasalError::InvalidConfig`] if any bound is zero or the engine
    /// fails to allocate its device resources.
    pub fn new(config: Config) -> Result<Self> {
        let limits = Self::validated_limits(&config)?;
        let engine = default_engine(&config.scoring, &config.mode, &limits)?;
        Ok(Self::assemble(config, engine))
    }

    /// Creates a session on a caller-provided backend. The backend must
    /// have been built against the same scoring, mode, and bounds.
    pub fn with_engine(config: Config, engine: Box<dyn AlignmentEngine>) -> Result<Self> {
        Self::validated_limits(&config)?;
        Ok(Self::assemble(config, engine))
    }

    fn validated_limits(config: &Config) -> Result<EngineLimits> {
        if config.max_query_len == 0 || config.max_target_len == 0 || config.max_batch == 0 {
            return Err(GasalError::InvalidConfig(format!(
                "length and batch bounds must be positive (got query {}, target {}, batch {})",
                config.max_query_len, config.max_target_len, config.max_batch
            )));
        }
        Ok(EngineLimits {
            max_query_len: config.max_query_len,
            max_target_len: config.max_target_len,
            max_batch: config.max_batch,
        })
    }

    fn assemble(config: Config, engine: Box<dyn AlignmentEngine>) -> Session {
        log::info!(
            "session: max_query_len={} max_target_len={} max_batch={}",
            config.max_query_len,
            config.max_target_len,
            config.max_batch
        );
        let batch = BatchBuffer::new(config.max_batch, config.max_query_len, config.max_target_len);
        Session {
            config,
            batch,
            engine,
            cycle: Cycle::Staging,
        }
    }

    /// The session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of pairs staged for the current cycle.
    pub fn staged(&self) -> usize {
        self.batch.current_n_alns()
    }

    /// Drops any staged pairs and starts a fresh cycle. Not valid while a
    /// batch is in flight.
    pub fn reset(&mut self) -> Result<()> {
        if self.cycle != Cycle::Staging {
            return Err(GasalError::BatchInFlight);
        }
        self.batch.reset();
        Ok(())
    }

    /// Sanitizes and stages one (query, target) pair, returning its slot
    /// index. Capacity is checked for both roles before anything is
    /// written, so a failed stage leaves the batch exactly as it was.
    pub fn stage(&mut self, query_text: &[u8], target_text: &[u8]) -> Result<usize> {
        if self.cycle != Cycle::Staging {
            return Err(GasalError::BatchInFlight);
        }
        let slot = self.batch.current_n_alns();
        if slot >= self.config.max_batch {
            return Err(GasalError::BatchFull {
                max: self.config.max_batch,
            });
        }

        let query = sanitize(query_text);
        let target = sanitize(target_text);
        self.batch.check_capacity(Role::Query, slot, query.len())?;
        self.batch.check_capacity(Role::Target, slot, target.len())?;

        self.batch.fill(Role::Query, &query)?;
        self.batch.fill(Role::Target, &target)?;
        self.batch.commit_slot();
        Ok(slot)
    }

    /// Submits the staged batch for asynchronous execution. Never blocks.
    ///
    /// Invalidates the previous cycle's raw records; at most one batch may
    /// be in flight per session.
    pub fn submit(&mut self) -> Result<()> {
        match self.cycle {
            Cycle::Staging => {}
            Cycle::InFlight | Cycle::Ready => return Err(GasalError::BatchInFlight),
        }
        if self.batch.current_n_alns() == 0 {
            return Err(GasalError::EmptyBatch);
        }

        let view = self.batch.view();
        log::debug!(
            "submit: {} alignments, {}+{} transfer bytes",
            view.n_alns,
            view.query_data.len(),
            view.target_data.len()
        );
        self.engine.submit(view)?;
        self.cycle = Cycle::InFlight;
        Ok(())
    }

    /// Non-blocking completion check for the in-flight batch.
    ///
    /// Completion is only observable through repeated polling; the choice
    /// of cadence belongs to the caller.
    pub fn poll(&mut self) -> Result<bool> {
        match self.cycle {
            Cycle::Staging => Err(GasalError::NoBatchInFlight),
            Cycle::Ready => Ok(true),
            Cycle::InFlight => match self.engine.poll()? {
                PollStatus::NotDone => Ok(false),
                PollStatus::Done => {
                    self.cycle = Cycle::Ready;
                    Ok(true)
                }
            },
        }
    }

    /// Moves the completed cycle's raw output off the engine: exactly
    /// `staged()` records, index-aligned with the order pairs were staged,
    /// plus the shared edit-script bytes.
    ///
    /// Valid only once poll() has reported done; afterwards the session is
    /// ready to stage its next cycle.
    pub fn collect(&mut self) -> Result<RawBatch> {
        match self.cycle {
            Cycle::Staging => return Err(GasalError::NoBatchInFlight),
            Cycle::InFlight => return Err(GasalError::NotReady),
            Cycle::Ready => {}
        }
        let out = self.engine.read_results()?;
        log::debug!(
            "collect: {} records, {} edit bytes",
            out.len(),
            out.edit_bytes.len()
        );
        self.cycle = Cycle::Staging;
        self.batch.reset();
        Ok(out)
    }

    /// Aligns a single pair: stage, submit, poll to completion, collect,
    /// decode. Blocks the calling thread, yielding while the engine runs.
    pub fn align_one(&mut self, query_text: &[u8], target_text: &[u8]) -> Result<AlignmentResult> {
        self.reset()?;
        self.stage(query_text, target_text)?;
        self.submit()?;
        self.wait()?;
        let raw = self.collect()?;
        let record = raw
            .records
            .first()
            .ok_or_else(|| GasalError::Engine("engine returned no records".to_string()))?;
        decode_record(0, record, &raw.edit_bytes)
    }

    /// Aligns up to `max_batch` pairs in one cycle, returning results in
    /// input order. A pair over the configured bounds fails the whole call
    /// before submission, with the offending slot named in the error.
    pub fn align_batch(
        &mut self,
        pairs: &[(impl AsRef<[u8]>, impl AsRef<[u8]>)],
    ) -> Result<Vec<AlignmentResult>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        if pairs.len() > self.config.max_batch {
            return Err(GasalError::BatchTooLarge {
                n: pairs.len(),
                max: self.config.max_batch,
            });
        }

        self.reset()?;
        for (query, target) in pairs {
            self.stage(query.as_ref(), target.as_ref())?;
        }
        self.submit()?;
        self.wait()?;
        let raw = self.collect()?;
        decode_batch(&raw).into_iter().collect()
    }

    /// Polls until the engine reports done, yielding between checks and
    /// backing off to short sleeps so the spin cannot starve other host
    /// work.
    fn wait(&mut self) -> Result<()> {
        let mut spins = 0u32;
        while !self.poll()? {
            if spins < POLL_SPIN_LIMIT {
                spins += 1;
                thread::yield_now();
            } else {
                thread::sleep(POLL_SLEEP);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_session() -> Session {
        Session::new(
            Config::builder()
                .max_query_len(64)
                .max_target_len(64)
                .max_batch(4)
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn zero_bounds_are_rejected() {
        for config in [
            Config::builder().max_query_len(0).build(),
            Config::builder().max_target_len(0).build(),
            Config::builder().max_batch(0).build(),
        ] {
            assert!(matches!(
                Session::new(config),
                Err(GasalError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn submit_without_staging_is_empty_batch() {
        let mut session = small_session();
        assert!(matches!(session.submit(), Err(GasalError::EmptyBatch)));
    }

    #[test]
    fn poll_and_collect_require_a_submission() {
        let mut session = small_session();
        assert!(matches!(session.poll(), Err(GasalError::NoBatchInFlight)));
        assert!(matches!(
            session.collect(),
            Err(GasalError::NoBatchInFlight)
        ));
    }

    #[test]
    fn second_submit_before_collect_is_rejected() {
        let mut session = small_session();
        session.stage(b"ACGT", b"ACGT").unwrap();
        session.submit().unwrap();
        assert!(matches!(session.submit(), Err(GasalError::BatchInFlight)));
        assert!(matches!(
            session.stage(b"ACGT", b"ACGT"),
            Err(GasalError::BatchInFlight)
        ));
        // Collecting clears the cycle and staging works again.
        while !session.poll().unwrap() {}
        session.collect().unwrap();
        session.stage(b"ACGT", b"ACGT").unwrap();
    }

    #[test]
    fn collect_returns_one_record_per_staged_pair() {
        let mut session = small_session();
        session.stage(b"ACGT", b"ACGT").unwrap();
        session.stage(b"AAAA", b"AAAA").unwrap();
        session.submit().unwrap();
        while !session.poll().unwrap() {}
        let raw = session.collect().unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(session.staged(), 0);
    }

    #[test]
    fn failed_stage_leaves_prior_slots_intact() {
        let mut session = small_session();
        session.stage(b"ACGT", b"ACGT").unwrap();
        let err = session.stage(b"AC", &[b'T'; 65]).unwrap_err();
        assert!(matches!(
            err,
            GasalError::SequenceTooLong {
                role: Role::Target,
                slot: 1,
                len: 65,
                max: 64,
            }
        ));
        assert_eq!(session.staged(), 1);
        // The surviving slot still aligns.
        session.submit().unwrap();
        while !session.poll().unwrap() {}
        let raw = session.collect().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.records[0].score, 8);
    }

    #[test]
    fn batch_over_capacity_is_rejected_before_submission() {
        let mut session = small_session();
        let pairs: Vec<(&[u8], &[u8])> = vec![(b"AC", b"AC"); 5];
        assert!(matches!(
            session.align_batch(&pairs),
            Err(GasalError::BatchTooLarge { n: 5, max: 4 })
        ));
        // The session is still usable.
        assert_eq!(session.align_batch(&pairs[..2]).unwrap().len(), 2);
    }

    #[test]
    fn empty_batch_aligns_to_nothing() {
        let mut session = small_session();
        let pairs: Vec<(&[u8], &[u8])> = Vec::new();
        assert!(session.align_batch(&pairs).unwrap().is_empty());
    }
}

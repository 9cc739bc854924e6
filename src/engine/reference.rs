//! Host reference backend.
//!
//! Implements the engine contract on the CPU: semi-global affine-gap
//! alignment with traceback over the packed 2-bit code stream, emitting the
//! same raw one-byte-per-operation edit script the device kernel produces.
//! Deterministic, so the session and decoder can be tested without
//! hardware. Correctness oracle, not a performance path.

use crate::batch::BatchView;
use crate::config::{AlignmentMode, ScoringConfig};
use crate::engine::{AlignmentEngine, EngineLimits, PollStatus, RawAlignmentRecord, RawBatch};
use crate::error::{GasalError, Result};
use crate::sequence::unpack;

const OP_MATCH: u8 = 0;
const OP_MISMATCH: u8 = 1;
const OP_DELETION: u8 = 2;
const OP_INSERTION: u8 = 3;

// Low enough to never win a max(), high enough that subtracting gap
// penalties cannot wrap.
const NEG: i32 = i32::MIN / 4;

/// CPU implementation of the alignment engine.
///
/// Work "completes" at submission; the ping-pong slot pair mirrors the
/// device backend's stream layout so the session sees identical behavior.
pub struct ReferenceEngine {
    scoring: ScoringConfig,
    mode: AlignmentMode,
    limits: EngineLimits,
    slots: [Option<RawBatch>; 2],
    current: usize,
}

impl ReferenceEngine {
    pub fn create(
        scoring: &ScoringConfig,
        mode: &AlignmentMode,
        limits: &EngineLimits,
    ) -> Result<Self> {
        Ok(ReferenceEngine {
            scoring: *scoring,
            mode: *mode,
            limits: *limits,
            slots: [None, None],
            current: 0,
        })
    }

    fn substitution(&self, a: u8, b: u8) -> i32 {
        if a == b {
            self.scoring.match_score
        } else {
            self.scoring.mismatch_score
        }
    }

    /// Aligns one code pair and appends its edit script to `edit_bytes`.
    fn align_pair(&self, query: &[u8], target: &[u8], edit_bytes: &mut Vec<u8>) -> RawAlignmentRecord {
        let m = query.len();
        let n = target.len();
        let head_free = self.mode.query_free.head_free();
        let tail_free = self.mode.query_free.tail_free();

        let oe = self.scoring.gap_open + self.scoring.gap_extend;
        let ext = self.scoring.gap_extend;

        let cols = n + 1;
        let idx = |i: usize, j: usize| i * cols + j;

        let mut h = vec![0i32; (m + 1) * cols];
        let mut e = vec![NEG; (m + 1) * cols];
        let mut f = vec![NEG; (m + 1) * cols];

        // Target head is always free: row 0 stays at zero. The query head
        // is free only per mode.
        if !head_free {
            for i in 1..=m {
                h[idx(i, 0)] = -(self.scoring.gap_open + i as i32 * ext);
            }
        }

        for i in 1..=m {
            for j in 1..=n {
                let ec = (h[idx(i, j - 1)] - oe).max(e[idx(i, j - 1)] - ext);
                let fc = (h[idx(i - 1, j)] - oe).max(f[idx(i - 1, j)] - ext);
                let diag = h[idx(i - 1, j - 1)] + self.substitution(query[i - 1], target[j - 1]);
                e[idx(i, j)] = ec;
                f[idx(i, j)] = fc;
                h[idx(i, j)] = diag.max(ec).max(fc);
            }
        }

        // The alignment must consume at least one sequence to its end: the
        // query (any cell of the last column, tail skipped free) or the
        // target (any cell of the last row). A non-free query tail
        // restricts the end to the last row.
        let mut best = h[idx(m, 0)];
        let (mut ei, mut ej) = (m, 0);
        for j in 0..=n {
            if h[idx(m, j)] > best {
                best = h[idx(m, j)];
                ei = m;
                ej = j;
            }
        }
        if tail_free {
            for i in 0..=m {
                if h[idx(i, n)] > best {
                    best = h[idx(i, n)];
                    ei = i;
                    ej = n;
                }
            }
        }

        // Traceback, diagonal moves preferred on ties.
        let mut ops_rev: Vec<u8> = Vec::new();
        let (mut i, mut j) = (ei, ej);
        enum State {
            H,
            E,
            F,
        }
        let mut state = State::H;
        loop {
            match state {
                State::H => {
                    if i == 0 {
                        break;
                    }
                    if j == 0 {
                        if head_free {
                            break;
                        }
                        // Penalized query head: consumed as a leading gap.
                        for _ in 0..i {
                            ops_rev.push(OP_INSERTION);
                        }
                        i = 0;
                        break;
                    }
                    let cur = h[idx(i, j)];
                    let diag =
                        h[idx(i - 1, j - 1)] + self.substitution(query[i - 1], target[j - 1]);
                    if cur == diag {
                        ops_rev.push(if query[i - 1] == target[j - 1] {
                            OP_MATCH
                        } else {
                            OP_MISMATCH
                        });
                        i -= 1;
                        j -= 1;
                    } else if cur == e[idx(i, j)] {
                        state = State::E;
                    } else {
                        state = State::F;
                    }
                }
                State::E => {
                    ops_rev.push(OP_DELETION);
                    let opened = h[idx(i, j - 1)] - oe;
                    if e[idx(i, j)] == opened {
                        state = State::H;
                    }
                    j -= 1;
                }
                State::F => {
                    ops_rev.push(OP_INSERTION);
                    let opened = h[idx(i - 1, j)] - oe;
                    if f[idx(i, j)] == opened {
                        state = State::H;
                    }
                    i -= 1;
                }
            }
        }

        let edit_offset = edit_bytes.len() as u32;
        let n_ops = ops_rev.len() as u32;
        edit_bytes.extend(ops_rev.into_iter().rev());

        RawAlignmentRecord {
            score: best,
            query_start: i as i32,
            query_end: ei as i32 - 1,
            target_start: j as i32,
            target_end: ej as i32 - 1,
            n_ops,
            edit_offset,
        }
    }
}

impl AlignmentEngine for ReferenceEngine {
    fn submit(&mut self, batch: BatchView<'_>) -> Result<()> {
        if batch.n_alns > self.limits.max_batch {
            return Err(GasalError::Engine(format!(
                "submission of {} alignments exceeds engine capacity {}",
                batch.n_alns, self.limits.max_batch
            )));
        }

        let mut out = RawBatch::default();
        for slot in 0..batch.n_alns {
            let q_off = batch.query_offsets[slot] as usize;
            let t_off = batch.target_offsets[slot] as usize;
            let q_len = batch.query_lens[slot] as usize;
            let t_len = batch.target_lens[slot] as usize;
            if q_len > self.limits.max_query_len || t_len > self.limits.max_target_len {
                return Err(GasalError::Engine(format!(
                    "slot {slot} exceeds engine length bounds"
                )));
            }
            let query = unpack(&batch.query_data[q_off..], q_len);
            let target = unpack(&batch.target_data[t_off..], t_len);
            let record = self.align_pair(&query, &target, &mut out.edit_bytes);
            out.records.push(record);
        }

        self.current ^= 1;
        self.slots[self.current] = Some(out);
        Ok(())
    }

    fn poll(&mut self) -> Result<PollStatus> {
        if self.slots[self.current].is_none() {
            return Err(GasalError::NoBatchInFlight);
        }
        Ok(PollStatus::Done)
    }

    fn read_results(&mut self) -> Result<RawBatch> {
        self.slots[self.current]
            .take()
            .ok_or(GasalError::NoBatchInFlight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchBuffer;
    use crate::config::FreeEnds;
    use crate::sequence::{sanitize, Role};

    fn engine(mode: AlignmentMode) -> ReferenceEngine {
        let limits = EngineLimits {
            max_query_len: 256,
            max_target_len: 256,
            max_batch: 8,
        };
        ReferenceEngine::create(&ScoringConfig::default(), &mode, &limits).unwrap()
    }

    fn run_one(eng: &mut ReferenceEngine, q: &[u8], t: &[u8]) -> (RawAlignmentRecord, Vec<u8>) {
        let mut batch = BatchBuffer::new(8, 256, 256);
        batch.fill(Role::Query, &sanitize(q)).unwrap();
        batch.fill(Role::Target, &sanitize(t)).unwrap();
        batch.commit_slot();
        eng.submit(batch.view()).unwrap();
        assert_eq!(eng.poll().unwrap(), PollStatus::Done);
        let out = eng.read_results().unwrap();
        let rec = out.records[0];
        let ops = out.edit_bytes
            [rec.edit_offset as usize..rec.edit_offset as usize + rec.n_ops as usize]
            .to_vec();
        (rec, ops)
    }

    #[test]
    fn identical_sequences_score_full_length() {
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"AAATCG", b"AAATCG");
        assert_eq!(rec.score, 12);
        assert_eq!((rec.query_start, rec.query_end), (0, 5));
        assert_eq!((rec.target_start, rec.target_end), (0, 5));
        assert_eq!(ops, vec![OP_MATCH; 6]);
    }

    #[test]
    fn single_mismatch_alignment() {
        // AACTG vs AACGG: 4 matches, 1 mismatch at position 3
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"AACTG", b"AACGG");
        assert_eq!(rec.score, 5);
        assert_eq!((rec.query_start, rec.query_end), (0, 4));
        assert_eq!((rec.target_start, rec.target_end), (0, 4));
        assert_eq!(
            ops,
            vec![OP_MATCH, OP_MATCH, OP_MATCH, OP_MISMATCH, OP_MATCH]
        );
    }

    #[test]
    fn query_contained_in_target() {
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"ACG", b"TTACGTT");
        assert_eq!(rec.score, 6);
        assert_eq!((rec.query_start, rec.query_end), (0, 2));
        assert_eq!((rec.target_start, rec.target_end), (2, 4));
        assert_eq!(ops, vec![OP_MATCH; 3]);
    }

    #[test]
    fn deletion_in_query() {
        // Target carries one extra base between non-repetitive anchors: a
        // length-1 gap (open+extend = 7) beats every mismatch path.
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"ACGTCCATGG", b"ACGTTCCATGG");
        assert_eq!(rec.score, 10 * 2 - 7);
        assert_eq!((rec.query_start, rec.query_end), (0, 9));
        assert_eq!((rec.target_start, rec.target_end), (0, 10));
        let deletions = ops.iter().filter(|&&o| o == OP_DELETION).count();
        assert_eq!(deletions, 1);
        assert_eq!(ops.len(), 11);
    }

    #[test]
    fn insertion_in_query() {
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"ACGTTCCATGG", b"ACGTCCATGG");
        assert_eq!(rec.score, 10 * 2 - 7);
        let insertions = ops.iter().filter(|&&o| o == OP_INSERTION).count();
        assert_eq!(insertions, 1);
        assert_eq!((rec.query_start, rec.query_end), (0, 10));
        assert_eq!((rec.target_start, rec.target_end), (0, 9));
    }

    #[test]
    fn empty_query_yields_empty_alignment() {
        let mut eng = engine(AlignmentMode::default());
        let (rec, ops) = run_one(&mut eng, b"", b"ACGT");
        assert_eq!(rec.score, 0);
        assert_eq!(rec.n_ops, 0);
        assert!(ops.is_empty());
        assert_eq!(rec.query_end, rec.query_start - 1);
    }

    #[test]
    fn free_tail_leaves_query_overhang_unpenalized() {
        let mut eng = engine(AlignmentMode::default());
        // Query runs past the target's end; the overhanging TTT is skipped
        // at no cost.
        let (rec, ops) = run_one(&mut eng, b"AAAATTT", b"GGAAAA");
        assert_eq!(rec.score, 8);
        assert_eq!((rec.query_start, rec.query_end), (0, 3));
        assert_eq!((rec.target_start, rec.target_end), (2, 5));
        assert_eq!(ops, vec![OP_MATCH; 4]);
    }

    #[test]
    fn pinned_query_tail_pays_for_overhang() {
        let mode = AlignmentMode {
            query_free: FreeEnds::Neither,
        };
        let mut eng = engine(mode);
        // Same overhang as above, but the query must be consumed end to
        // end: the TTT becomes a penalized gap.
        let (rec, ops) = run_one(&mut eng, b"AAAATTT", b"GGAAAA");
        assert_eq!(rec.score, 8 - (5 + 3 * 2));
        assert_eq!((rec.query_start, rec.query_end), (0, 6));
        let insertions = ops.iter().filter(|&&o| o == OP_INSERTION).count();
        assert_eq!(insertions, 3);
    }

    #[test]
    fn batch_results_are_index_aligned() {
        let mut eng = engine(AlignmentMode::default());
        let mut batch = BatchBuffer::new(8, 256, 256);
        let pairs: [(&[u8], &[u8]); 3] = [(b"ACGT", b"ACGT"), (b"AAAA", b"TTTT"), (b"GG", b"AGGA")];
        for (q, t) in pairs {
            batch.fill(Role::Query, &sanitize(q)).unwrap();
            batch.fill(Role::Target, &sanitize(t)).unwrap();
            batch.commit_slot();
        }
        eng.submit(batch.view()).unwrap();
        eng.poll().unwrap();
        let out = eng.read_results().unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.records[0].score, 8);
        // Nothing in AAAA aligns against TTTT profitably; with free ends
        // the optimum is the empty alignment.
        assert_eq!(out.records[1].score, 0);
        assert_eq!(out.records[1].n_ops, 0);
        assert_eq!(out.records[2].score, 4);
        assert_eq!(
            (out.records[2].target_start, out.records[2].target_end),
            (1, 2)
        );
    }

    #[test]
    fn poll_without_submission_is_an_error() {
        let mut eng = engine(AlignmentMode::default());
        assert!(matches!(eng.poll(), Err(GasalError::NoBatchInFlight)));
        assert!(matches!(
            eng.read_results(),
            Err(GasalError::NoBatchInFlight)
        ));
    }
}

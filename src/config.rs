//! Configuration options for alignment sessions.
//!
//! This module provides a builder pattern for configuring scoring, the
//! semi-global mode, and the session's capacity bounds. All of it is fixed
//! at session construction and never mutated afterwards, so sessions with
//! different scoring can coexist in one process.

/// Symbol code used by the engine's device-side translation tables to
/// represent the ambiguous base `N`. Matches GASAL2's default `N_CODE`
/// build parameter.
pub const DEFAULT_N_CODE: u8 = 0x4E;

/// Substitution and gap scores for one session.
///
/// Scores are additive: a match contributes `match_score`, a mismatch
/// contributes `mismatch_score` (conventionally negative), and a gap of
/// length `k` costs `gap_open + k * gap_extend` (both penalties are
/// positive values that get subtracted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Score added for each matching base
    pub match_score: i32,

    /// Score added for each mismatching base (negative for a penalty)
    pub mismatch_score: i32,

    /// Penalty for opening a gap
    pub gap_open: i32,

    /// Penalty for each base a gap extends over, including the first
    pub gap_extend: i32,

    /// Score added when either base is `N`. When `None`, `N` is scored
    /// under the ordinary match/mismatch rules.
    pub n_penalty: Option<i32>,

    /// Symbol code for `N` in the engine's translation tables
    pub n_code: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        // Common short-read scoring; same values the GASAL2 test suite uses.
        ScoringConfig {
            match_score: 2,
            mismatch_score: -3,
            gap_open: 5,
            gap_extend: 2,
            n_penalty: None,
            n_code: DEFAULT_N_CODE,
        }
    }
}

/// Which ends of the query are free of penalty when left unaligned.
///
/// The target's flanks outside the reported span are always free; this
/// only controls the query side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeEnds {
    /// The query must align end to end
    Neither,
    /// Unaligned query prefix is free
    HeadOnly,
    /// Unaligned query suffix is free
    TailOnly,
    /// Both query flanks are free
    Both,
}

impl FreeEnds {
    pub fn head_free(self) -> bool {
        matches!(self, FreeEnds::HeadOnly | FreeEnds::Both)
    }

    pub fn tail_free(self) -> bool {
        matches!(self, FreeEnds::TailOnly | FreeEnds::Both)
    }
}

/// Alignment mode for a session: semi-global with traceback, parameterized
/// by which query ends are free. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentMode {
    /// Query ends exempt from gap penalties
    pub query_free: FreeEnds,
}

impl Default for AlignmentMode {
    fn default() -> Self {
        AlignmentMode {
            query_free: FreeEnds::Both,
        }
    }
}

/// Configuration for an alignment session.
///
/// # Default Values
/// - `max_query_len`: 2048
/// - `max_target_len`: 8192
/// - `max_batch`: 64
/// - scoring: match 2, mismatch -3, gap open 5, gap extend 2
/// - mode: semi-global, both query ends free
#[derive(Debug, Clone)]
pub struct Config {
    /// Substitution and gap scores
    pub scoring: ScoringConfig,

    /// Semi-global mode parameters
    pub mode: AlignmentMode,

    /// Maximum query length in symbols
    pub max_query_len: usize,

    /// Maximum target length in symbols
    pub max_target_len: usize,

    /// Maximum number of pairs per submitted batch
    pub max_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scoring: ScoringConfig::default(),
            mode: AlignmentMode::default(),
            max_query_len: 2048,
            max_target_len: 8192,
            max_batch: 64,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Example
    /// ```
    /// use gasal2_rs::Config;
    ///
    /// let config = Config::builder()
    ///     .match_score(1)
    ///     .mismatch_score(-4)
    ///     .max_batch(256)
    ///     .build();
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for constructing Config instances.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the match score.
    ///
    /// Default: 2
    pub fn match_score(mut self, score: i32) -> Self {
        self.config.scoring.match_score = score;
        self
    }

    /// Sets the mismatch score (negative for a penalty).
    ///
    /// Default: -3
    pub fn mismatch_score(mut self, score: i32) -> Self {
        self.config.scoring.mismatch_score = score;
        self
    }

    /// Sets the gap-open penalty.
    ///
    /// Default: 5
    pub fn gap_open(mut self, penalty: i32) -> Self {
        self.config.scoring.gap_open = penalty;
        self
    }

    /// Sets the gap-extend penalty, charged for every gap base including
    /// the first.
    ///
    /// Default: 2
    pub fn gap_extend(mut self, penalty: i32) -> Self {
        self.config.scoring.gap_extend = penalty;
        self
    }

    /// Sets the score applied when either base is `N`.
    ///
    /// Default: None (`N` scored under match/mismatch rules)
    pub fn n_penalty(mut self, penalty: i32) -> Self {
        self.config.scoring.n_penalty = Some(penalty);
        self
    }

    /// Sets the symbol code for `N` in the engine's translation tables.
    ///
    /// Default: 0x4E
    pub fn n_code(mut self, code: u8) -> Self {
        self.config.scoring.n_code = code;
        self
    }

    /// Sets which query ends are free of penalty.
    ///
    /// Default: both
    pub fn query_free(mut self, ends: FreeEnds) -> Self {
        self.config.mode.query_free = ends;
        self
    }

    /// Sets the maximum query length in symbols.
    ///
    /// Default: 2048
    pub fn max_query_len(mut self, len: usize) -> Self {
        self.config.max_query_len = len;
        self
    }

    /// Sets the maximum target length in symbols.
    ///
    /// Default: 8192
    pub fn max_target_len(mut self, len: usize) -> Self {
        self.config.max_target_len = len;
        self
    }

    /// Sets the maximum number of pairs per batch.
    ///
    /// Default: 64
    pub fn max_batch(mut self, n: usize) -> Self {
        self.config.max_batch = n;
        self
    }

    /// Builds the final Config instance.
    pub fn build(self) -> Config {
        self.config
    }
}

/// Preset configurations for common use cases.
impl Config {
    /// Configuration sized for short-read workloads.
    ///
    /// - Small per-sequence bounds, large batches
    pub fn short_reads() -> Self {
        Config {
            max_query_len: 512,
            max_target_len: 2048,
            max_batch: 512,
            ..Default::default()
        }
    }

    /// Configuration sized for long-read containment alignment.
    ///
    /// - Large per-sequence bounds, small batches
    pub fn long_reads() -> Self {
        Config {
            max_query_len: 16_384,
            max_target_len: 65_536,
            max_batch: 8,
            ..Default::default()
        }
    }
}

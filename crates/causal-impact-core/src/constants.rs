//! Numerical constants and defaults used throughout the crate.

/// Default deterministic seed for RNG operations.
///
/// Same seed + same data + same specification = bit-identical draws.
/// The value `0x696D70616374` is "impact" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x696D70616374;

/// Natural log of 2*pi, used in Gaussian log-density computation.
pub const LOG_2PI: f64 = 1.8378770664093453;

// =============================================================================
// Sampling defaults
// =============================================================================

/// Default total number of Gibbs iterations.
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Default number of burn-in iterations to discard.
pub const DEFAULT_BURN_IN: usize = 100;

/// Default thinning interval (keep every draw after burn-in).
pub const DEFAULT_THINNING: usize = 1;

/// Default two-sided credible-interval level (95% intervals).
pub const DEFAULT_ALPHA: f64 = 0.05;

// =============================================================================
// Prior defaults (standardized response scale)
// =============================================================================

/// Prior guess for the observation noise sd.
pub const DEFAULT_OBSERVATION_SD_GUESS: f64 = 0.1;

/// Prior sample size for the observation noise sd (nearly uninformative).
pub const DEFAULT_OBSERVATION_SAMPLE_SIZE: f64 = 0.01;

/// Prior guess for the level, trend and seasonal innovation sd.
pub const DEFAULT_STATE_SD_GUESS: f64 = 0.01;

/// Prior sample size for the state innovation sds.
pub const DEFAULT_STATE_SAMPLE_SIZE: f64 = 32.0;

/// Default slab variance for included regression coefficients.
pub const DEFAULT_SLAB_VARIANCE: f64 = 1.0;

/// Default expected number of included controls.
pub const DEFAULT_EXPECTED_MODEL_SIZE: f64 = 1.0;

/// Default initial-state variance, as a multiple of the pre-period variance.
pub const DEFAULT_INITIAL_STATE_SCALE: f64 = 1.0;

// =============================================================================
// Numerical tolerances
// =============================================================================

/// Smallest variance a sampler will hand back.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// Relative tolerance below which a variance counts as non-positive.
pub const POSITIVITY_TOLERANCE: f64 = 1e-9;

/// Minimum one-step prediction variance accepted by the filter.
pub const PREDICTION_VARIANCE_MIN: f64 = 1e-14;

/// Relative diagonal jitter applied on a retried iteration.
pub const RETRY_JITTER: f64 = 1e-6;

/// Relative jitter ladder tried before a Cholesky factorization is abandoned.
pub const JITTER_LADDER: [f64; 6] = [1e-12, 1e-10, 1e-9, 1e-8, 1e-7, 1e-6];

use thiserror::Error;

/// Failures surfaced by accumulator operations.
///
/// A witness that does not match is not an error; verification reports it
/// as `Ok(false)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorError {
    /// The entropy source could not supply the requested bytes
    #[error("entropy source exhausted: {needed} bytes requested")]
    EntropyExhausted {
        /// Number of bytes that were requested
        needed: usize,
    },

    /// The prime search ran out of its probe budget
    #[error("no prime found within {probes} probes")]
    NoPrimeFound {
        /// Number of candidates tested
        probes: usize,
    },

    /// Key generation kept colliding or missing its target size
    #[error("key generation failed after {attempts} attempts")]
    KeyGenerationFailed {
        /// Number of prime draws made
        attempts: usize,
    },

    /// The item list cannot be used for this operation
    #[error("invalid item set: {0}")]
    InvalidItemSet(&'static str),

    /// An encoded value is empty or not below the modulus
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    /// A derived prime shares a factor with the totient
    #[error("exponent is not invertible modulo the totient")]
    NonInvertibleExponent,

    /// Supplied key material violates a key invariant
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// Accumulator parameters are out of range
    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AccumulatorError>;

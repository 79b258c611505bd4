use crate::{AccumulatorError, Result};
use rand::{rngs::OsRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A supplier of random bytes for key generation.
///
/// Sources are consumed sequentially: each key generation draws exactly the
/// bytes it needs, so two runs over equal deterministic sources see the same
/// stream.
pub trait EntropySource {
    /// Fill `dest` entirely or fail with [`AccumulatorError::EntropyExhausted`]
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()>;

    /// Return `len` fresh bytes
    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.fill_bytes(&mut buffer)?;
        Ok(buffer)
    }
}

/// Operating system randomness, for production keys
#[derive(Copy, Clone, Debug, Default)]
pub struct SecureSource;

impl EntropySource for SecureSource {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        let needed = dest.len();
        OsRng.try_fill_bytes(dest).map_err(|e| {
            log::debug!("operating system entropy failed: {}", e);
            AccumulatorError::EntropyExhausted { needed }
        })
    }
}

/// A seeded ChaCha20 stream. The same seed always yields the same bytes.
///
/// Meant for tests and cross-implementation comparison, never for real keys.
#[derive(Clone, Debug)]
pub struct DeterministicSource {
    rng: ChaCha20Rng,
    remaining: Option<usize>,
}

impl DeterministicSource {
    /// Create an unbounded stream from `seed`
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            remaining: None,
        }
    }

    /// Create a stream from `seed` that fails once `limit` bytes have been drawn
    pub fn with_limit(seed: u64, limit: usize) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            remaining: Some(limit),
        }
    }

    /// Bytes left before the source is exhausted, `None` if unbounded
    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }
}

impl EntropySource for DeterministicSource {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining < dest.len() {
                return Err(AccumulatorError::EntropyExhausted { needed: dest.len() });
            }
            *remaining -= dest.len();
        }
        self.rng.fill_bytes(dest);
        Ok(())
    }
}

use crate::{AccumulatorError, Result};
use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// Public generator used when a deployment does not choose its own.
///
/// 65537 is prime, so it is coprime to any modulus whose factors exceed it.
pub const DEFAULT_GENERATOR: u32 = 65537;

/// Default size of each secret prime, giving a 2048-bit modulus
pub const DEFAULT_PRIME_BITS: usize = 1024;

/// Smallest prime size accepted by key generation
pub const MIN_PRIME_BITS: usize = 16;

/// Deployment parameters for key generation
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub struct AccParams {
    pub(crate) prime_bits: usize,
    pub(crate) generator: BigUint,
}

impl Default for AccParams {
    fn default() -> AccParams {
        AccParams {
            prime_bits: DEFAULT_PRIME_BITS,
            generator: BigUint::from(DEFAULT_GENERATOR),
        }
    }
}

impl AccParams {
    /// Create parameters with the default generator and `prime_bits`-bit primes
    pub fn with_prime_bits(prime_bits: usize) -> Result<Self> {
        Self::new(prime_bits, BigUint::from(DEFAULT_GENERATOR))
    }

    /// Create parameters from an explicit prime size and generator
    pub fn new(prime_bits: usize, generator: BigUint) -> Result<Self> {
        let params = AccParams {
            prime_bits,
            generator,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters are usable for key generation
    pub fn validate(&self) -> Result<()> {
        if self.prime_bits < MIN_PRIME_BITS {
            return Err(AccumulatorError::InvalidParameters(
                "prime size below minimum",
            ));
        }
        if self.generator <= BigUint::one() {
            return Err(AccumulatorError::InvalidParameters(
                "generator must be at least 2",
            ));
        }
        Ok(())
    }

    /// Size in bits of each secret prime
    pub fn get_prime_bits(&self) -> usize {
        self.prime_bits
    }

    /// The public generator
    pub fn get_generator(&self) -> &BigUint {
        &self.generator
    }
}

// Decodes a big-endian integer and checks it lies in [0, modulus)
pub(crate) fn decode_residue(bytes: &[u8], modulus: &BigUint) -> Result<BigUint> {
    if bytes.is_empty() {
        return Err(AccumulatorError::MalformedInput("empty byte sequence"));
    }
    let value = BigUint::from_bytes_be(bytes);
    check_residue(&value, modulus)?;
    Ok(value)
}

pub(crate) fn check_residue(value: &BigUint, modulus: &BigUint) -> Result<()> {
    if modulus.is_zero() || value >= modulus {
        return Err(AccumulatorError::MalformedInput("value not below the modulus"));
    }
    Ok(())
}

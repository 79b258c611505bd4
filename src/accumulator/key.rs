use super::utils::{PrimeSearch, MILLER_RABIN_ROUNDS};
use crate::cooperative::{run, run_async, Steps};
use crate::utils::check_residue;
use crate::{AccParams, AccumulatorError, EntropySource, Result};
use core::fmt;
use num_bigint_dig::{prime::probably_prime, BigUint};
use num_integer::Integer;
use num_traits::One;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Prime draws allowed before key generation gives up
pub const MAX_KEYGEN_ATTEMPTS: usize = 64;

/// The public half of the keys: modulus `N = P·Q` and generator `G`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyRepr")]
pub struct PublicKey {
    pub(crate) n: BigUint,
    pub(crate) g: BigUint,
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey {{ n: {}, g: {} }}", self.n, self.g)
    }
}

impl PublicKey {
    /// Build a public key from a published modulus and generator
    pub fn new(n: BigUint, g: BigUint) -> Result<Self> {
        if n <= BigUint::one() {
            return Err(AccumulatorError::InvalidKey("modulus must exceed 1"));
        }
        if !g.gcd(&n).is_one() {
            return Err(AccumulatorError::InvalidKey(
                "generator shares a factor with the modulus",
            ));
        }
        Ok(Self { n, g })
    }

    /// The public modulus
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// The public generator as configured, possibly not reduced mod N
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Return the big-endian modulus bytes
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.n.to_bytes_be()
    }

    pub(crate) fn reduced_generator(&self) -> BigUint {
        &self.g % &self.n
    }

    pub(crate) fn check_residue(&self, value: &BigUint) -> Result<()> {
        check_residue(value, &self.n)
    }
}

// Decoded keys go through `PublicKey::new`
#[derive(Deserialize)]
#[serde(rename = "PublicKey")]
struct PublicKeyRepr {
    n: BigUint,
    g: BigUint,
}

impl TryFrom<PublicKeyRepr> for PublicKey {
    type Error = AccumulatorError;

    fn try_from(repr: PublicKeyRepr) -> Result<Self> {
        Self::new(repr.n, repr.g)
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(sk: &SecretKey) -> Self {
        sk.public.clone()
    }
}

/// The full key set `{P, Q, N, G, totient}`.
///
/// `P`, `Q` and the totient are the trapdoor. Anyone holding them can forge
/// witnesses, so this type is zeroized on drop and its `Debug` output only
/// shows the public half. The encoded form carries only `P`, `Q` and `G`;
/// decoding rebuilds the rest through [`SecretKey::from_primes`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(into = "SecretKeyRepr", try_from = "SecretKeyRepr")]
pub struct SecretKey {
    pub(crate) p: BigUint,
    pub(crate) q: BigUint,
    pub(crate) totient: BigUint,
    pub(crate) public: PublicKey,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
        self.totient.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
            && self.q == other.q
            && self.totient == other.totient
            && self.public == other.public
    }
}

impl Eq for SecretKey {}

impl TryFrom<(BigUint, BigUint, BigUint)> for SecretKey {
    type Error = AccumulatorError;

    fn try_from((p, q, g): (BigUint, BigUint, BigUint)) -> Result<Self> {
        Self::from_primes(p, q, g)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "SecretKey")]
struct SecretKeyRepr {
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

impl Drop for SecretKeyRepr {
    fn drop(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
    }
}

impl From<SecretKey> for SecretKeyRepr {
    fn from(key: SecretKey) -> Self {
        Self {
            p: key.p.clone(),
            q: key.q.clone(),
            g: key.public.g.clone(),
        }
    }
}

impl TryFrom<SecretKeyRepr> for SecretKey {
    type Error = AccumulatorError;

    fn try_from(repr: SecretKeyRepr) -> Result<Self> {
        Self::from_primes(repr.p.clone(), repr.q.clone(), repr.g.clone())
    }
}

impl SecretKey {
    /// Generate keys from `source`, blocking until both primes are found
    pub fn generate<S: EntropySource + ?Sized>(source: &mut S, params: &AccParams) -> Result<Self> {
        run(KeyGeneration::new(source, params)?)
    }

    /// [`SecretKey::generate`] yielding to the executor between primality
    /// probes. Given the same source stream both produce identical keys.
    pub async fn generate_async<S: EntropySource + ?Sized>(
        source: &mut S,
        params: &AccParams,
    ) -> Result<Self> {
        run_async(KeyGeneration::new(source, params)?).await
    }

    /// Build keys from known primes and a generator
    pub fn from_primes(p: BigUint, q: BigUint, g: BigUint) -> Result<Self> {
        if !probably_prime(&p, MILLER_RABIN_ROUNDS) || !probably_prime(&q, MILLER_RABIN_ROUNDS) {
            return Err(AccumulatorError::InvalidKey("factor is not prime"));
        }
        Self::assemble(p, q, g)
    }

    // `p` and `q` must already be known prime
    fn assemble(p: BigUint, q: BigUint, g: BigUint) -> Result<Self> {
        if p == q {
            return Err(AccumulatorError::InvalidKey("primes must be distinct"));
        }
        let n = &p * &q;
        let totient = (&p - 1u32) * (&q - 1u32);
        let public = PublicKey::new(n, g)?;
        Ok(Self {
            p,
            q,
            totient,
            public,
        })
    }

    /// The public modulus
    pub fn modulus(&self) -> &BigUint {
        &self.public.n
    }

    /// Euler's totient of the modulus, `(P-1)(Q-1)`
    pub fn totient(&self) -> &BigUint {
        &self.totient
    }

    /// The secret factors `(P, Q)`
    pub fn primes(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }
}

/// Prime-pair search over an entropy source.
///
/// Each draw reads `ceil(bits / 8)` bytes, truncates them to `bits` bits, sets
/// the two top bits and the low bit, then scans upward for a prime. A scan that
/// overflows `bits` or runs out of probes is discarded and redrawn, as is a
/// prime dividing `G` or a second prime equal to the first.
struct KeyGeneration<'a, S: ?Sized> {
    source: &'a mut S,
    bits: usize,
    generator: BigUint,
    p: Option<BigUint>,
    search: Option<PrimeSearch>,
    attempts: usize,
}

impl<'a, S: EntropySource + ?Sized> KeyGeneration<'a, S> {
    fn new(source: &'a mut S, params: &AccParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            source,
            bits: params.prime_bits,
            generator: params.generator.clone(),
            p: None,
            search: None,
            attempts: 0,
        })
    }

    fn draw(&mut self) -> Result<PrimeSearch> {
        if self.attempts >= MAX_KEYGEN_ATTEMPTS {
            return Err(AccumulatorError::KeyGenerationFailed {
                attempts: self.attempts,
            });
        }
        self.attempts += 1;
        let len = (self.bits + 7) / 8;
        let bytes = self.source.bytes(len)?;
        let seed = BigUint::from_bytes_be(&bytes) >> (len * 8 - self.bits);
        let top = BigUint::from(3u32) << (self.bits - 2);
        Ok(PrimeSearch::new(seed | top))
    }

    fn accept(&mut self, prime: BigUint) -> Option<SecretKey> {
        if prime.bits() != self.bits {
            log::debug!("prime candidate overflowed {} bits, redrawing", self.bits);
            return None;
        }
        if !prime.gcd(&self.generator).is_one() {
            log::debug!("prime divides the generator, redrawing");
            return None;
        }
        let p = match self.p.take() {
            None => {
                self.p = Some(prime);
                return None;
            }
            Some(p) => p,
        };
        match SecretKey::assemble(p.clone(), prime, self.generator.clone()) {
            Ok(key) => {
                log::debug!(
                    "generated {}-bit modulus after {} draws",
                    key.public.n.bits(),
                    self.attempts
                );
                Some(key)
            }
            Err(e) => {
                log::debug!("rejected second prime ({}), redrawing", e);
                self.p = Some(p);
                None
            }
        }
    }
}

impl<S: EntropySource + ?Sized> Steps for KeyGeneration<'_, S> {
    type Output = SecretKey;

    fn step(&mut self) -> Result<Option<SecretKey>> {
        let mut search = match self.search.take() {
            Some(search) => search,
            None => self.draw()?,
        };
        match search.step() {
            Ok(Some(prime)) => Ok(self.accept(prime)),
            Ok(None) => {
                self.search = Some(search);
                Ok(None)
            }
            Err(AccumulatorError::NoPrimeFound { probes }) => {
                log::debug!("prime scan gave up after {} probes, redrawing", probes);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

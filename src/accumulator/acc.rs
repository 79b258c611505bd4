use super::utils::{hash_to_prime, hash_to_prime_async, invert, reduced_product};
use super::{PublicKey, SecretKey};
use crate::utils::decode_residue;
use crate::Result;
use core::fmt::{self, Display, Formatter};
use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};

/// An element in the accumulator, the prime derived from an item
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Element(pub BigUint);

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Element {{ {} }}", self.0)
    }
}

impl From<BigUint> for Element {
    fn from(prime: BigUint) -> Self {
        Self(prime)
    }
}

impl From<Element> for BigUint {
    fn from(e: Element) -> Self {
        e.0
    }
}

impl Element {
    /// Construct an element by hashing the specified bytes to a prime
    pub fn hash(d: &[u8]) -> Result<Self> {
        hash_to_prime(d).map(Self)
    }

    /// [`Element::hash`] yielding to the executor between primality probes
    pub async fn hash_async(d: &[u8]) -> Result<Self> {
        hash_to_prime_async(d).await.map(Self)
    }

    /// Construct an element from text, encoded as UTF-8
    pub fn hash_str(s: &str) -> Result<Self> {
        Self::hash(s.as_bytes())
    }

    /// Return the big-endian byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// Running public-strategy exponentiation over a list of primes.
///
/// Starts at `G mod N` and raises the value to each prime in list order,
/// optionally skipping one index (the member a witness is built for).
#[derive(Clone, Debug)]
pub(crate) struct Fold {
    value: BigUint,
    next: usize,
    skip: Option<usize>,
}

impl Fold {
    pub fn new(pk: &PublicKey, skip: Option<usize>) -> Self {
        Self {
            value: pk.reduced_generator(),
            next: 0,
            skip,
        }
    }

    /// Fold in the next prime. Returns the value once every prime is consumed.
    pub fn advance(&mut self, pk: &PublicKey, primes: &[Element]) -> Option<BigUint> {
        if self.skip == Some(self.next) {
            self.next += 1;
        }
        match primes.get(self.next) {
            Some(prime) => {
                self.value = self.value.modpow(&prime.0, &pk.n);
                self.next += 1;
                None
            }
            None => Some(std::mem::take(&mut self.value)),
        }
    }

    pub fn finish(mut self, pk: &PublicKey, primes: &[Element]) -> BigUint {
        loop {
            if let Some(value) = self.advance(pk, primes) {
                return value;
            }
        }
    }
}

/// Represents an RSA accumulator value, `G^(p_1·…·p_k) mod N`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Accumulator(pub BigUint);

impl Display for Accumulator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Accumulator {{ {} }}", self.0)
    }
}

impl From<Accumulator> for BigUint {
    fn from(a: Accumulator) -> Self {
        a.0
    }
}

impl Accumulator {
    /// The accumulator of the empty set, `G mod N`
    pub fn new(pk: &PublicKey) -> Self {
        Self(pk.reduced_generator())
    }

    /// Accumulate `m` without the trapdoor by repeated exponentiation, in list order
    pub fn with_elements_public(pk: &PublicKey, m: &[Element]) -> Self {
        Self(Fold::new(pk, None).finish(pk, m))
    }

    /// Accumulate `m` with the trapdoor: the exponent is reduced modulo the
    /// totient so a single exponentiation suffices
    pub fn with_elements_secret(key: &SecretKey, m: &[Element]) -> Self {
        let exponent = reduced_product(m, &key.totient);
        Self(key.public.reduced_generator().modpow(&exponent, &key.public.n))
    }

    /// Add a value to the accumulator and return the new accumulator
    pub fn add(&self, pk: &PublicKey, value: &Element) -> Self {
        Self(self.0.modpow(&value.0, &pk.n))
    }

    /// Add a value and update this accumulator
    pub fn add_assign(&mut self, pk: &PublicKey, value: &Element) {
        self.0 = self.0.modpow(&value.0, &pk.n);
    }

    /// Add many members
    pub fn add_elements(&self, pk: &PublicKey, m: &[Element]) -> Self {
        Self(
            m.iter()
                .fold(self.0.clone(), |acc, p| acc.modpow(&p.0, &pk.n)),
        )
    }

    /// Remove a value from the accumulator and return
    /// a new accumulator without `value`
    pub fn remove(&self, key: &SecretKey, value: &Element) -> Result<Self> {
        let v = invert(&value.0, &key.totient)?;
        Ok(Self(self.0.modpow(&v, &key.public.n)))
    }

    /// Remove a value and update this accumulator
    pub fn remove_assign(&mut self, key: &SecretKey, value: &Element) -> Result<()> {
        *self = self.remove(key, value)?;
        Ok(())
    }

    /// Remove multiple values and return a new accumulator
    pub fn remove_elements(&self, key: &SecretKey, deletions: &[Element]) -> Result<Self> {
        let v = invert(&reduced_product(deletions, &key.totient), &key.totient)?;
        Ok(Self(self.0.modpow(&v, &key.public.n)))
    }

    /// Decode an accumulator, which must lie in [0, N)
    pub fn from_bytes(pk: &PublicKey, bytes: &[u8]) -> Result<Self> {
        decode_residue(bytes, &pk.n).map(Self)
    }

    /// Convert accumulator to big-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

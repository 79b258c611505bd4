//! Prime derivation and modular helpers shared by the accumulator types.
use super::Element;
use crate::cooperative::Steps;
use crate::{AccumulatorError, Result};
use num_bigint_dig::{prime::probably_prime, BigInt, BigUint, ModInverse, Sign, ToBigUint};
use num_traits::One;
use sha2::{Digest, Sha256};

/// Miller-Rabin rounds per primality test, bounding the error by 2^-128
pub const MILLER_RABIN_ROUNDS: usize = 64;

/// Candidates tested by a single prime search before giving up
pub const MAX_PRIME_PROBES: usize = 1 << 16;

/// Width in bits of every prime produced by [`hash_to_prime`]
pub const HASH_PRIME_BITS: usize = 256;

/// Derive a prime from arbitrary bytes.
///
/// The SHA-256 digest of `data` is read as a big-endian integer, its top and
/// lowest bits are set, and odd candidates are tested upward from there. The
/// first probable prime is returned. Every result is a 256-bit prime.
pub fn hash_to_prime(data: &[u8]) -> Result<BigUint> {
    crate::cooperative::run(PrimeSearch::from_digest(data))
}

/// [`hash_to_prime`] yielding to the executor between probes
pub async fn hash_to_prime_async(data: &[u8]) -> Result<BigUint> {
    crate::cooperative::run_async(PrimeSearch::from_digest(data)).await
}

/// An upward scan over odd candidates for a probable prime
#[derive(Clone, Debug)]
pub(crate) struct PrimeSearch {
    candidate: BigUint,
    probes: usize,
}

impl PrimeSearch {
    /// Start at `seed`, forced odd
    pub fn new(seed: BigUint) -> Self {
        Self {
            candidate: seed | BigUint::one(),
            probes: 0,
        }
    }

    pub fn from_digest(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let seed = BigUint::from_bytes_be(&digest) | (BigUint::one() << (HASH_PRIME_BITS - 1));
        Self::new(seed)
    }
}

impl Steps for PrimeSearch {
    type Output = BigUint;

    fn step(&mut self) -> Result<Option<BigUint>> {
        if self.probes >= MAX_PRIME_PROBES {
            return Err(AccumulatorError::NoPrimeFound {
                probes: self.probes,
            });
        }
        self.probes += 1;
        if probably_prime(&self.candidate, MILLER_RABIN_ROUNDS) {
            log::trace!("prime found after {} probes", self.probes);
            return Ok(Some(self.candidate.clone()));
        }
        self.candidate += 2u32;
        Ok(None)
    }
}

/// Hashes each item of a list to its prime, in order
pub(crate) struct DerivePrimes<'a, T> {
    items: &'a [T],
    primes: Vec<Element>,
    search: Option<PrimeSearch>,
}

impl<'a, T: AsRef<[u8]>> DerivePrimes<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            primes: Vec::with_capacity(items.len()),
            search: None,
        }
    }
}

impl<T: AsRef<[u8]>> Steps for DerivePrimes<'_, T> {
    type Output = Vec<Element>;

    fn step(&mut self) -> Result<Option<Vec<Element>>> {
        let index = self.primes.len();
        if index == self.items.len() {
            return Ok(Some(std::mem::take(&mut self.primes)));
        }
        let search = self
            .search
            .get_or_insert_with(|| PrimeSearch::from_digest(self.items[index].as_ref()));
        if let Some(prime) = search.step()? {
            self.primes.push(Element(prime));
            self.search = None;
        }
        Ok(None)
    }
}

/// The inverse of `value` modulo `modulus`, normalised into [0, modulus)
pub fn invert(value: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    let inverse = value
        .clone()
        .mod_inverse(modulus)
        .ok_or(AccumulatorError::NonInvertibleExponent)?;
    let modulus = BigInt::from_biguint(Sign::Plus, modulus.clone());
    ((inverse % &modulus + &modulus) % &modulus)
        .to_biguint()
        .ok_or(AccumulatorError::NonInvertibleExponent)
}

/// Product of the primes reduced modulo `modulus`
pub(crate) fn reduced_product(primes: &[Element], modulus: &BigUint) -> BigUint {
    primes
        .iter()
        .fold(BigUint::one() % modulus, |acc, p| (acc * &p.0) % modulus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooperative::run;
    use num_integer::Integer;

    #[test]
    fn hash_to_prime_is_deterministic() {
        let a = hash_to_prime(b"pewpewpew").unwrap();
        let b = hash_to_prime(b"pewpewpew").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bits(), HASH_PRIME_BITS);
        assert!(probably_prime(&a, 20));
        assert_ne!(a, hash_to_prime(b"bangbang").unwrap());
    }

    #[test]
    fn hash_to_prime_known_answers() {
        // SHA-256 ends in ...681f; the scan steps by 2 up to ...687b
        let prime = hash_to_prime(b"pewpewpew").unwrap();
        let expected = BigUint::parse_bytes(
            b"fc39c2916a0a35cc34b9c6ec25c1d1513ef467f412a6d25d7b3f90c4efa3687b",
            16,
        )
        .unwrap();
        assert_eq!(prime, expected);
        let mut search = PrimeSearch::from_digest(b"pewpewpew");
        assert_eq!(run(search.clone()).unwrap(), expected);
        while search.step().unwrap().is_none() {}
        assert_eq!(search.probes, 47);

        assert_eq!(
            hash_to_prime(b"bangbang").unwrap(),
            BigUint::parse_bytes(
                b"f9de8545cac4782227db7303c8ee243f62f5cbc3eddc5583ab8376f8d4004bbb",
                16,
            )
            .unwrap()
        );
    }

    #[test]
    fn forced_digest_is_first_candidate() {
        // This digest already has bits 255 and 0 set and is prime
        let digest = Sha256::digest(b"item-58");
        let seed = BigUint::from_bytes_be(&digest);
        assert_eq!(seed.bits(), HASH_PRIME_BITS);
        assert!(seed.is_odd());

        let mut search = PrimeSearch::from_digest(b"item-58");
        assert_eq!(search.step().unwrap(), Some(seed.clone()));
        assert_eq!(search.probes, 1);
        assert_eq!(hash_to_prime(b"item-58").unwrap(), seed);
    }

    #[tokio::test]
    async fn hash_to_prime_async_matches() {
        let sync = hash_to_prime(b"pewpewpew").unwrap();
        let coop = hash_to_prime_async(b"pewpewpew").await.unwrap();
        assert_eq!(sync, coop);
    }

    #[test]
    fn search_counts_probes() {
        // 24 -> 25 (composite), 27 (composite), 29 (prime)
        let mut search = PrimeSearch::new(BigUint::from(24u32));
        assert_eq!(search.step().unwrap(), None);
        assert_eq!(search.step().unwrap(), None);
        assert_eq!(search.step().unwrap(), Some(BigUint::from(29u32)));
        assert_eq!(search.probes, 3);
    }

    #[test]
    fn derive_primes_keeps_order() {
        let items = ["a", "b", "c"];
        let primes = run(DerivePrimes::new(&items)).unwrap();
        assert_eq!(primes.len(), 3);
        for (item, prime) in items.iter().zip(&primes) {
            assert_eq!(prime.0, hash_to_prime(item.as_bytes()).unwrap());
        }
        let empty: [&str; 0] = [];
        assert!(run(DerivePrimes::new(&empty)).unwrap().is_empty());
    }

    #[test]
    fn invert_toy_values() {
        let totient = BigUint::from(8u32);
        assert_eq!(invert(&BigUint::from(11u32), &totient).unwrap(), BigUint::from(3u32));
        assert_eq!(invert(&BigUint::from(7u32), &totient).unwrap(), BigUint::from(7u32));
        assert_eq!(invert(&BigUint::from(13u32), &totient).unwrap(), BigUint::from(5u32));
        assert_eq!(
            invert(&BigUint::from(6u32), &totient),
            Err(AccumulatorError::NonInvertibleExponent)
        );
    }

    #[test]
    fn reduced_product_toy() {
        let primes = [7u32, 11, 13].map(|p| Element(BigUint::from(p)));
        assert_eq!(reduced_product(&primes, &BigUint::from(8u32)), BigUint::one());
        assert_eq!(reduced_product(&[], &BigUint::from(8u32)), BigUint::one());
    }
}

use crate::accumulator::{
    utils::{reduced_product, DerivePrimes},
    Accumulator, Element, Fold, MembershipWitness, PublicKey, SecretKey,
};
use crate::cooperative::{run, run_async, Steps};
use crate::{AccumulatorError, Result};
use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};

/// An accumulator over a list of items together with every member's witness.
///
/// `witnesses[i]` and `primes[i]` belong to the `i`-th input item. The primes
/// are kept for auditing; verifiers rederive them from the items.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Accumulation {
    /// The accumulated value
    pub accumulator: Accumulator,
    /// One witness per item, in input order
    pub witnesses: Vec<MembershipWitness>,
    /// The prime derived from each item, in input order
    pub primes: Vec<Element>,
}

impl Accumulation {
    /// Accumulate `items` and derive their witnesses without the trapdoor.
    ///
    /// Costs one exponentiation per item for the accumulator and
    /// `n - 1` per witness.
    pub fn publicly<T: AsRef<[u8]>>(pk: &PublicKey, items: &[T]) -> Result<Self> {
        run(AccumulationSteps::new(Strategy::Public(pk), items)?)
    }

    /// [`Accumulation::publicly`] yielding to the executor between steps
    pub async fn publicly_async<T: AsRef<[u8]>>(pk: &PublicKey, items: &[T]) -> Result<Self> {
        run_async(AccumulationSteps::new(Strategy::Public(pk), items)?).await
    }

    /// Accumulate `items` and derive their witnesses with the trapdoor.
    ///
    /// Costs one exponentiation and one modular inverse per item.
    pub fn secretly<T: AsRef<[u8]>>(key: &SecretKey, items: &[T]) -> Result<Self> {
        run(AccumulationSteps::new(Strategy::Secret(key), items)?)
    }

    /// [`Accumulation::secretly`] yielding to the executor between steps
    pub async fn secretly_async<T: AsRef<[u8]>>(key: &SecretKey, items: &[T]) -> Result<Self> {
        run_async(AccumulationSteps::new(Strategy::Secret(key), items)?).await
    }

    /// The witness of the `index`-th item, if any
    pub fn witness(&self, index: usize) -> Option<&MembershipWitness> {
        self.witnesses.get(index)
    }
}

#[derive(Clone, Copy)]
enum Strategy<'a> {
    Public(&'a PublicKey),
    Secret(&'a SecretKey),
}

impl<'a> Strategy<'a> {
    fn public_key(self) -> &'a PublicKey {
        match self {
            Strategy::Public(pk) => pk,
            Strategy::Secret(key) => &key.public,
        }
    }
}

/// Derives every prime, then the accumulator, then one witness at a time
struct AccumulationSteps<'a, T> {
    strategy: Strategy<'a>,
    derive: DerivePrimes<'a, T>,
    primes: Vec<Element>,
    accumulator: Option<Accumulator>,
    witnesses: Vec<MembershipWitness>,
    fold: Option<Fold>,
    exponent: Option<BigUint>,
}

impl<'a, T: AsRef<[u8]>> AccumulationSteps<'a, T> {
    fn new(strategy: Strategy<'a>, items: &'a [T]) -> Result<Self> {
        if items.is_empty() {
            return Err(AccumulatorError::InvalidItemSet(
                "at least one item is required",
            ));
        }
        log::debug!("accumulating {} items", items.len());
        Ok(Self {
            strategy,
            derive: DerivePrimes::new(items),
            primes: Vec::new(),
            accumulator: None,
            witnesses: Vec::with_capacity(items.len()),
            fold: None,
            exponent: None,
        })
    }

    // One exponentiation of the running public fold. `skip` names the member
    // whose witness is being built, `None` while building the accumulator.
    fn fold_step(&mut self, skip: Option<usize>) -> Option<BigUint> {
        let pk = self.strategy.public_key();
        let fold = self.fold.get_or_insert_with(|| Fold::new(pk, skip));
        let value = fold.advance(pk, &self.primes);
        if value.is_some() {
            self.fold = None;
        }
        value
    }

    fn accumulate(&mut self) -> Option<Accumulator> {
        match self.strategy {
            Strategy::Public(_) => self.fold_step(None).map(Accumulator),
            Strategy::Secret(key) => {
                let exponent = reduced_product(&self.primes, &key.totient);
                let acc = Accumulator(
                    key.public
                        .reduced_generator()
                        .modpow(&exponent, &key.public.n),
                );
                self.exponent = Some(exponent);
                Some(acc)
            }
        }
    }

    fn next_witness(&mut self) -> Result<Option<MembershipWitness>> {
        let index = self.witnesses.len();
        match self.strategy {
            Strategy::Public(_) => Ok(self.fold_step(Some(index)).map(MembershipWitness)),
            Strategy::Secret(key) => {
                let exponent = self
                    .exponent
                    .get_or_insert_with(|| reduced_product(&self.primes, &key.totient));
                MembershipWitness::from_exponent(key, exponent, &self.primes[index]).map(Some)
            }
        }
    }
}

impl<T: AsRef<[u8]>> Steps for AccumulationSteps<'_, T> {
    type Output = Accumulation;

    fn step(&mut self) -> Result<Option<Accumulation>> {
        if self.primes.is_empty() {
            if let Some(primes) = self.derive.step()? {
                self.primes = primes;
            }
            return Ok(None);
        }
        if self.accumulator.is_none() {
            self.accumulator = self.accumulate();
            return Ok(None);
        }
        if self.witnesses.len() < self.primes.len() {
            if let Some(witness) = self.next_witness()? {
                self.witnesses.push(witness);
            }
            return Ok(None);
        }
        Ok(self.accumulator.take().map(|accumulator| Accumulation {
            accumulator,
            witnesses: std::mem::take(&mut self.witnesses),
            primes: std::mem::take(&mut self.primes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccParams, DeterministicSource};

    const ITEMS: [&str; 5] = ["pewpew", "bangbang", "ansuz", "borb", "blammo"];

    fn key(seed: u64) -> SecretKey {
        let params = AccParams::with_prime_bits(128).unwrap();
        SecretKey::generate(&mut DeterministicSource::from_seed(seed), &params).unwrap()
    }

    #[test]
    fn public_and_secret_agree() {
        let key = key(5);
        let pk = PublicKey::from(&key);
        let public = Accumulation::publicly(&pk, &ITEMS).unwrap();
        let secret = Accumulation::secretly(&key, &ITEMS).unwrap();
        assert_eq!(public, secret);
        assert_eq!(public.witnesses.len(), ITEMS.len());
        assert_eq!(public.primes.len(), ITEMS.len());
        for (item, prime) in ITEMS.iter().zip(&public.primes) {
            assert_eq!(prime, &Element::hash_str(item).unwrap());
        }
    }

    #[test]
    fn single_values_agree_with_batch() {
        let key = key(6);
        let pk = PublicKey::from(&key);
        let result = Accumulation::secretly(&key, &ITEMS).unwrap();
        assert_eq!(
            result.accumulator,
            Accumulator::with_elements_public(&pk, &result.primes)
        );
        for i in 0..ITEMS.len() {
            assert_eq!(
                result.witness(i),
                Some(&MembershipWitness::new_public(&pk, &result.primes, i).unwrap())
            );
        }
        assert_eq!(result.witness(ITEMS.len()), None);
    }

    #[test]
    fn single_item() {
        let key = key(7);
        let pk = PublicKey::from(&key);
        let result = Accumulation::publicly(&pk, &["only"]).unwrap();
        assert_eq!(result.witnesses[0].0, pk.reduced_generator());
        assert_eq!(result, Accumulation::secretly(&key, &["only"]).unwrap());
        assert!(result.witnesses[0]
            .verify(&pk, &result.accumulator, b"only")
            .unwrap());
    }

    #[test]
    fn empty_set_rejected() {
        let key = key(7);
        let empty: [&[u8]; 0] = [];
        assert_eq!(
            Accumulation::publicly(&PublicKey::from(&key), &empty),
            Err(AccumulatorError::InvalidItemSet("at least one item is required"))
        );
        assert!(Accumulation::secretly(&key, &empty).is_err());
    }

    #[tokio::test]
    async fn async_matches_sync() {
        let key = key(8);
        let pk = PublicKey::from(&key);
        let public = Accumulation::publicly_async(&pk, &ITEMS).await.unwrap();
        let secret = Accumulation::secretly_async(&key, &ITEMS).await.unwrap();
        assert_eq!(public, Accumulation::publicly(&pk, &ITEMS).unwrap());
        assert_eq!(secret, Accumulation::secretly(&key, &ITEMS).unwrap());
        assert_eq!(public, secret);
    }
}

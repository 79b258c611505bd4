use super::acc::Fold;
use super::utils::{invert, reduced_product, PrimeSearch};
use super::{Accumulator, Element, PublicKey, SecretKey};
use crate::cooperative::{run, run_async, Steps};
use crate::utils::decode_residue;
use crate::{AccumulatorError, Result};
use core::fmt::{self, Display, Formatter};
use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};

/// A membership witness: the accumulator of every member except one
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MembershipWitness(pub BigUint);

impl Display for MembershipWitness {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MembershipWitness {{ {} }}", self.0)
    }
}

impl From<MembershipWitness> for BigUint {
    fn from(w: MembershipWitness) -> Self {
        w.0
    }
}

impl MembershipWitness {
    /// Compute the witness for `primes[index]` without the trapdoor, by
    /// exponentiating over every other prime in list order
    pub fn new_public(pk: &PublicKey, primes: &[Element], index: usize) -> Result<Self> {
        if index >= primes.len() {
            return Err(AccumulatorError::InvalidItemSet("member index out of range"));
        }
        Ok(Self(Fold::new(pk, Some(index)).finish(pk, primes)))
    }

    /// Compute the witness for `primes[index]` with the trapdoor:
    /// `G^(p_index^-1 · Π p mod totient) mod N`
    pub fn new_secret(key: &SecretKey, primes: &[Element], index: usize) -> Result<Self> {
        let y = primes
            .get(index)
            .ok_or(AccumulatorError::InvalidItemSet("member index out of range"))?;
        let exponent = reduced_product(primes, &key.totient);
        Self::from_exponent(key, &exponent, y)
    }

    // `exponent` is the reduced product of the whole set
    pub(crate) fn from_exponent(key: &SecretKey, exponent: &BigUint, y: &Element) -> Result<Self> {
        let inv = invert(&y.0, &key.totient)?;
        let e = (inv * exponent) % &key.totient;
        Ok(Self(key.public.reduced_generator().modpow(&e, &key.public.n)))
    }

    /// Verify this is a valid witness for `item` in the accumulator.
    ///
    /// A mismatch is `Ok(false)`. An error means the accumulator or witness
    /// is not below the modulus, or no prime could be derived for `item`.
    pub fn verify(&self, pk: &PublicKey, accumulator: &Accumulator, item: &[u8]) -> Result<bool> {
        run(Verification::new(self, pk, accumulator, item)?)
    }

    /// [`MembershipWitness::verify`] yielding to the executor between steps
    pub async fn verify_async(
        &self,
        pk: &PublicKey,
        accumulator: &Accumulator,
        item: &[u8],
    ) -> Result<bool> {
        run_async(Verification::new(self, pk, accumulator, item)?).await
    }

    /// Verify against an already derived element: `witness^y ≡ accumulator (mod N)`
    pub fn verify_element(
        &self,
        pk: &PublicKey,
        accumulator: &Accumulator,
        y: &Element,
    ) -> Result<bool> {
        pk.check_residue(&accumulator.0)?;
        pk.check_residue(&self.0)?;
        Ok(self.check(pk, accumulator, y))
    }

    fn check(&self, pk: &PublicKey, accumulator: &Accumulator, y: &Element) -> bool {
        let matches = self.0.modpow(&y.0, &pk.n) == accumulator.0;
        if !matches {
            log::trace!("witness does not match accumulator");
        }
        matches
    }

    /// Update the witness after `added` joined the set
    pub fn apply_addition(&mut self, pk: &PublicKey, added: &Element) {
        self.0 = self.0.modpow(&added.0, &pk.n);
    }

    /// Update the witness after `removed`, a different member, left the set
    pub fn apply_removal(&mut self, key: &SecretKey, removed: &Element) -> Result<()> {
        let inv = invert(&removed.0, &key.totient)?;
        self.0 = self.0.modpow(&inv, &key.public.n);
        Ok(())
    }

    /// Decode a witness, which must lie in [0, N)
    pub fn from_bytes(pk: &PublicKey, bytes: &[u8]) -> Result<Self> {
        decode_residue(bytes, &pk.n).map(Self)
    }

    /// Return the big-endian byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// Hash the item to its prime, then compare one exponentiation
struct Verification<'a> {
    witness: &'a MembershipWitness,
    pk: &'a PublicKey,
    accumulator: &'a Accumulator,
    search: PrimeSearch,
    prime: Option<Element>,
}

impl<'a> Verification<'a> {
    fn new(
        witness: &'a MembershipWitness,
        pk: &'a PublicKey,
        accumulator: &'a Accumulator,
        item: &[u8],
    ) -> Result<Self> {
        pk.check_residue(&accumulator.0)?;
        pk.check_residue(&witness.0)?;
        Ok(Self {
            witness,
            pk,
            accumulator,
            search: PrimeSearch::from_digest(item),
            prime: None,
        })
    }
}

impl Steps for Verification<'_> {
    type Output = bool;

    fn step(&mut self) -> Result<Option<bool>> {
        match self.prime.take() {
            Some(y) => Ok(Some(self.witness.check(self.pk, self.accumulator, &y))),
            None => {
                self.prime = self.search.step()?.map(Element);
                Ok(None)
            }
        }
    }
}

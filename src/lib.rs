/*
    Copyright Hyperledger Foundation. All Rights Reserved.
    SPDX-License-Identifier: Apache-2.0
*/
//! An RSA (strong-RSA) cryptographic accumulator.
//!
//! A public modulus `N = P·Q` and a fixed generator `G` summarise a set of
//! items as `G^(p_1·p_2·…·p_k) mod N`, where each `p_i` is a prime derived
//! from the item bytes. A member proves inclusion with a witness, the same
//! value computed over every prime but its own.
//!
//! Every value can be computed two ways: publicly by repeated modular
//! exponentiation, or with the secret totient by reducing the exponent
//! first. Both paths produce identical values. Long running operations also
//! come in an `_async` flavour that yields to the executor between steps.
#![deny(
    missing_docs,
    unused_import_braces,
    unused_qualifications,
    unused_parens,
    unused_lifetimes,
    unconditional_recursion,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
mod cooperative;
mod entropy;
mod error;
mod utils;
mod witness;


pub mod accumulator;
pub use entropy::*;
pub use error::*;
pub use utils::*;
pub use witness::*;

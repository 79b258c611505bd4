//! Keys, elements, accumulator values and membership witnesses.
mod acc;
mod key;
pub mod utils;
mod witness;

pub use acc::*;
pub(crate) use acc::Fold;
pub use key::*;
pub use utils::*;
pub use witness::*;

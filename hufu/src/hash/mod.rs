//! Hash functions and extendable-output functions used by the HuFu signature scheme.

pub mod shake;

pub use shake::{Domain, Shake128Xof, Shake256Xof, derive_seed};

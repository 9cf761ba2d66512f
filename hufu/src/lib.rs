#![no_std]

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod dsa;
pub mod hash;
pub mod rand;
pub mod utils;

// RE-EXPORTS
// ================================================================================================

pub use dsa::hufu::{Config, HuFu1, HuFu3, HuFu5, ParameterSet};

// CONSTANTS
// ================================================================================================

/// Number of bytes in every seed consumed by key generation and signing.
pub const SEED_BYTES: usize = 32;

// TESTS
// ================================================================================================

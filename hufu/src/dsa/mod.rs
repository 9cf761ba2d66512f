//! Digital signature schemes supported by this crate.

pub mod hufu;

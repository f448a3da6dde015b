//! Common building blocks shared across Tessera crates.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod collections;
pub mod hash;

//! Cryptography utilities for Adlite

pub mod encryption;
pub mod hash;

pub use encryption::*;
pub use hash::*;

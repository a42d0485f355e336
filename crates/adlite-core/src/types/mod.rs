//! Core types for Adlite

mod auth;
mod directory;
mod principal;

pub use auth::*;
pub use directory::*;
pub use principal::*;

//! Adlite Core Library
//!
//! Core types, configuration, and errors shared by the Adlite directory
//! authentication crates.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::AdliteConfig;
pub use error::{Error, Result};

/// Adlite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default base DN served by the directory
pub const DEFAULT_BASE_DN: &str = "dc=mycompany,dc=com";

/// Default ticket realm
pub const DEFAULT_REALM: &str = "DOMAIN.COM";

/// Suffix carried by machine account names (`WORKSTATION1$`)
pub const MACHINE_ACCOUNT_SUFFIX: char = '$';

/// Maximum principal name length accepted from a bind DN
pub const MAX_PRINCIPAL_LENGTH: usize = 256;

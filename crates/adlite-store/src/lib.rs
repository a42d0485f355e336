//! Directory storage for Adlite
//!
//! The authentication core consumes the directory through the
//! [`DirectoryStore`] trait. Two backends are provided: SQLite (via sqlx)
//! for deployments and an in-memory store for tests and simulations.

pub mod memory;
pub mod repository;
pub mod traits;

pub use memory::MemoryDirectoryStore;
pub use repository::SqliteDirectoryStore;
pub use traits::*;

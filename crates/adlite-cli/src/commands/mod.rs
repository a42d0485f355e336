//! CLI command implementations

pub mod bind;
pub mod group;
pub mod seed;
pub mod show_config;
pub mod user;

use adlite_core::AdliteConfig;
use adlite_store::SqliteDirectoryStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::OutputFormat;

/// Context passed to all commands
pub struct CommandContext {
    pub config: AdliteConfig,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Open the configured directory database, creating the schema if needed
    pub async fn open_store(&self) -> Result<Arc<SqliteDirectoryStore>> {
        let store = SqliteDirectoryStore::new(
            &self.config.database.url,
            self.config.database.max_connections,
        )
        .await
        .with_context(|| format!("Failed to open directory at {}", self.config.database.url))?;

        Ok(Arc::new(store))
    }

    pub fn base_dn(&self) -> &str {
        &self.config.server.base_dn
    }
}

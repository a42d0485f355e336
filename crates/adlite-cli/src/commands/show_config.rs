//! show-config command - print the effective configuration

use super::CommandContext;
use anyhow::Result;

pub fn execute(ctx: &CommandContext) -> Result<()> {
    if ctx.is_json() {
        ctx.print_json(&ctx.config)
    } else {
        print!("{}", toml::to_string_pretty(&ctx.config)?);
        Ok(())
    }
}

//! Adlite - directory authentication core
//!
//! Administrative and test-bind front end over the directory store and the
//! authentication stack.

mod commands;

use adlite_core::AdliteConfig;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "adlite")]
#[command(author = "Adlite Team")]
#[command(version = adlite_core::VERSION)]
#[command(about = "Directory authentication core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ADLITE_CONFIG")]
    config: Option<String>,

    /// Directory database URL
    #[arg(long, global = true, env = "ADLITE_DATABASE_URL")]
    database: Option<String>,

    /// Directory base DN
    #[arg(long, global = true, env = "AD_BASE_DN")]
    base_dn: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ADLITE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo principals and groups
    Seed,

    /// Add a principal
    AddUser {
        /// sAMAccountName
        name: String,

        /// Secret to store (hashed)
        #[arg(short, long)]
        password: String,

        /// userPrincipalName, derived from the base DN when omitted
        #[arg(long)]
        upn: Option<String>,

        /// Create the account disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Replace a principal's secret
    SetPassword {
        name: String,

        #[arg(short, long)]
        password: String,
    },

    /// Add a group
    AddGroup {
        cn: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add a principal to a group
    AddMember { principal: String, group: String },

    /// Check group membership
    CheckMember { principal: String, group: String },

    /// List the groups of a principal
    Groups { principal: String },

    /// Run a bind through the authentication stack
    Bind {
        /// Bind DN; built from --user and the base DN when omitted
        #[arg(long, conflicts_with = "user")]
        dn: Option<String>,

        /// Principal name
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long)]
        password: String,

        /// Authentication method (basic, kerberos)
        #[arg(short, long)]
        method: Option<String>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        AdliteConfig::from_file(config_path)?
    } else {
        AdliteConfig::from_env()
    };

    // Override with CLI args
    if let Some(database) = cli.database {
        config.database.url = database;
    }
    if let Some(base_dn) = cli.base_dn {
        config.server.base_dn = base_dn;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config);
    config.validate()?;

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Seed => commands::seed::execute(&ctx).await,
        Commands::AddUser {
            name,
            password,
            upn,
            disabled,
        } => commands::user::add(&ctx, &name, &password, upn, disabled).await,
        Commands::SetPassword { name, password } => {
            commands::user::set_password(&ctx, &name, &password).await
        }
        Commands::AddGroup { cn, description } => {
            commands::group::add(&ctx, &cn, description).await
        }
        Commands::AddMember { principal, group } => {
            commands::group::add_member(&ctx, &principal, &group).await
        }
        Commands::CheckMember { principal, group } => {
            commands::group::check_member(&ctx, &principal, &group).await
        }
        Commands::Groups { principal } => commands::group::list(&ctx, &principal).await,
        Commands::Bind {
            dn,
            user,
            password,
            method,
        } => commands::bind::execute(&ctx, dn, user, &password, method).await,
        Commands::ShowConfig => commands::show_config::execute(&ctx),
    }
}

fn init_logging(config: &AdliteConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr so command output stays machine-readable
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

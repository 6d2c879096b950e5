//! Command-line interface for config-stage
//!
//! Thin caller over the library: read and edit active configuration, compare
//! it with staging, and run imports and exports.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod object;
mod sync;
mod utils;

/// Layered configuration storage with runtime overrides and staged import
#[derive(Parser)]
#[command(name = "config-stage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to config-stage.toml/.yml in the current directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a configuration object or one of its keys
    Get(object::GetArgs),

    /// Set a key on a configuration object and save it
    Set(object::SetArgs),

    /// Delete a configuration object from active storage
    Delete(object::DeleteArgs),

    /// List configuration object names
    List(object::ListArgs),

    /// Show what an import would change
    Status,

    /// Import staged configuration into active storage
    Import(sync::ImportArgs),

    /// Replace staged configuration with the active configuration
    Export,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let ctx = utils::CliContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Get(args) => object::get(&ctx, args),
        Commands::Set(args) => object::set(&ctx, args),
        Commands::Delete(args) => object::delete(&ctx, args),
        Commands::List(args) => object::list(&ctx, args),
        Commands::Status => sync::status(&ctx),
        Commands::Import(args) => sync::import(&ctx, args),
        Commands::Export => sync::export(&ctx),
    }
}

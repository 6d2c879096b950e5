//! Commands operating on single configuration objects.

use anyhow::{Context, Result};
use clap::Args;
use config_stage::storage::file::parse_value;
use config_stage::OverrideMode;

use super::utils::CliContext;

#[derive(Args)]
pub struct GetArgs {
    /// Configuration name, e.g. system.site
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Dotted key path inside the object
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// Show the stored value, ignoring runtime overrides
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct SetArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(value_name = "KEY")]
    pub key: String,

    /// Value, parsed as YAML (`42`, `true`, `~`, `[a, b]`, plain text)
    #[arg(value_name = "VALUE")]
    pub value: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only names starting with this prefix
    #[arg(value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// List staging instead of active storage
    #[arg(long)]
    pub staging: bool,
}

pub fn get(ctx: &CliContext, args: GetArgs) -> Result<()> {
    let mode = if args.raw { OverrideMode::Bypass } else { OverrideMode::Apply };
    let config = ctx.factory.get_with(&args.name, mode)?;

    let rendered = match &args.key {
        Some(key) => {
            let value = config
                .get(key)
                .with_context(|| format!("Key '{}' not found in {}", key, args.name))?;
            serde_yaml::to_string(&value)?
        }
        None => {
            let data = config.data();
            if config.is_new() && data.is_empty() {
                anyhow::bail!("Configuration {} does not exist", args.name);
            }
            serde_yaml::to_string(&data)?
        }
    };
    print!("{}", rendered);
    Ok(())
}

pub fn set(ctx: &CliContext, args: SetArgs) -> Result<()> {
    let value = parse_value(&args.value)
        .map_err(|e| anyhow::anyhow!("Invalid value '{}': {}", args.value, e))?;

    // Edits never see overrides, so the saved object is exactly what was typed.
    let mut config = ctx.factory.get_with(&args.name, OverrideMode::Bypass)?;
    config.set(&args.key, value).save()?;
    println!("Saved {}", args.name);
    Ok(())
}

pub fn delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let mut config = ctx.factory.get_with(&args.name, OverrideMode::Bypass)?;
    if config.is_new() {
        anyhow::bail!("Configuration {} does not exist", args.name);
    }
    config.delete()?;
    println!("Deleted {}", args.name);
    Ok(())
}

pub fn list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let names = if args.staging {
        ctx.staging.list_all(args.prefix.as_deref())?
    } else {
        ctx.factory.list_all(args.prefix.as_deref())?
    };
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

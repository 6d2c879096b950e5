//! Status, import and export between staging and active storage.

use anyhow::Result;
use clap::Args;
use config_stage::storage::replace_storage_data;
use config_stage::{ImportError, ImportReport};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};

use super::utils::CliContext;

#[derive(Args)]
pub struct ImportArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the import report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn status(ctx: &CliContext) -> Result<()> {
    let changes = ctx.importer().changelist()?;
    for name in &changes.invalid {
        println!("{} {} (invalid name)", style("skip").dim(), name);
    }
    if !changes.has_changes() {
        println!("No configuration changes to import.");
        return Ok(());
    }

    for name in &changes.create {
        println!("{} {}", style("create").green(), name);
    }
    for name in &changes.update {
        println!("{} {}", style("update").yellow(), name);
    }
    for name in &changes.delete {
        println!("{} {}", style("delete").red(), name);
    }
    Ok(())
}

pub fn import(ctx: &CliContext, args: ImportArgs) -> Result<()> {
    let importer = ctx.importer();
    let changes = importer.changelist()?;
    if !changes.has_changes() {
        println!("No configuration changes to import.");
        return Ok(());
    }

    if !args.yes {
        let total = changes.create.len() + changes.update.len() + changes.delete.len();
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Import {} configuration changes?", total))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Import cancelled.");
            return Ok(());
        }
    }

    match importer.import() {
        Ok(report) => {
            print_report(&report, args.json)?;
            Ok(())
        }
        Err(ImportError::Failed { failures, report }) => {
            print_report(&report, args.json)?;
            for failure in &failures {
                eprintln!("{} {}", style("failed").red().bold(), failure);
            }
            anyhow::bail!("Import failed for {} configuration objects", failures.len())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn export(ctx: &CliContext) -> Result<()> {
    let active = ctx.factory.storage();
    let copied = replace_storage_data(active.as_ref(), ctx.staging.as_ref())?;
    println!("Exported {} configuration objects to staging.", copied);
    Ok(())
}

fn print_report(report: &ImportReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "Imported configuration: {} created, {} updated, {} deleted, {} unchanged.",
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.unchanged.len()
    );
    Ok(())
}

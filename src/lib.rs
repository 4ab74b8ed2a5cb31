use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use crate::args::{Args, Command, ImportArgs, SchemaArgs};
use crate::databases::traits::{DestinationWriter, SourceReader};
use crate::error::Error;
use crate::migration::ImportRun;
use crate::plan::ImportPlan;
use crate::schema::ApplyOutcome;

pub mod analyze;
pub mod args;
pub mod databases;
pub mod error;
pub mod importer;
pub mod maintenance;
pub mod migration;
pub mod order;
pub mod plan;
pub mod progress;
pub mod report;
pub mod sanitize;
pub mod schema;
pub mod verify;

#[cfg(test)]
mod test_utils;

/// Translates the source schema and writes it to `args.output`.
pub fn write_schema(
    source: &mut dyn SourceReader,
    args: &SchemaArgs,
    tables: &[String],
) -> anyhow::Result<String> {
    let script = schema::translate_schema(source, tables, args.drop_existing)?
        .render(&source.database_name(), Utc::now());
    std::fs::write(&args.output, &script)
        .with_context(|| format!("Unable to write schema to {}", args.output.display()))?;
    info!("Schema written to {}", args.output.display());
    return Ok(script);
}

/// Applies `script` and lists the resulting destination tables.
pub fn apply_schema(
    destination: &mut dyn DestinationWriter,
    script: &str,
) -> anyhow::Result<ApplyOutcome> {
    let outcome = schema::apply_script(destination, script);
    let tables = destination
        .get_tables()
        .context("Unable to list destination tables")?;
    info!("Destination has {} tables", tables.len());
    for (table, columns) in &tables {
        info!("{table}: {columns} columns");
    }
    return Ok(outcome);
}

fn load_plan(path: Option<&Path>) -> anyhow::Result<ImportPlan> {
    return match path {
        Some(path) => ImportPlan::load(path),
        None => Ok(ImportPlan::default()),
    };
}

pub fn import(
    source: &mut dyn SourceReader,
    destination: &mut dyn DestinationWriter,
    args: &ImportArgs,
) -> anyhow::Result<()> {
    let plan = load_plan(args.plan.as_deref())?;
    let report = ImportRun::new(source, destination, plan, args).run(&args.table)?;
    report.write(&args.report)?;
    info!("Report written to {}", args.report.display());
    return Ok(());
}

pub fn run(args: Args) -> Result<(), Error> {
    match args.command {
        Command::Analyze { output } => {
            let mut source = args.source.connect()?;
            analyze::analyze(&mut source)?.write(&output)?;
            info!("Analysis written to {}", output.display());
        }
        Command::Schema { schema, table } => {
            let mut source = args.source.connect()?;
            write_schema(&mut source, &schema, &table)?;
        }
        Command::ApplySchema { input } => {
            let script = std::fs::read_to_string(&input)
                .with_context(|| format!("Unable to read schema {}", input.display()))?;
            let mut destination = args.destination.connect()?;
            apply_schema(&mut destination, &script)?;
        }
        Command::Import(import_args) => {
            let mut source = args.source.connect()?;
            let mut destination = args.destination.connect()?;
            import(&mut source, &mut destination, &import_args)?;
        }
        Command::Migrate { schema, import: import_args } => {
            let mut source = args.source.connect()?;
            let mut destination = args.destination.connect()?;
            let script = write_schema(&mut source, &schema, &import_args.table)?;
            apply_schema(&mut destination, &script)?;
            import(&mut source, &mut destination, &import_args)?;
        }
        Command::Compare => {
            let mut source = args.source.connect()?;
            let mut destination = args.destination.connect()?;
            verify::compare_tables(&mut source, &mut destination)?;
        }
        Command::DropAll => {
            let mut destination = args.destination.connect()?;
            maintenance::drop_all(&mut destination)?;
        }
    }
    return Ok(());
}

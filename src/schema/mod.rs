use anyhow::Context;
use tracing::{debug, info};

use crate::databases::traits::SourceReader;

pub mod apply;
pub mod ddl;
pub mod typemap;

pub use apply::{ApplyMode, ApplyOutcome, apply_script, split_statements};
pub use ddl::{SchemaScript, TableSchema};

pub const DEFAULT_SCHEMA_FILE: &str = "postgresql-schema.sql";

/// Introspects `tables` (every source table when empty) and builds the DDL script.
pub fn translate_schema(
    source: &mut dyn SourceReader,
    tables: &[String],
    drop_existing: bool,
) -> anyhow::Result<SchemaScript> {
    let names = if tables.is_empty() {
        source.get_tables().context("Unable to list source tables")?
    } else {
        tables.to_vec()
    };
    let mut schemas = Vec::with_capacity(names.len());
    for name in names {
        let table = source
            .describe_table(&name)
            .with_context(|| format!("Unable to describe table {name}"))?;
        let indexes = source
            .get_indexes(&name)
            .with_context(|| format!("Unable to list indexes of {name}"))?;
        debug!(
            "Table {name}: {} columns, {} indexes, {} foreign keys",
            table.columns.len(),
            indexes.len(),
            table.foreign_keys.len()
        );
        schemas.push(TableSchema { table, indexes });
    }
    info!("Translated {} tables", schemas.len());
    return Ok(SchemaScript::new(schemas, drop_existing));
}

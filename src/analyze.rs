use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use tracing::{info, warn};

use crate::databases::table::{IndexDescriptor, TableDescriptor, TableStats};
use crate::databases::traits::SourceReader;

pub const DEFAULT_ANALYSIS_FILE: &str = "mysql-analysis.json";

const LARGEST_TABLES: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableStructure {
    #[serde(flatten)]
    pub table: TableDescriptor,
    pub indexes: Vec<IndexDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceAnalysis {
    pub timestamp: DateTime<Utc>,
    pub database: String,
    pub tables: Vec<TableStats>,
    pub structure: Vec<TableStructure>,
}

impl SourceAnalysis {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Unable to write analysis {}", path.display()))?;
        return Ok(());
    }
}

/// Collects statistics and structure of every source table. Tables that
/// cannot be described are logged and left out of `structure`.
pub fn analyze(source: &mut dyn SourceReader) -> anyhow::Result<SourceAnalysis> {
    let tables = source
        .get_table_stats()
        .context("Unable to get source table statistics")?;
    info!("Found {} tables in {}", tables.len(), source.database_name());

    let mut largest: Vec<&TableStats> = tables.iter().collect();
    largest.sort_by(|a, b| b.estimated_rows.cmp(&a.estimated_rows));
    for stats in largest.iter().take(LARGEST_TABLES) {
        info!(
            "{}: ~{} rows, {} KB data, {} KB index",
            stats.name,
            stats.estimated_rows.to_formatted_string(&Locale::en),
            stats.data_kb.to_formatted_string(&Locale::en),
            stats.index_kb.to_formatted_string(&Locale::en),
        );
    }

    let mut structure = Vec::with_capacity(tables.len());
    for stats in &tables {
        let described = source.describe_table(&stats.name).and_then(|table| {
            let indexes = source.get_indexes(&stats.name)?;
            return Ok(TableStructure { table, indexes });
        });
        match described {
            Ok(table) => structure.push(table),
            Err(err) => warn!("Unable to describe {}: {err:#}", stats.name),
        }
    }
    return Ok(SourceAnalysis {
        timestamp: Utc::now(),
        database: source.database_name(),
        tables,
        structure,
    });
}

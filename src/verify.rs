use std::collections::BTreeSet;

use anyhow::Context;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use tracing::{info, warn};

use crate::databases::traits::{DestinationWriter, SourceReader};
use crate::importer::{DanglingCheck, DanglingPolicy, ImportResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub expected: u64,
    /// `None` when the destination table could not be counted
    pub actual: Option<u64>,
}

impl TableCheck {
    pub fn is_match(&self) -> bool {
        return self.actual == Some(self.expected);
    }
}

/// Rows of `result` expected in the destination once reconciliation deleted
/// the rows pointing nowhere.
fn expected_rows(result: &ImportResult, dangling: &[DanglingCheck]) -> u64 {
    let deleted: u64 = dangling
        .iter()
        .filter(|check| {
            check.policy == DanglingPolicy::Delete && check.foreign_key.table == result.table
        })
        .map(|check| check.resolved)
        .sum();
    return result.imported.saturating_sub(deleted);
}

/// Re-counts every imported table and compares with what the importer
/// reported. Mismatches are warnings only.
pub fn verify_counts(
    destination: &mut dyn DestinationWriter,
    results: &[ImportResult],
    dangling: &[DanglingCheck],
) -> Vec<TableCheck> {
    let mut checks = Vec::with_capacity(results.len());
    for result in results {
        let actual = match destination.count_rows(&result.table) {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("Unable to count rows of {}: {err:#}", result.table);
                None
            }
        };
        let check = TableCheck {
            table: result.table.clone(),
            expected: expected_rows(result, dangling),
            actual,
        };
        if check.is_match() {
            info!("{}: {} rows", check.table, check.expected);
        } else if let Some(actual) = check.actual {
            warn!(
                "{}: expected {} rows, found {actual}",
                check.table, check.expected
            );
        }
        checks.push(check);
    }
    return checks;
}

/// Row counts of one table on both sides, `None` where the table is absent
/// or could not be counted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableComparison {
    pub table: String,
    pub source: Option<u64>,
    pub destination: Option<u64>,
}

impl TableComparison {
    pub fn is_match(&self) -> bool {
        return self.source.is_some() && self.source == self.destination;
    }

    pub fn describe(&self) -> String {
        let count = |rows: Option<u64>| {
            rows.map_or("-".to_string(), |rows| rows.to_formatted_string(&Locale::en))
        };
        return format!(
            "{}: source {}, destination {}",
            self.table,
            count(self.source),
            count(self.destination)
        );
    }
}

fn count_or_warn(side: &str, table: &str, count: anyhow::Result<u64>) -> Option<u64> {
    return match count {
        Ok(count) => Some(count),
        Err(err) => {
            warn!("Unable to count {side} rows of {table}: {err:#}");
            None
        }
    };
}

/// Lists every table of either side with its row count on both.
pub fn compare_tables(
    source: &mut dyn SourceReader,
    destination: &mut dyn DestinationWriter,
) -> anyhow::Result<Vec<TableComparison>> {
    let source_tables: BTreeSet<String> = source
        .get_tables()
        .context("Unable to list source tables")?
        .into_iter()
        .collect();
    let destination_tables: BTreeSet<String> = destination
        .get_tables()
        .context("Unable to list destination tables")?
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    let mut comparisons = Vec::new();
    for table in source_tables.union(&destination_tables) {
        let source_rows = source_tables
            .contains(table)
            .then(|| count_or_warn("source", table, source.count_rows(table)))
            .flatten();
        let destination_rows = destination_tables
            .contains(table)
            .then(|| count_or_warn("destination", table, destination.count_rows(table)))
            .flatten();
        comparisons.push(TableComparison {
            table: table.clone(),
            source: source_rows,
            destination: destination_rows,
        });
    }

    let missing: Vec<&str> = comparisons
        .iter()
        .filter(|c| source_tables.contains(&c.table) && !destination_tables.contains(&c.table))
        .map(|c| c.table.as_str())
        .collect();
    let extra: Vec<&str> = comparisons
        .iter()
        .filter(|c| !source_tables.contains(&c.table))
        .map(|c| c.table.as_str())
        .collect();
    info!(
        "Source tables: {}, destination tables: {}",
        source_tables.len(),
        destination_tables.len()
    );
    if !missing.is_empty() {
        warn!("Missing in the destination: {}", missing.join(", "));
    }
    if !extra.is_empty() {
        info!("Only in the destination: {}", extra.join(", "));
    }
    for comparison in comparisons
        .iter()
        .filter(|c| source_tables.contains(&c.table) && destination_tables.contains(&c.table))
    {
        if comparison.is_match() {
            info!("{}", comparison.describe());
        } else {
            warn!("{}", comparison.describe());
        }
    }
    return Ok(comparisons);
}

pub fn sample_lines(rows: &[Vec<Option<String>>]) -> Vec<String> {
    return rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let values: Vec<&str> = row
                .iter()
                .map(|value| value.as_deref().unwrap_or("NULL"))
                .collect();
            format!("{}. {}", i + 1, values.join(" | "))
        })
        .collect();
}

/// Runs the sample query and logs its rows. A failing query is only a warning.
pub fn print_sample(destination: &mut dyn DestinationWriter, query: &str) -> Vec<String> {
    let rows = match destination.query_text(query) {
        Ok(rows) => rows,
        Err(err) => {
            warn!("Sample query failed: {err:#}");
            return Vec::new();
        }
    };
    let lines = sample_lines(&rows);
    if lines.is_empty() {
        info!("Sample query returned no rows");
    }
    for line in &lines {
        info!("{line}");
    }
    return lines;
}

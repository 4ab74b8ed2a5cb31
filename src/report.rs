use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;

use crate::importer::{DanglingCheck, ImportResult};
use crate::verify::TableCheck;

pub const DEFAULT_REPORT_FILE: &str = "import-log.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub imported: u64,
    pub errors: u64,
    pub skipped: u64,
    pub source_rows: u64,
    pub failed_tables: u64,
}

impl Totals {
    fn from_results(results: &[ImportResult]) -> Self {
        let mut totals = Totals::default();
        for result in results {
            totals.imported += result.imported;
            totals.errors += result.errors;
            totals.skipped += result.skipped;
            totals.source_rows += result.total;
            if result.failure.is_some() {
                totals.failed_tables += 1;
            }
        }
        return totals;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub results: Vec<ImportResult>,
    pub totals: Totals,
    pub verification: Vec<TableCheck>,
    pub dangling: Vec<DanglingCheck>,
}

fn fmt_count(count: u64) -> String {
    return count.to_formatted_string(&Locale::en);
}

impl RunReport {
    pub fn new(
        timestamp: DateTime<Utc>,
        duration: Duration,
        results: Vec<ImportResult>,
        verification: Vec<TableCheck>,
        dangling: Vec<DanglingCheck>,
    ) -> Self {
        return Self {
            timestamp,
            duration_secs: duration.as_secs_f64(),
            totals: Totals::from_results(&results),
            results,
            verification,
            dangling,
        };
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Unable to write report {}", path.display()))?;
        return Ok(());
    }

    /// One line per table plus a totals line.
    pub fn summary_lines(&self) -> Vec<String> {
        let width = self
            .results
            .iter()
            .map(|r| r.table.len())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<String> = self
            .results
            .iter()
            .map(|result| {
                let mut line = format!(
                    "{:<width$} {:>9} rows ({:.1}% success)",
                    result.table,
                    fmt_count(result.imported),
                    result.success_rate()
                );
                if result.errors > 0 {
                    line.push_str(&format!(", {} errors", fmt_count(result.errors)));
                }
                if result.skipped > 0 {
                    line.push_str(&format!(", {} skipped", fmt_count(result.skipped)));
                }
                if let Some(failure) = &result.failure {
                    line.push_str(&format!(", failed: {failure}"));
                }
                line
            })
            .collect();
        lines.push(format!(
            "Total: {} of {} rows imported, {} errors, {} skipped",
            fmt_count(self.totals.imported),
            fmt_count(self.totals.source_rows),
            fmt_count(self.totals.errors),
            fmt_count(self.totals.skipped),
        ));
        return lines;
    }
}

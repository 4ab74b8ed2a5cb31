use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::databases::traits::DestinationWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Whole script committed at once
    Transaction,
    /// Statement by statement after the transaction was rolled back
    Statements,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementFailure {
    pub statement: String,
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub mode: ApplyMode,
    pub executed: u64,
    pub failed: u64,
    pub failures: Vec<StatementFailure>,
}

/// Splits a script on `;` outside of quotes. Comment lines are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for line in script.lines() {
        if quote.is_none() && line.trim_start().starts_with("--") {
            continue;
        }
        for c in line.chars() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => quote = Some(c),
                None if c == ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                    continue;
                }
                None => {}
            }
            current.push(c);
        }
        current.push('\n');
    }
    let rest = current.trim();
    if !rest.is_empty() {
        statements.push(rest.to_string());
    }
    return statements;
}

pub fn apply_script(destination: &mut dyn DestinationWriter, script: &str) -> ApplyOutcome {
    let statements = split_statements(script);
    match destination.execute_script(script) {
        Ok(()) => {
            info!("Schema applied in a single transaction ({} statements)", statements.len());
            return ApplyOutcome {
                mode: ApplyMode::Transaction,
                executed: statements.len() as u64,
                failed: 0,
                failures: Vec::new(),
            };
        }
        Err(err) => {
            warn!("Schema transaction rolled back, applying statement by statement: {err:#}");
        }
    }

    let mut outcome = ApplyOutcome {
        mode: ApplyMode::Statements,
        executed: 0,
        failed: 0,
        failures: Vec::new(),
    };
    for statement in statements {
        match destination.execute(&statement) {
            Ok(()) => {
                debug!("Executed: {}", first_line(&statement));
                outcome.executed += 1;
            }
            Err(err) => {
                error!("Failed statement {}: {err:#}", first_line(&statement));
                outcome.failed += 1;
                outcome.failures.push(StatementFailure {
                    statement,
                    error: format!("{err:#}"),
                });
            }
        }
    }
    info!(
        "Schema applied: {} statements executed, {} failed",
        outcome.executed, outcome.failed
    );
    return outcome;
}

fn first_line(statement: &str) -> &str {
    return statement.lines().next().unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::databases::traits::MockDestinationWriter;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = "-- generated\nCREATE TABLE \"a\" (\n    \"x\" TEXT DEFAULT 'a;b'\n);\n\n-- indexes\nCREATE INDEX \"a_x\" ON \"a\" (\"x\");\nCREATE TABLE \"we;ird\" (\"y\" INTEGER);\n";

    #[test]
    fn test_split_statements() {
        assert_eq!(
            split_statements(SCRIPT),
            vec![
                "CREATE TABLE \"a\" (\n    \"x\" TEXT DEFAULT 'a;b'\n)".to_string(),
                "CREATE INDEX \"a_x\" ON \"a\" (\"x\")".to_string(),
                "CREATE TABLE \"we;ird\" (\"y\" INTEGER)".to_string(),
            ]
        );
    }

    #[test]
    fn test_split_keeps_dashes_inside_literals() {
        assert_eq!(
            split_statements("INSERT INTO t VALUES ('a\n-- not a comment');"),
            vec!["INSERT INTO t VALUES ('a\n-- not a comment')".to_string()]
        );
    }

    #[test]
    fn test_apply_in_transaction() {
        let mut destination = MockDestinationWriter::new();
        destination
            .expect_execute_script()
            .times(1)
            .returning(|_| Ok(()));
        destination.expect_execute().never();

        let outcome = apply_script(&mut destination, SCRIPT);

        assert_eq!(outcome.mode, ApplyMode::Transaction);
        assert_eq!(outcome.executed, 3);
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn test_fallback_counts_failures() {
        let mut destination = MockDestinationWriter::new();
        destination
            .expect_execute_script()
            .returning(|_| Err(anyhow::anyhow!("relation \"a\" already exists")));
        destination
            .expect_execute()
            .with(eq("CREATE TABLE \"a\" (\n    \"x\" TEXT DEFAULT 'a;b'\n)"))
            .returning(|_| Err(anyhow::anyhow!("relation \"a\" already exists")));
        destination.expect_execute().returning(|_| Ok(()));

        let outcome = apply_script(&mut destination, SCRIPT);

        assert_eq!(outcome.mode, ApplyMode::Statements);
        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].error, "relation \"a\" already exists");
    }
}

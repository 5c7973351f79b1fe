use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, info};

use crate::application::{Operation, Outcome, TellerService, parse_amount};
use crate::domain::{Balance, Cents};

/// One row of an operation script: `operation,amount`.
#[derive(Debug, Deserialize)]
struct ScriptRow {
    operation: String,
    amount: Option<String>,
}

/// A row that could not be turned into an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptError {
    pub line: usize,
    pub error: String,
}

/// An operation applied from the script, with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptEntry {
    pub line: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of replaying a script
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub applied: usize,
    pub rejected: usize,
    pub errors: Vec<ScriptError>,
    pub entries: Vec<ScriptEntry>,
    pub final_balance_cents: Balance,
}

/// Replays CSV operation scripts against a teller.
pub struct ScriptRunner<'a> {
    service: &'a mut TellerService,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(service: &'a mut TellerService) -> Self {
        Self { service }
    }

    /// Apply every row in order. Malformed rows are recorded and skipped;
    /// rejected operations are recorded as rejected outcomes.
    pub fn run<R: Read>(&mut self, reader: R) -> Result<ScriptReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|h| h == "operation") {
            bail!("script is missing the 'operation' column");
        }

        let mut applied = 0;
        let mut rejected = 0;
        let mut errors = Vec::new();
        let mut entries = Vec::new();

        // Blank lines are skipped by the reader, so take line numbers from its positions
        for result in csv_reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ScriptError {
                        line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            let row: ScriptRow = match record.deserialize(Some(&headers)) {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ScriptError {
                        line,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let operation = match parse_operation(&row) {
                Ok(op) => op,
                Err(error) => {
                    debug!(line, %error, "skipping script row");
                    errors.push(ScriptError { line, error });
                    continue;
                }
            };

            let outcome = self.service.apply(operation);
            if outcome.is_accepted() {
                applied += 1;
            } else {
                rejected += 1;
            }
            entries.push(ScriptEntry { line, outcome });
        }

        info!(
            applied,
            rejected,
            errors = errors.len(),
            balance = self.service.balance(),
            "script replay finished"
        );

        Ok(ScriptReport {
            applied,
            rejected,
            errors,
            entries,
            final_balance_cents: self.service.balance(),
        })
    }
}

fn parse_operation(row: &ScriptRow) -> std::result::Result<Operation, String> {
    let amount = row.amount.as_deref().filter(|s| !s.is_empty());

    let required_amount = || -> std::result::Result<Cents, String> {
        let amount = amount.ok_or_else(|| format!("'{}' requires an amount", row.operation))?;
        parse_amount(amount).map_err(|e| e.to_string())
    };

    match row.operation.to_lowercase().as_str() {
        "deposit" => Ok(Operation::Deposit(required_amount()?)),
        "withdraw" => Ok(Operation::Withdraw(required_amount()?)),
        "balance" => Ok(Operation::Balance),
        other => Err(format!("unknown operation '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str) -> (ScriptReport, TellerService) {
        let mut service = TellerService::open("Alice", 100000).unwrap();
        let report = ScriptRunner::new(&mut service)
            .run(script.as_bytes())
            .unwrap();
        (report, service)
    }

    #[test]
    fn test_replay_applies_rows_in_order() {
        let (report, service) = run("operation,amount\ndeposit,250.00\nwithdraw,100\nbalance,\n");
        assert_eq!(report.applied, 3);
        assert_eq!(report.rejected, 0);
        assert!(report.errors.is_empty());
        assert_eq!(report.final_balance_cents, 115000);
        assert_eq!(service.balance(), 115000);
        assert_eq!(report.entries[1].line, 3);
    }

    #[test]
    fn test_replay_records_rejections_without_stopping() {
        let (report, _) = run("operation,amount\nwithdraw,5000\ndeposit,-10\ndeposit,1\n");
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.entries[0].outcome.message(), "Invalid withdrawal amount.");
        assert_eq!(
            report.entries[1].outcome.message(),
            "Deposit amount must be positive."
        );
        assert_eq!(report.final_balance_cents, 100100);
    }

    #[test]
    fn test_replay_skips_malformed_rows() {
        let (report, _) = run("operation,amount\ntransfer,10\ndeposit,\nwithdraw,abc\nbalance\n");
        assert_eq!(report.applied, 1);
        assert_eq!(
            report.errors.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert!(report.errors[0].error.contains("unknown operation"));
        assert!(report.errors[1].error.contains("requires an amount"));
    }

    #[test]
    fn test_replay_is_case_insensitive_and_trims() {
        let (report, _) = run("operation , amount\n DEPOSIT , 1.50 \n");
        assert_eq!(report.applied, 1);
        assert_eq!(report.final_balance_cents, 100150);
    }

    #[test]
    fn test_replay_line_numbers_count_blank_lines() {
        let (report, _) = run("operation,amount\n\n\ndeposit,abc\n\nwithdraw,1\n");
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 4);
        assert!(report.errors[0].error.contains("Invalid money format 'abc'"));
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].line, 6);
    }

    #[test]
    fn test_replay_requires_operation_column() {
        let mut service = TellerService::open("Alice", 0).unwrap();
        let result = ScriptRunner::new(&mut service).run("op,amt\ndeposit,1\n".as_bytes());
        assert!(result.is_err());
    }
}

// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::io::Write;

use anyhow::Result;
use balance_ledger::application::TellerService;
use balance_ledger::cli::Cli;
use balance_ledger::domain::Account;
use clap::Parser;
use tempfile::NamedTempFile;

/// Alice's account from the classic walkthrough, opened with 1000.00
pub fn alice() -> Account {
    Account::new("Alice", 100000).unwrap()
}

/// Helper to open a teller for Alice with the given balance in cents
pub fn teller(initial: i64) -> TellerService {
    TellerService::open("Alice", initial).unwrap()
}

/// Write a CSV script to a temporary file and keep it alive for the test
pub fn script_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Run the CLI with the given arguments and capture stdout
pub fn run_cli(args: &[&str]) -> (Result<()>, String) {
    let mut argv = vec!["balance-ledger"];
    argv.extend_from_slice(args);

    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    let result = cli.run_with(&mut out);
    (result, String::from_utf8(out).unwrap())
}

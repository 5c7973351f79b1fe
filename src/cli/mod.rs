use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{Read, Write, stdin, stdout};

use crate::application::{Operation, Outcome, TellerService, parse_amount};
use crate::domain::{AccountSnapshot, format_cents};
use crate::io::{ScriptReport, ScriptRunner};

/// Balance Ledger - a validated single-account teller
#[derive(Parser)]
#[command(name = "balance-ledger")]
#[command(about = "Open an account, then deposit, withdraw or replay a script of operations")]
#[command(version)]
pub struct Cli {
    /// Account holder name
    #[arg(long, default_value = "Alice")]
    pub holder: String,

    /// Opening balance (e.g., "1000.00" or "1000")
    #[arg(short, long, default_value = "0.00", allow_negative_numbers = true)]
    pub initial: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deposit money into the account
    Deposit {
        /// Amount to deposit (e.g., "250.00" or "250")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Withdraw money from the account
    Withdraw {
        /// Amount to withdraw (e.g., "100.00" or "100")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Show the account balance
    Balance,

    /// Replay a CSV script of operations (header: operation,amount)
    Replay {
        /// Input file (stdin if omitted)
        #[arg(short = 'I', long)]
        input: Option<String>,
    },

    /// Run the classic walkthrough: open with 1000.00, deposit 250.00, withdraw 100.00
    Demo,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let mut out = stdout().lock();
        self.run_with(&mut out)
    }

    /// Run the command, writing results to `out`.
    pub fn run_with<W: Write>(self, out: &mut W) -> Result<()> {
        match self.command {
            Commands::Demo => run_demo(out, self.format),

            Commands::Deposit { ref amount } => {
                let operation = Operation::Deposit(
                    parse_amount(amount).context("Invalid amount format. Use '50.00' or '50'")?,
                );
                let mut service = self.open()?;
                run_single(&mut service, operation, out, self.format)
            }

            Commands::Withdraw { ref amount } => {
                let operation = Operation::Withdraw(
                    parse_amount(amount).context("Invalid amount format. Use '50.00' or '50'")?,
                );
                let mut service = self.open()?;
                run_single(&mut service, operation, out, self.format)
            }

            Commands::Balance => {
                let mut service = self.open()?;
                run_single(&mut service, Operation::Balance, out, self.format)
            }

            Commands::Replay { ref input } => {
                let mut service = self.open()?;
                let reader: Box<dyn Read> = match input {
                    Some(path) => Box::new(
                        std::fs::File::open(path)
                            .with_context(|| format!("Failed to open script '{}'", path))?,
                    ),
                    None => Box::new(stdin()),
                };

                let report = ScriptRunner::new(&mut service).run(reader)?;
                print_report(out, &service, &report, self.format)
            }
        }
    }

    fn open(&self) -> Result<TellerService> {
        TellerService::open_from_input(self.holder.clone(), &self.initial)
            .context("Could not open account")
    }
}

/// JSON output views. Serialized straight to text so balances wider than i64 survive.
#[derive(Serialize)]
struct SingleView<'a> {
    account: AccountSnapshot,
    outcome: &'a Outcome,
}

#[derive(Serialize)]
struct DemoView<'a> {
    account: AccountSnapshot,
    outcomes: &'a [Outcome],
}

#[derive(Serialize)]
struct ReplayView<'a> {
    account: AccountSnapshot,
    report: &'a ScriptReport,
}

fn run_single<W: Write>(
    service: &mut TellerService,
    operation: Operation,
    out: &mut W,
    format: OutputFormat,
) -> Result<()> {
    let outcome = service.apply(operation);

    match format {
        OutputFormat::Json => {
            let view = SingleView {
                account: service.snapshot(),
                outcome: &outcome,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        OutputFormat::Csv => {
            write_outcomes_csv(out, std::iter::once((None, &outcome)))?;
        }
        OutputFormat::Text => {
            if !matches!(operation, Operation::Balance) {
                writeln!(out, "{}", outcome.message())?;
            }
            writeln!(out, "{}", service.balance_line())?;
        }
    }

    if let Outcome::Rejected { message, .. } = &outcome {
        bail!("{} rejected: {}", operation, message);
    }
    Ok(())
}

fn run_demo<W: Write>(out: &mut W, format: OutputFormat) -> Result<()> {
    let mut service = TellerService::open("Alice", 100000)?;
    let operations = [
        Operation::Balance,
        Operation::Deposit(25000),
        Operation::Withdraw(10000),
        Operation::Balance,
    ];

    let outcomes: Vec<Outcome> = operations.iter().map(|op| service.apply(*op)).collect();

    match format {
        OutputFormat::Json => {
            let view = DemoView {
                account: service.snapshot(),
                outcomes: &outcomes,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        OutputFormat::Csv => {
            write_outcomes_csv(out, outcomes.iter().map(|o| (None, o)))?;
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                match outcome {
                    Outcome::Accepted {
                        operation: Operation::Balance,
                        balance_cents,
                        ..
                    } => writeln!(
                        out,
                        "{}'s current balance: ${}",
                        service.account().holder(),
                        format_cents(*balance_cents)
                    )?,
                    other => writeln!(out, "{}", other.message())?,
                }
            }
        }
    }
    Ok(())
}

fn print_report<W: Write>(
    out: &mut W,
    service: &TellerService,
    report: &ScriptReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let view = ReplayView {
                account: service.snapshot(),
                report,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        OutputFormat::Csv => {
            write_outcomes_csv(
                out,
                report.entries.iter().map(|e| (Some(e.line), &e.outcome)),
            )?;
        }
        OutputFormat::Text => {
            for entry in &report.entries {
                let marker = if entry.outcome.is_accepted() { "ok " } else { "err" };
                writeln!(
                    out,
                    "[{}] line {:>3}: {}",
                    marker,
                    entry.line,
                    entry.outcome.message()
                )?;
            }

            writeln!(out)?;
            writeln!(out, "  Applied:  {}", report.applied)?;
            writeln!(out, "  Rejected: {}", report.rejected)?;
            writeln!(out, "  Errors:   {}", report.errors.len())?;

            if !report.errors.is_empty() {
                writeln!(out, "\nErrors:")?;
                for error in report.errors.iter().take(10) {
                    writeln!(out, "  Line {}: {}", error.line, error.error)?;
                }
                if report.errors.len() > 10 {
                    writeln!(out, "  ... and {} more errors", report.errors.len() - 10)?;
                }
            }

            writeln!(out)?;
            writeln!(out, "{}", service.balance_line())?;
        }
    }
    Ok(())
}

fn write_outcomes_csv<'o, W: Write>(
    out: &mut W,
    outcomes: impl Iterator<Item = (Option<usize>, &'o Outcome)>,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(out);
    csv_writer.write_record(["line", "status", "operation", "amount", "message", "balance"])?;

    for (line, outcome) in outcomes {
        let (status, operation) = match outcome {
            Outcome::Accepted { operation, .. } => ("accepted", operation),
            Outcome::Rejected { operation, .. } => ("rejected", operation),
        };
        let amount = match operation {
            Operation::Deposit(a) | Operation::Withdraw(a) => format_cents(*a),
            Operation::Balance => String::new(),
        };

        csv_writer.write_record([
            line.map(|l| l.to_string()).unwrap_or_default(),
            status.to_string(),
            operation.as_str().to_string(),
            amount,
            outcome.message().to_string(),
            format_cents(outcome.balance_cents()),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

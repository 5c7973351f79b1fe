use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    Account, AccountSnapshot, Balance, Cents, LedgerError, format_cents, parse_cents,
};

use super::AppError;

/// A single request against the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "amount_cents", rename_all = "lowercase")]
pub enum Operation {
    Deposit(Cents),
    Withdraw(Cents),
    Balance,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deposit(_) => "deposit",
            Operation::Withdraw(_) => "withdraw",
            Operation::Balance => "balance",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Deposit(amount) | Operation::Withdraw(amount) => {
                write!(f, "{} {}", self.as_str(), format_cents(*amount))
            }
            Operation::Balance => write!(f, "{}", self.as_str()),
        }
    }
}

/// What happened when an operation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Accepted {
        operation: Operation,
        message: String,
        balance_cents: Balance,
    },
    Rejected {
        operation: Operation,
        message: String,
        balance_cents: Balance,
    },
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Accepted { message, .. } | Outcome::Rejected { message, .. } => message,
        }
    }

    pub fn balance_cents(&self) -> Balance {
        match self {
            Outcome::Accepted { balance_cents, .. } | Outcome::Rejected { balance_cents, .. } => {
                *balance_cents
            }
        }
    }
}

/// Shown for any rejected deposit.
pub const DEPOSIT_REJECTED: &str = "Deposit amount must be positive.";

/// Shown for any rejected withdrawal, whether the amount was not positive or too large.
pub const WITHDRAW_REJECTED: &str = "Invalid withdrawal amount.";

/// Receipt line for an accepted operation, e.g. "Deposited $250.00".
pub fn receipt_for(operation: Operation, balance: Balance) -> String {
    match operation {
        Operation::Deposit(amount) => format!("Deposited ${}", format_cents(amount)),
        Operation::Withdraw(amount) => format!("Withdrew ${}", format_cents(amount)),
        Operation::Balance => format!("Current balance: ${}", format_cents(balance)),
    }
}

/// Application service owning one account.
/// This is the primary interface for any client (CLI, script runner, tests).
pub struct TellerService {
    account: Account,
}

impl TellerService {
    /// Open a new account for `holder` with the given starting balance.
    pub fn open(holder: impl Into<String>, initial: Cents) -> Result<Self, AppError> {
        let account = Account::new(holder, initial).inspect_err(|e| {
            info!(initial, error = %e, "rejected account opening");
        })?;
        debug!(
            account = %account.id(),
            holder = account.holder(),
            balance = account.balance(),
            "opened account"
        );
        Ok(Self { account })
    }

    /// Open a new account from a decimal string such as "1000.00".
    pub fn open_from_input(holder: impl Into<String>, initial: &str) -> Result<Self, AppError> {
        Self::open(holder, parse_amount(initial)?)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn balance(&self) -> Balance {
        self.account.balance()
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        self.account.snapshot()
    }

    /// "Alice's current balance: $1150.00"
    pub fn balance_line(&self) -> String {
        format!(
            "{}'s current balance: ${}",
            self.account.holder(),
            format_cents(self.account.balance())
        )
    }

    pub fn deposit(&mut self, amount: Cents) -> Result<Balance, AppError> {
        let result = self.account.deposit(amount);
        self.log_result(Operation::Deposit(amount), &result);
        Ok(result?)
    }

    pub fn withdraw(&mut self, amount: Cents) -> Result<Balance, AppError> {
        let result = self.account.withdraw(amount);
        self.log_result(Operation::Withdraw(amount), &result);
        Ok(result?)
    }

    pub fn deposit_input(&mut self, amount: &str) -> Result<Balance, AppError> {
        self.deposit(parse_amount(amount)?)
    }

    pub fn withdraw_input(&mut self, amount: &str) -> Result<Balance, AppError> {
        self.withdraw(parse_amount(amount)?)
    }

    /// Apply an operation and describe the result. Rejections are reported in the
    /// outcome instead of being returned as errors.
    pub fn apply(&mut self, operation: Operation) -> Outcome {
        let (result, rejected_message) = match operation {
            Operation::Deposit(amount) => (self.account.deposit(amount), DEPOSIT_REJECTED),
            Operation::Withdraw(amount) => (self.account.withdraw(amount), WITHDRAW_REJECTED),
            Operation::Balance => {
                let balance = self.account.balance();
                return Outcome::Accepted {
                    operation,
                    message: receipt_for(operation, balance),
                    balance_cents: balance,
                };
            }
        };
        self.log_result(operation, &result);

        match result {
            Ok(balance) => Outcome::Accepted {
                operation,
                message: receipt_for(operation, balance),
                balance_cents: balance,
            },
            Err(_) => Outcome::Rejected {
                operation,
                message: rejected_message.to_string(),
                balance_cents: self.account.balance(),
            },
        }
    }

    fn log_result(&self, operation: Operation, result: &Result<Balance, LedgerError>) {
        match result {
            Ok(balance) => debug!(
                account = %self.account.id(),
                operation = %operation,
                balance,
                "operation accepted"
            ),
            Err(e) => info!(
                account = %self.account.id(),
                operation = %operation,
                balance = self.account.balance(),
                error = %e,
                "operation rejected"
            ),
        }
    }
}

/// Parse user input into cents, keeping the original text for the error message.
pub fn parse_amount(input: &str) -> Result<Cents, AppError> {
    parse_cents(input).map_err(|source| AppError::InvalidMoneyFormat {
        input: input.trim().to_string(),
        source,
    })
}

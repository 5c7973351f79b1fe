use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Balance, Cents};

pub type AccountId = Uuid;

/// Rejections raised by the guarded account operations.
/// A rejected operation never changes the account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("initial balance must not be negative (got {initial} cents)")]
    InvalidInitialBalance { initial: Cents },

    #[error("amount must be positive (got {amount} cents)")]
    InvalidAmount { amount: Cents },

    #[error("insufficient funds: balance {balance} cents, requested {requested} cents")]
    InsufficientFunds { balance: Balance, requested: Cents },
}

/// A single account holding a balance that never goes below zero.
///
/// The balance is private: `deposit` and `withdraw` are the only ways to change it.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    holder: String,
    balance: Balance,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Open an account. The holder label is informational and not validated.
    pub fn new(holder: impl Into<String>, initial_balance: Cents) -> Result<Self, LedgerError> {
        if initial_balance < 0 {
            return Err(LedgerError::InvalidInitialBalance {
                initial: initial_balance,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            holder: holder.into(),
            balance: initial_balance.into(),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    /// Add a strictly positive amount and return the new balance.
    pub fn deposit(&mut self, amount: Cents) -> Result<Balance, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        self.balance += Balance::from(amount);
        Ok(self.balance)
    }

    /// Remove a strictly positive amount no larger than the balance and return the new balance.
    /// Withdrawing the whole balance is allowed.
    pub fn withdraw(&mut self, amount: Cents) -> Result<Balance, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        let amount_cents = Balance::from(amount);
        if amount_cents > self.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }

        self.balance -= amount_cents;
        Ok(self.balance)
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            holder: self.holder.clone(),
            balance_cents: self.balance,
            created_at: self.created_at,
        }
    }
}

/// Read-only, serializable view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub holder: String,
    pub balance_cents: Balance,
    pub created_at: DateTime<Utc>,
}

use thiserror::Error;

use crate::domain::{LedgerError, ParseCentsError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid money format '{input}': {source}")]
    InvalidMoneyFormat {
        input: String,
        #[source]
        source: ParseCentsError,
    },
}

impl AppError {
    /// The ledger rejection behind this error, if any.
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            AppError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

use thiserror::Error;

use crate::domain::{AccountNumber, Cents, CustomerId};
use crate::storage::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountNumber),

    #[error("Insufficient funds in account {account}: balance {balance}, required {requested}")]
    InsufficientFunds {
        account: AccountNumber,
        balance: Cents,
        requested: Cents,
    },

    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Cents),

    #[error("Cannot transfer from account {0} to itself")]
    SelfTransfer(AccountNumber),

    #[error("Account already exists: {0}")]
    DuplicateAccount(AccountNumber),

    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountNumber),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),

    /// Fatal: the ledger cannot allocate any more of the named resource.
    #[error("Storage exhausted: {0}")]
    StorageExhausted(String),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AccountNotFound(account) => AppError::AccountNotFound(account),
            StoreError::DuplicateAccount(account) => AppError::DuplicateAccount(account),
            StoreError::PreconditionFailed {
                account,
                balance,
                delta,
            } => AppError::InsufficientFunds {
                account,
                balance,
                requested: delta.saturating_neg(),
            },
            StoreError::BalanceOverflow(account) => AppError::BalanceOverflow(account),
            StoreError::SameAccount(account) => AppError::SelfTransfer(account),
            StoreError::Exhausted(what) => AppError::StorageExhausted(what),
            StoreError::CustomerNotFound(id) => AppError::CustomerNotFound(id),
            StoreError::InvalidCustomer(reason) => AppError::InvalidCustomer(reason),
        }
    }
}

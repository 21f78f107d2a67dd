use thiserror::Error;

use crate::domain::{AccountNumber, Cents, CustomerId};

/// Failures raised by the in-memory stores. The application layer maps these
/// onto `AppError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountNumber),

    #[error("Account already exists: {0}")]
    DuplicateAccount(AccountNumber),

    #[error("Precondition failed on {account}: balance {balance}, delta {delta}")]
    PreconditionFailed {
        account: AccountNumber,
        balance: Cents,
        delta: Cents,
    },

    #[error("Balance overflow on {0}")]
    BalanceOverflow(AccountNumber),

    #[error("Paired change needs two distinct accounts, got {0} twice")]
    SameAccount(AccountNumber),

    #[error("Storage exhausted: {0}")]
    Exhausted(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),
}

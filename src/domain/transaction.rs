use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountNumber, Cents};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    /// Debit leg of a transfer, posted on the source account
    TransferOut,
    /// Credit leg of a transfer, posted on the destination account
    TransferIn,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
        }
    }

    /// True for entries that increase the account balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::TransferIn)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A committed balance change on one account.
/// Entries are immutable; the log never edits or removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionType,
    /// Account the entry is posted against
    pub account: AccountNumber,
    /// Always positive; direction comes from `kind`
    pub amount: Cents,
    pub note: Option<String>,
    /// Commit time, strictly increasing per account
    pub timestamp: DateTime<Utc>,
    /// Account balance right after this entry was committed
    pub balance_after: Cents,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        kind: TransactionType,
        account: AccountNumber,
        amount: Cents,
        timestamp: DateTime<Utc>,
        balance_after: Cents,
    ) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id,
            kind,
            account,
            amount,
            note: None,
            timestamp,
            balance_after,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Amount with the sign of its effect on the balance.
    pub fn signed_amount(&self) -> Cents {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

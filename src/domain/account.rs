use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, CustomerId};

/// Largest serial an account number can carry (`AC999999`).
pub const MAX_ACCOUNT_SERIAL: u64 = 999_999;

const ACCOUNT_PREFIX: &str = "AC";

/// Account identifier: `AC` followed by six zero-padded digits.
/// Zero padding makes the string order match the numeric order, which is
/// the order accounts are listed and locked in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountNumberError {
    #[error("account number '{0}' must look like AC000001")]
    Malformed(String),

    #[error("account serial {0} is outside 1..=999999")]
    OutOfRange(u64),
}

impl AccountNumber {
    pub fn from_serial(serial: u64) -> Result<Self, AccountNumberError> {
        if serial == 0 || serial > MAX_ACCOUNT_SERIAL {
            return Err(AccountNumberError::OutOfRange(serial));
        }
        Ok(Self(format!("{ACCOUNT_PREFIX}{serial:06}")))
    }

    pub fn parse(input: &str) -> Result<Self, AccountNumberError> {
        let normalized = input.trim().to_ascii_uppercase();
        let digits = normalized
            .strip_prefix(ACCOUNT_PREFIX)
            .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| AccountNumberError::Malformed(input.to_string()))?;

        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(AccountNumberError::Malformed(input.to_string())),
            Ok(_) => Ok(Self(normalized)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Some(AccountType::Checking),
            "savings" => Some(AccountType::Savings),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A customer's account. Callers only ever see snapshots; the authoritative
/// record lives in the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: AccountNumber,
    pub owner: CustomerId,
    pub account_type: AccountType,
    /// Never negative.
    pub balance: Cents,
    pub opened_at: DateTime<Utc>,
}

impl Account {
    pub fn new(number: AccountNumber, owner: CustomerId, account_type: AccountType) -> Self {
        Self {
            number,
            owner,
            account_type,
            balance: 0,
            opened_at: Utc::now(),
        }
    }
}

// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use tally::application::LedgerService;
use tally::domain::{AccountNumber, AccountType, Cents};

/// Helper to create an empty in-memory ledger
pub fn test_service() -> LedgerService {
    LedgerService::in_memory()
}

/// Test fixture: standard account setup
pub struct StandardAccounts;

impl StandardAccounts {
    /// Open a checking account for a fresh customer
    pub fn open(service: &LedgerService, name: &str) -> AccountNumber {
        service
            .open_account(name, &format!("{}@example.com", name.to_lowercase()), AccountType::Checking)
            .expect("open account")
    }

    /// Open accounts A and B, funding A with `amount`
    pub fn open_pair(service: &LedgerService, amount: Cents) -> (AccountNumber, AccountNumber) {
        let a = Self::open(service, "Alice");
        let b = Self::open(service, "Bob");
        if amount > 0 {
            service.deposit(&a, amount, None).expect("fund account");
        }
        (a, b)
    }

    pub fn balance(service: &LedgerService, number: &AccountNumber) -> Cents {
        service.get_account(number).expect("account exists").balance
    }
}

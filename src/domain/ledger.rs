use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{Account, AccountNumber, Cents, TotalCents, Transaction};

/// Replay the balance of a single account from its log entries.
/// Balance = sum of credits - sum of debits
pub fn compute_balance(account: &AccountNumber, transactions: &[Transaction]) -> TotalCents {
    transactions
        .iter()
        .filter(|tx| &tx.account == account)
        .map(|tx| TotalCents::from(tx.signed_amount()))
        .sum()
}

/// Replay balances for every account that appears in the log.
/// Sums are widened so a damaged log cannot overflow them.
pub fn compute_all_balances(transactions: &[Transaction]) -> HashMap<AccountNumber, TotalCents> {
    let mut balances: HashMap<AccountNumber, TotalCents> = HashMap::new();

    for tx in transactions {
        *balances.entry(tx.account.clone()).or_insert(0) += TotalCents::from(tx.signed_amount());
    }

    balances
}

/// An account whose stored balance disagrees with its replayed log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    pub account: AccountNumber,
    pub stored: Cents,
    pub replayed: TotalCents,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub total_balance: TotalCents,
    pub mismatches: Vec<BalanceMismatch>,
    pub negative_balances: Vec<AccountNumber>,
    /// Entries posted against accounts the store does not know
    pub orphan_entries: usize,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.mismatches.is_empty() && self.negative_balances.is_empty() && self.orphan_entries == 0
    }
}

/// Cross-check account snapshots against the transaction log.
pub fn build_integrity_report(accounts: &[Account], transactions: &[Transaction]) -> IntegrityReport {
    let replayed = compute_all_balances(transactions);

    let mismatches = accounts
        .iter()
        .filter_map(|account| {
            let replayed = replayed.get(&account.number).copied().unwrap_or(0);
            (replayed != TotalCents::from(account.balance)).then(|| BalanceMismatch {
                account: account.number.clone(),
                stored: account.balance,
                replayed,
            })
        })
        .collect();

    let negative_balances = accounts
        .iter()
        .filter(|account| account.balance < 0)
        .map(|account| account.number.clone())
        .collect();

    let known: HashSet<&AccountNumber> = accounts.iter().map(|a| &a.number).collect();
    let orphan_entries = transactions
        .iter()
        .filter(|tx| !known.contains(&tx.account))
        .count();

    IntegrityReport {
        account_count: accounts.len(),
        transaction_count: transactions.len(),
        total_balance: accounts
            .iter()
            .map(|a| TotalCents::from(a.balance))
            .sum(),
        mismatches,
        negative_balances,
        orphan_entries,
    }
}

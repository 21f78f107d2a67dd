use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{AccountNumber, Transaction};

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<Transaction>,
    /// Positions in `entries`, per account, in append order
    by_account: HashMap<AccountNumber, Vec<usize>>,
}

impl LogInner {
    fn push(&mut self, transaction: Transaction) {
        let position = self.entries.len();
        self.by_account
            .entry(transaction.account.clone())
            .or_default()
            .push(position);
        self.entries.push(transaction);
    }
}

/// Append-only, thread-safe transaction log.
///
/// Callers append while still holding the account lock of the change being
/// recorded, so per-account append order matches commit order. Entries built
/// through [`append_with`](Self::append_with) are stamped under the log's own
/// write lock, which keeps the whole log in timestamp order.
#[derive(Debug, Default)]
pub struct TransactionLog {
    inner: RwLock<LogInner>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, transaction: Transaction) {
        self.inner.write().push(transaction);
    }

    /// Build entries while holding the write lock and append them as one
    /// unit: readers see all of them or none. Timestamps taken inside `build`
    /// therefore never run backwards across the log.
    pub fn append_with<const N: usize>(
        &self,
        build: impl FnOnce() -> [Transaction; N],
    ) -> [Transaction; N] {
        let mut inner = self.inner.write();
        let transactions = build();
        for transaction in &transactions {
            inner.push(transaction.clone());
        }
        transactions
    }

    /// Entries posted against `account`, ordered by timestamp with ties kept
    /// in append order.
    pub fn by_account(&self, account: &AccountNumber) -> Vec<Transaction> {
        let inner = self.inner.read();
        let mut entries: Vec<Transaction> = inner
            .by_account
            .get(account)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&position| inner.entries[position].clone())
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort keeps append order for equal timestamps
        entries.sort_by_key(|tx| tx.timestamp);
        entries
    }

    /// Every entry in append order.
    pub fn entries(&self) -> Vec<Transaction> {
        self.inner.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Cents, TransactionType};
    use crate::storage::IdGenerator;

    fn number(serial: u64) -> AccountNumber {
        AccountNumber::from_serial(serial).unwrap()
    }

    fn entry(account: u64, amount: Cents, offset_secs: i64) -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            TransactionType::Deposit,
            number(account),
            amount,
            Utc::now() + Duration::seconds(offset_secs),
            amount,
        )
    }

    #[test]
    fn test_by_account_filters_and_orders() {
        let log = TransactionLog::new();
        log.append(entry(1, 300, 30));
        log.append(entry(2, 999, 0));
        log.append(entry(1, 100, 10));
        log.append(entry(1, 200, 20));

        let amounts: Vec<_> = log.by_account(&number(1)).iter().map(|tx| tx.amount).collect();

        assert_eq!(amounts, vec![100, 200, 300]);
        assert_eq!(log.by_account(&number(2)).len(), 1);
        assert!(log.by_account(&number(3)).is_empty());
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_equal_timestamps_keep_append_order() {
        let log = TransactionLog::new();
        let timestamp = Utc::now();
        let mut first = entry(1, 1, 0);
        let mut second = entry(1, 2, 0);
        first.timestamp = timestamp;
        second.timestamp = timestamp;

        log.append_with(|| [first, second]);

        let amounts: Vec<_> = log.by_account(&number(1)).iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![1, 2]);
    }

    #[test]
    fn test_entries_in_append_order() {
        let log = TransactionLog::new();
        assert!(log.is_empty());

        log.append(entry(2, 5, 10));
        log.append(entry(1, 7, 0));

        let accounts: Vec<_> = log.entries().into_iter().map(|tx| tx.account).collect();
        assert_eq!(accounts, vec![number(2), number(1)]);
    }

    #[test]
    fn test_concurrent_appends() {
        let log = TransactionLog::new();

        thread::scope(|scope| {
            for account in 1..=4 {
                let log = &log;
                scope.spawn(move || {
                    for _ in 0..250 {
                        log.append(entry(account, 1, 0));
                    }
                });
            }
        });

        assert_eq!(log.len(), 1000);
        for account in 1..=4 {
            assert_eq!(log.by_account(&number(account)).len(), 250);
        }
    }

    #[test]
    fn test_entries_stamped_inside_the_lock_stay_ordered() {
        let log = TransactionLog::new();
        let ids = IdGenerator::new();

        thread::scope(|scope| {
            for account in 1..=8 {
                let (log, ids) = (&log, &ids);
                scope.spawn(move || {
                    for _ in 0..500 {
                        log.append_with(|| {
                            let mut tx = entry(account, 1, 0);
                            tx.timestamp = ids.next_timestamp();
                            [tx]
                        });
                    }
                });
            }
        });

        let entries = log.entries();
        assert_eq!(entries.len(), 4000);
        assert!(entries.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
    }
}

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AccountNumber, TransactionId, MAX_ACCOUNT_SERIAL};

use super::StoreError;

/// Hands out account numbers, transaction ids and commit timestamps.
///
/// Account numbers come from an atomic counter, so concurrent account
/// openings can never observe the same serial. A serial that was handed out
/// but never stored leaves a gap; serials are never reused.
#[derive(Debug)]
pub struct IdGenerator {
    next_account_serial: AtomicU64,
    last_timestamp_micros: AtomicI64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start numbering at `serial` (clamped to at least 1).
    pub fn starting_at(serial: u64) -> Self {
        Self {
            next_account_serial: AtomicU64::new(serial.max(1)),
            last_timestamp_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Next account number, `AC000001` onwards.
    pub fn next_account_number(&self) -> Result<AccountNumber, StoreError> {
        let serial = self
            .next_account_serial
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |serial| {
                (serial <= MAX_ACCOUNT_SERIAL).then_some(serial + 1)
            })
            .map_err(|_| StoreError::Exhausted("account numbers".to_string()))?;

        AccountNumber::from_serial(serial)
            .map_err(|_| StoreError::Exhausted("account numbers".to_string()))
    }

    pub fn next_transaction_id(&self) -> TransactionId {
        Uuid::new_v4()
    }

    /// Strictly increasing UTC timestamp with microsecond resolution.
    /// Falls forward by one microsecond when the wall clock stalls or steps back.
    pub fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let previous = match self.last_timestamp_micros.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |last| Some(now.max(last.saturating_add(1))),
        ) {
            Ok(previous) | Err(previous) => previous,
        };
        let micros = now.max(previous.saturating_add(1));

        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn test_account_numbers_are_sequential() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_account_number().unwrap().as_str(), "AC000001");
        assert_eq!(ids.next_account_number().unwrap().as_str(), "AC000002");
    }

    #[test]
    fn test_account_numbers_exhaust() {
        let ids = IdGenerator::starting_at(MAX_ACCOUNT_SERIAL);
        assert_eq!(ids.next_account_number().unwrap().as_str(), "AC999999");
        assert!(matches!(
            ids.next_account_number(),
            Err(StoreError::Exhausted(_))
        ));
        // Stays exhausted, never wraps around
        assert!(ids.next_account_number().is_err());
    }

    #[test]
    fn test_concurrent_account_numbers_are_unique() {
        let ids = IdGenerator::new();
        let numbers: Vec<AccountNumber> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..250)
                            .map(|_| ids.next_account_number().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), 2000);
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let ids = IdGenerator::new();
        let mut previous = ids.next_timestamp();
        for _ in 0..1000 {
            let next = ids.next_timestamp();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let ids = IdGenerator::new();
        assert_ne!(ids.next_transaction_id(), ids.next_transaction_id());
    }
}

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::domain::{Account, AccountNumber, AccountType, Cents, CustomerId};

use super::{IdGenerator, StoreError};

type Slot = Arc<Mutex<Account>>;

/// Precondition that always holds (credits).
pub fn always(_balance: Cents) -> bool {
    true
}

/// Precondition requiring the balance to cover `amount` (debits).
pub fn covers(amount: Cents) -> impl FnOnce(Cents) -> bool {
    move |balance| balance >= amount
}

/// One side of a paired balance change.
pub struct Leg<'a, P> {
    pub account: &'a AccountNumber,
    pub delta: Cents,
    pub precondition: P,
}

impl<'a, P> Leg<'a, P>
where
    P: FnOnce(Cents) -> bool,
{
    pub fn new(account: &'a AccountNumber, delta: Cents, precondition: P) -> Self {
        Self {
            account,
            delta,
            precondition,
        }
    }
}

/// Authoritative, concurrency-safe storage of account records.
///
/// Every account sits behind its own mutex and balances change only through
/// [`apply_delta`](Self::apply_delta) and [`apply_pair`](Self::apply_pair).
/// The map lock is never held while waiting on an account lock, and paired
/// changes lock accounts in account-number order, so two transfers running in
/// opposite directions cannot deadlock.
#[derive(Debug)]
pub struct AccountStore {
    ids: Arc<IdGenerator>,
    accounts: RwLock<BTreeMap<AccountNumber, Slot>>,
}

impl AccountStore {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            accounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open a zero-balance account under a freshly allocated number.
    pub fn create(
        &self,
        owner: CustomerId,
        account_type: AccountType,
    ) -> Result<AccountNumber, StoreError> {
        let number = self.ids.next_account_number()?;
        self.insert(Account::new(number.clone(), owner, account_type))?;
        debug!(account = %number, %owner, "account created");
        Ok(number)
    }

    /// Insert an existing record, e.g. when seeding the store.
    pub fn insert(&self, account: Account) -> Result<(), StoreError> {
        if account.balance < 0 {
            return Err(StoreError::PreconditionFailed {
                account: account.number,
                balance: account.balance,
                delta: 0,
            });
        }

        let mut accounts = self.accounts.write();
        match accounts.entry(account.number.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateAccount(account.number)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    /// Snapshot of a single account.
    pub fn get(&self, number: &AccountNumber) -> Result<Account, StoreError> {
        let slot = self.slot(number)?;
        let account = slot.lock().clone();
        Ok(account)
    }

    pub fn contains(&self, number: &AccountNumber) -> bool {
        self.accounts.read().contains_key(number)
    }

    /// Atomically check `precondition` against the current balance and, if it
    /// holds, add `delta`. Returns the new balance.
    pub fn apply_delta<P>(
        &self,
        number: &AccountNumber,
        delta: Cents,
        precondition: P,
    ) -> Result<Cents, StoreError>
    where
        P: FnOnce(Cents) -> bool,
    {
        self.apply_delta_with(number, delta, precondition, |_| ())
            .map(|(balance, ())| balance)
    }

    /// Like [`apply_delta`](Self::apply_delta), running `on_commit` on the
    /// updated record before the account lock is released.
    pub fn apply_delta_with<P, F, R>(
        &self,
        number: &AccountNumber,
        delta: Cents,
        precondition: P,
        on_commit: F,
    ) -> Result<(Cents, R), StoreError>
    where
        P: FnOnce(Cents) -> bool,
        F: FnOnce(&Account) -> R,
    {
        let slot = self.slot(number)?;
        let mut account = slot.lock();

        let balance = next_balance(&account, delta, precondition)?;
        account.balance = balance;
        debug!(account = %number, delta, balance, "delta applied");

        let output = on_commit(&account);
        Ok((balance, output))
    }

    /// Apply both legs or neither. Returns the new balances in call order.
    pub fn apply_pair<PA, PB>(
        &self,
        first: Leg<'_, PA>,
        second: Leg<'_, PB>,
    ) -> Result<(Cents, Cents), StoreError>
    where
        PA: FnOnce(Cents) -> bool,
        PB: FnOnce(Cents) -> bool,
    {
        self.apply_pair_with(first, second, |_, _| ())
            .map(|(balances, ())| balances)
    }

    /// Like [`apply_pair`](Self::apply_pair), running `on_commit` on both
    /// updated records (in call order) while both account locks are held.
    pub fn apply_pair_with<PA, PB, F, R>(
        &self,
        first: Leg<'_, PA>,
        second: Leg<'_, PB>,
        on_commit: F,
    ) -> Result<((Cents, Cents), R), StoreError>
    where
        PA: FnOnce(Cents) -> bool,
        PB: FnOnce(Cents) -> bool,
        F: FnOnce(&Account, &Account) -> R,
    {
        if first.account == second.account {
            return Err(StoreError::SameAccount(first.account.clone()));
        }

        let (first_slot, second_slot) = {
            let accounts = self.accounts.read();
            let lookup = |number: &AccountNumber| {
                accounts
                    .get(number)
                    .cloned()
                    .ok_or_else(|| StoreError::AccountNotFound(number.clone()))
            };
            (lookup(first.account)?, lookup(second.account)?)
        };

        // Lock order is account-number order, not call order.
        let (mut first_guard, mut second_guard) = if first.account < second.account {
            let first_guard = first_slot.lock();
            (first_guard, second_slot.lock())
        } else {
            let second_guard = second_slot.lock();
            (first_slot.lock(), second_guard)
        };

        let first_balance = next_balance(&first_guard, first.delta, first.precondition)?;
        let second_balance = next_balance(&second_guard, second.delta, second.precondition)?;

        first_guard.balance = first_balance;
        second_guard.balance = second_balance;
        debug!(
            first = %first.account,
            second = %second.account,
            first_delta = first.delta,
            second_delta = second.delta,
            "paired delta applied"
        );

        let output = on_commit(&first_guard, &second_guard);
        Ok(((first_balance, second_balance), output))
    }

    /// All accounts ordered by account number.
    pub fn list_all(&self) -> Vec<Account> {
        self.snapshot_slots()
            .iter()
            .map(|slot| slot.lock().clone())
            .collect()
    }

    /// Accounts owned by `owner`, ordered by account number.
    pub fn list_by_customer(&self, owner: CustomerId) -> Vec<Account> {
        self.snapshot_slots()
            .iter()
            .map(|slot| slot.lock().clone())
            .filter(|account| account.owner == owner)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    fn slot(&self, number: &AccountNumber) -> Result<Slot, StoreError> {
        self.accounts
            .read()
            .get(number)
            .cloned()
            .ok_or_else(|| StoreError::AccountNotFound(number.clone()))
    }

    /// Clone the slot handles so account locks are taken after the map lock
    /// is released.
    fn snapshot_slots(&self) -> Vec<Slot> {
        self.accounts.read().values().cloned().collect()
    }
}

/// Balance after applying `delta`, or the reason it cannot be applied.
/// A result below zero is refused even when the precondition allowed it.
fn next_balance<P>(account: &Account, delta: Cents, precondition: P) -> Result<Cents, StoreError>
where
    P: FnOnce(Cents) -> bool,
{
    let refused = || StoreError::PreconditionFailed {
        account: account.number.clone(),
        balance: account.balance,
        delta,
    };

    if !precondition(account.balance) {
        return Err(refused());
    }
    let balance = account
        .balance
        .checked_add(delta)
        .ok_or_else(|| StoreError::BalanceOverflow(account.number.clone()))?;
    if balance < 0 {
        return Err(refused());
    }
    Ok(balance)
}

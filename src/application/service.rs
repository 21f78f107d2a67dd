use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    build_integrity_report, Account, AccountNumber, AccountType, Cents, Customer, CustomerId,
    IntegrityReport, Transaction, TransactionType,
};
use crate::storage::{
    always, covers, AccountStore, CustomerDirectory, IdGenerator, InMemoryCustomerDirectory, Leg,
    StoreError, TransactionLog,
};

use super::AppError;

/// Application service providing the ledger's operations.
/// This is the primary interface for any client (CLI, tests, embedding code).
///
/// Every operation is atomic with respect to concurrent callers: it either
/// commits its balance change(s) together with the matching log entries, or
/// fails and leaves balances and the log untouched.
pub struct LedgerService {
    ids: Arc<IdGenerator>,
    accounts: AccountStore,
    log: TransactionLog,
    customers: Arc<dyn CustomerDirectory>,
}

/// Both legs of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub debit: Transaction,
    pub credit: Transaction,
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LedgerService {
    /// Assemble a service from its parts. `accounts` must draw its numbers
    /// from the same `ids` generator.
    pub fn new(
        ids: Arc<IdGenerator>,
        accounts: AccountStore,
        log: TransactionLog,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            ids,
            accounts,
            log,
            customers,
        }
    }

    /// Fresh, empty ledger with an in-memory customer directory.
    pub fn in_memory() -> Self {
        Self::with_customers(Arc::new(InMemoryCustomerDirectory::new()))
    }

    /// Fresh, empty ledger backed by the given customer directory.
    pub fn with_customers(customers: Arc<dyn CustomerDirectory>) -> Self {
        let ids = Arc::new(IdGenerator::new());
        let accounts = AccountStore::new(Arc::clone(&ids));
        Self::new(ids, accounts, TransactionLog::new(), customers)
    }

    // ========================
    // Account operations
    // ========================

    /// Register the customer and open a zero-balance account for them.
    /// The number is reserved first, so running out of numbers never leaves
    /// a customer without an account.
    pub fn open_account(
        &self,
        name: &str,
        email: &str,
        account_type: AccountType,
    ) -> Result<AccountNumber, AppError> {
        let number = self.ids.next_account_number()?;
        let customer = self.customers.create(name, email)?;
        self.accounts.insert(Account::new(number.clone(), customer, account_type))?;
        info!(account = %number, %customer, %account_type, "account opened");
        Ok(number)
    }

    pub fn get_account(&self, number: &AccountNumber) -> Result<Account, AppError> {
        Ok(self.accounts.get(number)?)
    }

    /// All accounts ordered by account number.
    pub fn list_accounts(&self) -> Vec<Account> {
        self.accounts.list_all()
    }

    /// Accounts owned by a customer, ordered by account number.
    pub fn list_customer_accounts(&self, customer: CustomerId) -> Result<Vec<Account>, AppError> {
        self.customers.get(customer)?;
        Ok(self.accounts.list_by_customer(customer))
    }

    pub fn get_customer(&self, customer: CustomerId) -> Result<Customer, AppError> {
        Ok(self.customers.get(customer)?)
    }

    /// Accounts of every customer whose name contains `query` (ignoring
    /// case), ordered by account number.
    pub fn search_accounts_by_customer_name(&self, query: &str) -> Vec<Account> {
        let mut found: Vec<Account> = self
            .customers
            .search(query.trim())
            .into_iter()
            .flat_map(|customer| self.accounts.list_by_customer(customer.id))
            .collect();
        found.sort_by(|a, b| a.number.cmp(&b.number));
        found
    }

    // ========================
    // Money movements
    // ========================

    pub fn deposit(
        &self,
        number: &AccountNumber,
        amount: Cents,
        note: Option<String>,
    ) -> Result<Transaction, AppError> {
        ensure_positive(amount)?;
        let note = normalize_note(note);

        let (_, transaction) = self
            .accounts
            .apply_delta_with(number, amount, always, |account| {
                let [transaction] = self.log.append_with(|| {
                    [self.record(
                        TransactionType::Deposit,
                        account,
                        amount,
                        self.ids.next_timestamp(),
                        note,
                    )]
                });
                transaction
            })
            .map_err(|error| refused("deposit", error))?;

        info!(
            account = %number,
            amount,
            balance = transaction.balance_after,
            "deposit committed"
        );
        Ok(transaction)
    }

    pub fn withdraw(
        &self,
        number: &AccountNumber,
        amount: Cents,
        note: Option<String>,
    ) -> Result<Transaction, AppError> {
        ensure_positive(amount)?;
        let note = normalize_note(note);

        let (_, transaction) = self
            .accounts
            .apply_delta_with(number, -amount, covers(amount), |account| {
                let [transaction] = self.log.append_with(|| {
                    [self.record(
                        TransactionType::Withdraw,
                        account,
                        amount,
                        self.ids.next_timestamp(),
                        note,
                    )]
                });
                transaction
            })
            .map_err(|error| refused("withdraw", error))?;

        info!(
            account = %number,
            amount,
            balance = transaction.balance_after,
            "withdrawal committed"
        );
        Ok(transaction)
    }

    /// Move `amount` from one account to another. Both legs share one
    /// timestamp; the debit is logged before the credit.
    pub fn transfer(
        &self,
        from: &AccountNumber,
        to: &AccountNumber,
        amount: Cents,
        note: Option<String>,
    ) -> Result<TransferReceipt, AppError> {
        if from == to {
            warn!(account = %from, "transfer to the same account refused");
            return Err(AppError::SelfTransfer(from.clone()));
        }
        ensure_positive(amount)?;
        let note = normalize_note(note);

        let (_, receipt) = self
            .accounts
            .apply_pair_with(
                Leg::new(from, -amount, covers(amount)),
                Leg::new(to, amount, always),
                |source, destination| {
                    let [debit, credit] = self.log.append_with(|| {
                        let timestamp = self.ids.next_timestamp();
                        [
                            self.record(
                                TransactionType::TransferOut,
                                source,
                                amount,
                                timestamp,
                                note.clone(),
                            ),
                            self.record(
                                TransactionType::TransferIn,
                                destination,
                                amount,
                                timestamp,
                                note,
                            ),
                        ]
                    });
                    TransferReceipt { debit, credit }
                },
            )
            .map_err(|error| refused("transfer", error))?;

        info!(
            from = %from,
            to = %to,
            amount,
            "transfer committed"
        );
        Ok(receipt)
    }

    // ========================
    // Queries
    // ========================

    /// Entries for an account ordered by timestamp. Fails for unknown
    /// accounts even though their statement would simply be empty.
    pub fn get_statement(&self, number: &AccountNumber) -> Result<Vec<Transaction>, AppError> {
        if !self.accounts.contains(number) {
            return Err(AppError::AccountNotFound(number.clone()));
        }
        Ok(self.log.by_account(number))
    }

    /// Every log entry in append order.
    pub fn list_all_transactions(&self) -> Vec<Transaction> {
        self.log.entries()
    }

    /// Replay the log and compare it with the stored balances.
    /// Only meaningful while no operation is in flight.
    pub fn check_integrity(&self) -> IntegrityReport {
        let accounts = self.accounts.list_all();
        let transactions = self.log.entries();
        let report = build_integrity_report(&accounts, &transactions);
        if !report.is_healthy() {
            warn!(
                mismatches = report.mismatches.len(),
                negative = report.negative_balances.len(),
                orphans = report.orphan_entries,
                "ledger integrity check failed"
            );
        }
        report
    }

    fn record(
        &self,
        kind: TransactionType,
        account: &Account,
        amount: Cents,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Transaction {
        Transaction::new(
            self.ids.next_transaction_id(),
            kind,
            account.number.clone(),
            amount,
            timestamp,
            account.balance,
        )
        .with_note(note)
    }
}

fn ensure_positive(amount: Cents) -> Result<(), AppError> {
    if amount <= 0 {
        warn!(amount, "non-positive amount refused");
        return Err(AppError::InvalidAmount(amount));
    }
    Ok(())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn refused(operation: &'static str, error: StoreError) -> AppError {
    let error = AppError::from(error);
    warn!(operation, %error, "operation refused");
    error
}

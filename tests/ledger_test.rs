mod common;

use anyhow::Result;
use common::{StandardAccounts, test_service};
use tally::application::AppError;
use tally::domain::{AccountNumber, AccountType, TransactionType};

#[test]
fn test_open_deposit_withdraw_scenario() -> Result<()> {
    let service = test_service();

    let account = service.open_account("Ada Lovelace", "ada@example.com", AccountType::Checking)?;
    service.deposit(&account, 10000, None)?;
    service.withdraw(&account, 4000, None)?;

    let statement = service.get_statement(&account)?;
    let entries: Vec<_> = statement.iter().map(|tx| (tx.kind, tx.amount)).collect();
    assert_eq!(
        entries,
        vec![
            (TransactionType::Deposit, 10000),
            (TransactionType::Withdraw, 4000)
        ]
    );
    assert_eq!(StandardAccounts::balance(&service, &account), 6000);

    Ok(())
}

#[test]
fn test_account_numbers_are_sequential() -> Result<()> {
    let service = test_service();

    let first = service.open_account("Ada", "ada@example.com", AccountType::Checking)?;
    let second = service.open_account("Bob", "bob@example.com", AccountType::Savings)?;

    assert_eq!(first.as_str(), "AC000001");
    assert_eq!(second.as_str(), "AC000002");

    let account = service.get_account(&second)?;
    assert_eq!(account.account_type, AccountType::Savings);
    assert_eq!(account.balance, 0);
    assert_eq!(service.get_customer(account.owner)?.email, "bob@example.com");

    Ok(())
}

#[test]
fn test_deposit_adds_amount_and_logs_once() -> Result<()> {
    let service = test_service();
    let account = StandardAccounts::open(&service, "Ada");
    service.deposit(&account, 2500, None)?;

    let tx = service.deposit(&account, 1234, Some("paycheck".into()))?;

    assert_eq!(tx.kind, TransactionType::Deposit);
    assert_eq!(tx.amount, 1234);
    assert_eq!(tx.balance_after, 3734);
    assert_eq!(tx.note.as_deref(), Some("paycheck"));
    assert_eq!(StandardAccounts::balance(&service, &account), 3734);
    assert_eq!(service.get_statement(&account)?.len(), 2);

    Ok(())
}

#[test]
fn test_non_positive_amounts_are_rejected() -> Result<()> {
    let service = test_service();
    let (a, b) = StandardAccounts::open_pair(&service, 1000);

    assert_eq!(service.deposit(&a, 0, None).unwrap_err(), AppError::InvalidAmount(0));
    assert_eq!(
        service.withdraw(&a, -5, None).unwrap_err(),
        AppError::InvalidAmount(-5)
    );
    assert_eq!(
        service.transfer(&a, &b, 0, None).unwrap_err(),
        AppError::InvalidAmount(0)
    );

    assert_eq!(StandardAccounts::balance(&service, &a), 1000);
    assert_eq!(service.list_all_transactions().len(), 1);

    Ok(())
}

#[test]
fn test_withdraw_more_than_balance_fails() -> Result<()> {
    let service = test_service();
    let account = StandardAccounts::open(&service, "Ada");
    service.deposit(&account, 50, None)?;

    let result = service.withdraw(&account, 100, None);

    assert_eq!(
        result.unwrap_err(),
        AppError::InsufficientFunds {
            account: account.clone(),
            balance: 50,
            requested: 100,
        }
    );
    assert_eq!(StandardAccounts::balance(&service, &account), 50);
    assert_eq!(service.get_statement(&account)?.len(), 1);

    Ok(())
}

#[test]
fn test_withdraw_entire_balance() -> Result<()> {
    let service = test_service();
    let account = StandardAccounts::open(&service, "Ada");
    service.deposit(&account, 700, None)?;

    let tx = service.withdraw(&account, 700, None)?;

    assert_eq!(tx.balance_after, 0);
    assert_eq!(StandardAccounts::balance(&service, &account), 0);

    Ok(())
}

#[test]
fn test_operations_on_missing_account() {
    let service = test_service();
    let missing = AccountNumber::parse("AC000404").unwrap();

    let not_found = AppError::AccountNotFound(missing.clone());
    assert_eq!(service.deposit(&missing, 10, None).unwrap_err(), not_found);
    assert_eq!(service.withdraw(&missing, 10, None).unwrap_err(), not_found);
    assert_eq!(service.get_account(&missing).unwrap_err(), not_found);
    assert_eq!(service.get_statement(&missing).unwrap_err(), not_found);
    assert!(service.list_all_transactions().is_empty());
}

#[test]
fn test_statement_of_new_account_is_empty() -> Result<()> {
    let service = test_service();
    let account = StandardAccounts::open(&service, "Ada");

    assert!(service.get_statement(&account)?.is_empty());

    Ok(())
}

#[test]
fn test_statement_is_ordered_and_signed() -> Result<()> {
    let service = test_service();
    let (a, b) = StandardAccounts::open_pair(&service, 5000);
    service.transfer(&a, &b, 1000, None)?;
    service.withdraw(&a, 500, None)?;
    service.transfer(&b, &a, 200, None)?;

    let statement = service.get_statement(&a)?;

    let timestamps: Vec<_> = statement.iter().map(|tx| tx.timestamp).collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));

    let signed: Vec<_> = statement.iter().map(|tx| tx.signed_amount()).collect();
    assert_eq!(signed, vec![5000, -1000, -500, 200]);

    let balances: Vec<_> = statement.iter().map(|tx| tx.balance_after).collect();
    assert_eq!(balances, vec![5000, 4000, 3500, 3700]);

    Ok(())
}

#[test]
fn test_list_accounts_sorted_by_number() -> Result<()> {
    let service = test_service();
    for name in ["Carol", "Alice", "Bob"] {
        StandardAccounts::open(&service, name);
    }

    let numbers: Vec<_> = service
        .list_accounts()
        .into_iter()
        .map(|account| account.number.to_string())
        .collect();

    assert_eq!(numbers, vec!["AC000001", "AC000002", "AC000003"]);

    Ok(())
}

#[test]
fn test_search_accounts_by_customer_name() -> Result<()> {
    let service = test_service();
    let grace = service.open_account("Grace Hopper", "grace@example.com", AccountType::Checking)?;
    service.open_account("Alan Turing", "alan@example.com", AccountType::Checking)?;
    let hopper_savings = service.open_account("Ruth Hopper", "ruth@example.com", AccountType::Savings)?;

    let found: Vec<_> = service
        .search_accounts_by_customer_name("HOPPER")
        .into_iter()
        .map(|account| account.number)
        .collect();
    assert_eq!(found, vec![grace, hopper_savings]);

    assert_eq!(service.search_accounts_by_customer_name("").len(), 3);
    assert!(service.search_accounts_by_customer_name("lovelace").is_empty());

    Ok(())
}

#[test]
fn test_integrity_after_activity() -> Result<()> {
    let service = test_service();
    let (a, b) = StandardAccounts::open_pair(&service, 9000);
    service.transfer(&a, &b, 4000, None)?;
    service.withdraw(&b, 1000, None)?;
    let _ = service.withdraw(&a, 1_000_000, None);

    let report = service.check_integrity();

    assert!(report.is_healthy());
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transaction_count, 4);
    assert_eq!(report.total_balance, 8000);

    Ok(())
}

#[test]
fn test_integrity_with_balances_near_the_limit() -> Result<()> {
    let service = test_service();
    let (a, b) = StandardAccounts::open_pair(&service, i64::MAX);
    service.deposit(&b, 1, None)?;

    let report = service.check_integrity();

    assert!(report.is_healthy());
    assert_eq!(report.total_balance, i128::from(i64::MAX) + 1);
    assert_eq!(StandardAccounts::balance(&service, &a), i64::MAX);

    Ok(())
}

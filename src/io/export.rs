use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_cents, Account, AccountNumber, Transaction};

/// Point-in-time copy of the whole ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for writing ledger data as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export one account's statement to CSV format
    pub fn export_statement_csv<W: Write>(&self, number: &AccountNumber, writer: W) -> Result<usize> {
        let statement = self.service.get_statement(number)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "timestamp",
            "type",
            "account",
            "amount",
            "balance_after",
            "note",
        ])?;

        for tx in &statement {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.timestamp.to_rfc3339(),
                tx.kind.as_str().to_string(),
                tx.account.to_string(),
                format_cents(tx.signed_amount()),
                format_cents(tx.balance_after),
                tx.note.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(statement.len())
    }

    /// Export every account with its balance to CSV format
    pub fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account", "type", "owner", "balance", "opened_at"])?;

        for account in &accounts {
            csv_writer.write_record([
                account.number.to_string(),
                account.account_type.as_str().to_string(),
                account.owner.to_string(),
                format_cents(account.balance),
                account.opened_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export the full ledger as a JSON snapshot
    pub fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.service.list_accounts(),
            transactions: self.service.list_all_transactions(),
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}

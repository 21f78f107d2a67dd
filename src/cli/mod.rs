use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, Account, AccountNumber, AccountType};
use crate::io::Exporter;
use crate::telemetry::LogFormat;

/// Tally - in-memory banking ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "An in-memory banking ledger driven by an interactive shell")]
#[command(version)]
pub struct Cli {
    /// Read commands from a file instead of standard input
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Do not print the prompt
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let service = LedgerService::in_memory();

        let input: Box<dyn BufRead> = match &self.script {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open script: {}", path.display()))?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(io::stdin().lock()),
        };
        let prompt = self.script.is_none() && !self.quiet;

        Shell::new(&service).run(input, io::stdout().lock(), prompt)
    }
}

/// One line of shell input. The first word names the command.
#[derive(Parser)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Open an account for a new customer
    Open {
        /// Customer name
        #[arg(long)]
        name: String,

        /// Customer email
        #[arg(long)]
        email: String,

        /// Account type: checking, savings
        #[arg(short = 't', long = "type", default_value = "checking")]
        account_type: String,
    },

    /// Deposit money into an account
    Deposit {
        /// Account number (e.g., AC000001)
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account number (e.g., AC000001)
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Source account number
        #[arg(long)]
        from: String,

        /// Destination account number
        #[arg(long)]
        to: String,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show balance for an account or all accounts
    Balance {
        /// Account number (omit for all accounts)
        account: Option<String>,
    },

    /// List all accounts
    Accounts,

    /// Show the transactions of an account, oldest first
    Statement {
        /// Account number
        account: String,
    },

    /// Find accounts by customer name
    Search {
        /// Part of the customer's name (case-insensitive)
        #[arg(default_value = "")]
        query: String,
    },

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, statement, snapshot
        export_type: String,

        /// Account number (required for statement)
        #[arg(short, long)]
        account: Option<String>,

        /// Output file (printed if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

/// Line-oriented command interpreter over a single ledger.
pub struct Shell<'a> {
    service: &'a LedgerService,
}

impl<'a> Shell<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Execute lines until input ends or `quit` is read. Command failures
    /// are reported on `out` and do not stop the shell.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut out: W, prompt: bool) -> Result<()> {
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(out, "tally> ")?;
                out.flush()?;
            }
            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read input")?;

            match self.execute(&line, &mut out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(error) => writeln!(out, "error: {:#}", error)?,
            }
        }
        Ok(())
    }

    fn execute<W: Write>(&self, line: &str, out: &mut W) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let words = shell_words::split(line).context("Failed to parse command line")?;
        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(error) => {
                // Help and usage errors render as text, not failures
                write!(out, "{}", error.render())?;
                return Ok(Flow::Continue);
            }
        };

        match parsed.command {
            ShellCommand::Open {
                name,
                email,
                account_type,
            } => {
                let account_type = AccountType::parse(&account_type).with_context(|| {
                    format!(
                        "Invalid account type '{}'. Valid types: checking, savings",
                        account_type
                    )
                })?;
                let number = self.service.open_account(&name, &email, account_type)?;
                writeln!(out, "Opened {} account {} for {}", account_type, number, name.trim())?;
            }

            ShellCommand::Deposit {
                account,
                amount,
                note,
            } => {
                let number = parse_account(&account)?;
                let tx = self.service.deposit(&number, parse_amount(&amount)?, note)?;
                writeln!(
                    out,
                    "Deposited {} into {} (balance {})",
                    format_cents(tx.amount),
                    tx.account,
                    format_cents(tx.balance_after)
                )?;
            }

            ShellCommand::Withdraw {
                account,
                amount,
                note,
            } => {
                let number = parse_account(&account)?;
                let tx = self.service.withdraw(&number, parse_amount(&amount)?, note)?;
                writeln!(
                    out,
                    "Withdrew {} from {} (balance {})",
                    format_cents(tx.amount),
                    tx.account,
                    format_cents(tx.balance_after)
                )?;
            }

            ShellCommand::Transfer {
                amount,
                from,
                to,
                note,
            } => {
                let from = parse_account(&from)?;
                let to = parse_account(&to)?;
                let receipt = self
                    .service
                    .transfer(&from, &to, parse_amount(&amount)?, note)?;
                writeln!(
                    out,
                    "Transferred {} {} -> {} ({})",
                    format_cents(receipt.debit.amount),
                    receipt.debit.account,
                    receipt.credit.account,
                    receipt.debit.id
                )?;
            }

            ShellCommand::Balance { account: Some(account) } => {
                let account = self.service.get_account(&parse_account(&account)?)?;
                writeln!(out, "{}: {}", account.number, format_cents(account.balance))?;
            }

            ShellCommand::Balance { account: None } | ShellCommand::Accounts => {
                self.print_accounts(&self.service.list_accounts(), out)?;
            }

            ShellCommand::Statement { account } => {
                self.print_statement(&parse_account(&account)?, out)?;
            }

            ShellCommand::Search { query } => {
                self.print_accounts(&self.service.search_accounts_by_customer_name(&query), out)?;
            }

            ShellCommand::Check => self.print_integrity(out)?,

            ShellCommand::Export {
                export_type,
                account,
                output,
            } => self.export(&export_type, account.as_deref(), output, out)?,

            ShellCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn print_accounts<W: Write>(&self, accounts: &[Account], out: &mut W) -> Result<()> {
        if accounts.is_empty() {
            writeln!(out, "No accounts found.")?;
            return Ok(());
        }

        writeln!(
            out,
            "{:<10} {:<10} {:<20} {:>12}",
            "ACCOUNT", "TYPE", "OWNER", "BALANCE"
        )?;
        writeln!(out, "{}", "-".repeat(55))?;
        for account in accounts {
            let owner = self
                .service
                .get_customer(account.owner)
                .map(|customer| customer.name)
                .unwrap_or_else(|_| "?".to_string());
            writeln!(
                out,
                "{:<10} {:<10} {:<20} {:>12}",
                account.number,
                account.account_type,
                truncate(&owner, 20),
                format_cents(account.balance)
            )?;
        }
        Ok(())
    }

    fn print_statement<W: Write>(&self, number: &AccountNumber, out: &mut W) -> Result<()> {
        let statement = self.service.get_statement(number)?;
        if statement.is_empty() {
            writeln!(out, "No transactions found.")?;
            return Ok(());
        }

        writeln!(
            out,
            "{:<20} {:<13} {:>12} {:>12} NOTE",
            "DATE", "TYPE", "AMOUNT", "BALANCE"
        )?;
        writeln!(out, "{}", "-".repeat(70))?;
        for tx in &statement {
            writeln!(
                out,
                "{:<20} {:<13} {:>12} {:>12} {}",
                tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                tx.kind,
                format_cents(tx.signed_amount()),
                format_cents(tx.balance_after),
                truncate(tx.note.as_deref().unwrap_or(""), 30)
            )?;
        }
        Ok(())
    }

    fn print_integrity<W: Write>(&self, out: &mut W) -> Result<()> {
        let report = self.service.check_integrity();

        writeln!(out, "Accounts:     {}", report.account_count)?;
        writeln!(out, "Transactions: {}", report.transaction_count)?;
        writeln!(out, "Total held:   {}", format_cents(report.total_balance))?;

        for mismatch in &report.mismatches {
            writeln!(
                out,
                "  MISMATCH {}: stored {}, replayed {}",
                mismatch.account,
                format_cents(mismatch.stored),
                format_cents(mismatch.replayed)
            )?;
        }
        for account in &report.negative_balances {
            writeln!(out, "  NEGATIVE {}", account)?;
        }
        if report.orphan_entries > 0 {
            writeln!(out, "  {} entries reference unknown accounts", report.orphan_entries)?;
        }

        if report.is_healthy() {
            writeln!(out, "Ledger OK")?;
        } else {
            writeln!(out, "Ledger has integrity problems")?;
        }
        Ok(())
    }

    fn export<W: Write>(
        &self,
        export_type: &str,
        account: Option<&str>,
        output: Option<PathBuf>,
        out: &mut W,
    ) -> Result<()> {
        let exporter = Exporter::new(self.service);

        // Rendered in memory so a failed export never touches `output`
        let mut buffer = Vec::new();
        let summary = match export_type {
            "accounts" => {
                let count = exporter.export_accounts_csv(&mut buffer)?;
                format!("Exported {} accounts", count)
            }
            "statement" => {
                let account = account.context("Statement export needs --account")?;
                let count = exporter.export_statement_csv(&parse_account(account)?, &mut buffer)?;
                format!("Exported {} transactions", count)
            }
            "snapshot" => {
                let snapshot = exporter.export_snapshot_json(&mut buffer)?;
                format!(
                    "Exported snapshot: {} accounts, {} transactions",
                    snapshot.accounts.len(),
                    snapshot.transactions.len()
                )
            }
            _ => {
                bail!(
                    "Invalid export type '{}'. Valid types: accounts, statement, snapshot",
                    export_type
                );
            }
        };

        match output {
            Some(path) => {
                fs::write(&path, &buffer)
                    .with_context(|| format!("Failed to write output file: {}", path.display()))?;
                writeln!(out, "{}", summary)?;
            }
            None => out.write_all(&buffer)?,
        }
        Ok(())
    }
}

fn parse_account(input: &str) -> Result<AccountNumber> {
    AccountNumber::parse(input).with_context(|| format!("Invalid account number '{}'", input))
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

/// Split a line into words. Single or double quotes group words containing
/// spaces; quotes themselves are dropped.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

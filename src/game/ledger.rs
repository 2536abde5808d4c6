//! Ledger adapter: the engine's only path to balances.
//!
//! The engine owns no storage. Every mutation goes through [`Ledger::adjust_balance`], which
//! implementations must apply atomically. Debits are clamped before they are issued so no
//! outcome ever asks for more than a subject holds; see [`debit_clamped`].
//!
//! Two adapters ship with the crate: [`MemoryLedger`] for tests and simulations, and
//! [`JsonFileLedger`] for the console host.

use async_trait::async_trait;
use fs2::FileExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use super::effects::clamp_debit;
use crate::logutil::escape_log;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("insufficient balance for {subject}: has {balance}, needs {requested}")]
    InsufficientBalance {
        subject: String,
        balance: i64,
        requested: i64,
    },

    #[error("ledger backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Atomically apply `delta`. Fails rather than letting a balance go negative.
    async fn adjust_balance(&self, subject: &str, delta: i64, reason: &str) -> Result<i64, LedgerError>;

    async fn balance(&self, subject: &str) -> Result<i64, LedgerError>;

    async fn display_name(&self, subject: &str) -> Result<String, LedgerError>;
}

/// Outcome of a clamped debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    /// Amount actually removed (never more than the balance held).
    pub amount: i64,
    pub new_balance: i64,
}

/// Remove up to `requested` from `subject`, never more than it holds.
///
/// A zero-balance subject produces a zero debit without a ledger call. If the balance shrinks
/// between the read and the adjust, the debit is re-clamped once against the fresh balance.
pub async fn debit_clamped(
    ledger: &dyn Ledger,
    subject: &str,
    requested: i64,
    reason: &str,
) -> Result<Debit, LedgerError> {
    let mut retried = false;
    loop {
        let balance = ledger.balance(subject).await?;
        let amount = -clamp_debit(requested, balance);
        if amount == 0 {
            return Ok(Debit {
                amount: 0,
                new_balance: balance,
            });
        }
        match ledger.adjust_balance(subject, -amount, reason).await {
            Ok(new_balance) => return Ok(Debit { amount, new_balance }),
            Err(LedgerError::InsufficientBalance { .. }) if !retried => {
                warn!(
                    "ledger: balance of {} moved during debit, re-clamping",
                    escape_log(subject)
                );
                retried = true;
            }
            Err(e) => return Err(e),
        }
    }
}

fn apply_delta(subject: &str, balance: i64, delta: i64) -> Result<i64, LedgerError> {
    let next = balance.saturating_add(delta);
    if next < 0 {
        return Err(LedgerError::InsufficientBalance {
            subject: subject.to_string(),
            balance,
            requested: -delta,
        });
    }
    Ok(next)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub display_name: String,
    pub balance: i64,
}

/// In-process ledger; the mutex is the serialization point for every adjust.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, subject: &str, display_name: &str, balance: i64) -> Self {
        self.open_account(subject, display_name, balance);
        self
    }

    pub fn open_account(&self, subject: &str, display_name: &str, balance: i64) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                subject.to_string(),
                Account {
                    display_name: display_name.to_string(),
                    balance,
                },
            );
        }
    }

    /// Sum of all balances; handy for conservation checks.
    pub fn total(&self) -> i64 {
        self.accounts
            .lock()
            .map(|a| a.values().map(|acc| acc.balance).sum())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Account>>, LedgerError> {
        self.accounts
            .lock()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".into()))
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn adjust_balance(&self, subject: &str, delta: i64, reason: &str) -> Result<i64, LedgerError> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(subject)
            .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))?;
        account.balance = apply_delta(subject, account.balance, delta)?;
        info!(
            "ledger: {} {:+} ({}) -> {}",
            escape_log(subject),
            delta,
            reason,
            account.balance
        );
        Ok(account.balance)
    }

    async fn balance(&self, subject: &str) -> Result<i64, LedgerError> {
        self.lock()?
            .get(subject)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))
    }

    async fn display_name(&self, subject: &str) -> Result<String, LedgerError> {
        self.lock()?
            .get(subject)
            .map(|a| a.display_name.clone())
            .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))
    }
}

/// On-disk schema for [`JsonFileLedger`], stored at `<data_dir>/ledger/balances.json`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AccountsFile {
    pub accounts: HashMap<String, Account>,
}

/// JSON file ledger for the console host.
///
/// Each call is a locked read-modify-write of the whole file (exclusive `fs2` lock), so two
/// processes sharing a data dir still serialize their adjusts. Subjects are opened on first
/// sight with `starting_balance`.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    starting_balance: i64,
}

impl JsonFileLedger {
    pub fn open(data_dir: &str, starting_balance: i64) -> Result<Self, LedgerError> {
        let dir = Path::new(data_dir).join("ledger");
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                LedgerError::Backend(format!("unable to create {:?}: {}", dir, e))
            })?;
        }
        Ok(Self {
            path: dir.join("balances.json"),
            starting_balance,
        })
    }

    /// Open an account (or rename it) without touching an existing balance.
    pub fn register(&self, subject: &str, display_name: &str) -> Result<i64, LedgerError> {
        let starting = self.starting_balance;
        self.with_file(|file| {
            let account = file
                .accounts
                .entry(subject.to_string())
                .or_insert_with(|| Account {
                    display_name: display_name.to_string(),
                    balance: starting,
                });
            account.display_name = display_name.to_string();
            Ok((account.balance, true))
        })
    }

    pub fn subjects(&self) -> Result<Vec<String>, LedgerError> {
        self.with_file(|file| {
            let mut ids: Vec<String> = file.accounts.keys().cloned().collect();
            ids.sort();
            Ok((ids, false))
        })
    }

    /// Locked read-modify-write. The closure returns its result and whether to persist.
    fn with_file<T>(
        &self,
        f: impl FnOnce(&mut AccountsFile) -> Result<(T, bool), LedgerError>,
    ) -> Result<T, LedgerError> {
        let backend = |e: std::io::Error| LedgerError::Backend(format!("{:?}: {}", self.path, e));
        let mut handle = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(backend)?;
        handle.lock_exclusive().map_err(backend)?;

        let mut raw = String::new();
        handle.read_to_string(&mut raw).map_err(backend)?;
        let cleaned = raw.trim_start_matches('\0');
        let mut file: AccountsFile = if cleaned.trim().is_empty() {
            AccountsFile::default()
        } else {
            serde_json::from_str(cleaned)
                .map_err(|e| LedgerError::Backend(format!("corrupt ledger file: {}", e)))?
        };

        let result = f(&mut file);
        if let Ok((_, true)) = &result {
            let data = serde_json::to_string_pretty(&file)
                .map_err(|e| LedgerError::Backend(e.to_string()))?;
            handle.seek(SeekFrom::Start(0)).map_err(backend)?;
            handle.set_len(0).map_err(backend)?;
            handle.write_all(data.as_bytes()).map_err(backend)?;
            handle.flush().map_err(backend)?;
        }
        let _ = handle.unlock();
        result.map(|(value, _)| value)
    }
}

#[async_trait]
impl Ledger for JsonFileLedger {
    async fn adjust_balance(&self, subject: &str, delta: i64, reason: &str) -> Result<i64, LedgerError> {
        let balance = self.with_file(|file| {
            let account = file
                .accounts
                .get_mut(subject)
                .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))?;
            account.balance = apply_delta(subject, account.balance, delta)?;
            Ok((account.balance, true))
        })?;
        info!(
            "ledger: {} {:+} ({}) -> {}",
            escape_log(subject),
            delta,
            reason,
            balance
        );
        Ok(balance)
    }

    async fn balance(&self, subject: &str) -> Result<i64, LedgerError> {
        self.with_file(|file| {
            file.accounts
                .get(subject)
                .map(|a| (a.balance, false))
                .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))
        })
    }

    async fn display_name(&self, subject: &str) -> Result<String, LedgerError> {
        self.with_file(|file| {
            file.accounts
                .get(subject)
                .map(|a| (a.display_name.clone(), false))
                .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_ledger_refuses_negative_balance() {
        let ledger = MemoryLedger::new().with_account("u1", "Uno", 50);
        let err = ledger.adjust_balance("u1", -51, "test").await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { balance: 50, requested: 51, .. }));
        assert_eq!(ledger.balance("u1").await.unwrap(), 50);
        assert!(matches!(
            ledger.adjust_balance("ghost", 10, "test").await,
            Err(LedgerError::SubjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn clamped_debit_removes_exactly_what_is_there() {
        let ledger = MemoryLedger::new().with_account("u1", "Uno", 300);
        let debit = debit_clamped(&ledger, "u1", 1_000, "fine").await.unwrap();
        assert_eq!(debit, Debit { amount: 300, new_balance: 0 });
        assert_eq!(ledger.balance("u1").await.unwrap(), 0);

        let again = debit_clamped(&ledger, "u1", 1_000, "fine").await.unwrap();
        assert_eq!(again, Debit { amount: 0, new_balance: 0 });
    }

    #[tokio::test]
    async fn file_ledger_persists_between_handles() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let ledger = JsonFileLedger::open(dir, 1_000).unwrap();
        assert_eq!(ledger.register("n1", "Nia").unwrap(), 1_000);
        assert_eq!(ledger.adjust_balance("n1", 250, "gift").await.unwrap(), 1_250);
        // Re-registering keeps the balance
        assert_eq!(ledger.register("n1", "Nia B").unwrap(), 1_250);

        let reopened = JsonFileLedger::open(dir, 1_000).unwrap();
        assert_eq!(reopened.balance("n1").await.unwrap(), 1_250);
        assert_eq!(reopened.display_name("n1").await.unwrap(), "Nia B");
        assert!(reopened.adjust_balance("n1", -5_000, "too much").await.is_err());
        assert_eq!(reopened.subjects().unwrap(), vec!["n1".to_string()]);
    }
}

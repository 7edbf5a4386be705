use crate::domain::ports::{LedgerScope, LedgerStore, ScopeBox, TransactionLog, WalletStore};
use crate::domain::transaction::{Transaction, TransactionDraft, TransactionId};
use crate::domain::wallet::{Wallet, WalletId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// A committed wallet together with its row lock.
struct Row {
    wallet: Wallet,
    lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct Log {
    records: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
}

impl Log {
    fn push(&mut self, record: Transaction) {
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
    }
}

/// A thread-safe in-memory ledger store.
///
/// Committed wallets sit behind a `RwLock`, and every wallet row carries its
/// own `Mutex` acting as the exclusive row lock. Scopes buffer their writes
/// and publish them under the write lock on commit, so readers only ever see
/// committed state. Cloning shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    wallets: Arc<RwLock<HashMap<WalletId, Row>>>,
    log: Arc<RwLock<Log>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryLedgerStore {
    async fn create(&self, wallet: Wallet) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.id) {
            return Err(LedgerError::Storage(format!(
                "Wallet {} already exists",
                wallet.id
            )));
        }
        wallets.insert(
            wallet.id,
            Row {
                wallet: wallet.clone(),
                lock: Arc::new(Mutex::new(())),
            },
        );
        Ok(wallet)
    }

    async fn get(&self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&wallet_id).map(|row| row.wallet.clone()))
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().map(|row| row.wallet.clone()).collect())
    }
}

#[async_trait]
impl TransactionLog for InMemoryLedgerStore {
    async fn get_transaction(&self, tx_id: TransactionId) -> Result<Option<Transaction>> {
        let log = self.log.read().await;
        Ok(log.index.get(&tx_id).map(|&at| log.records[at].clone()))
    }

    async fn transactions_for(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let log = self.log.read().await;
        Ok(log
            .records
            .iter()
            .filter(|record| record.touches(wallet_id))
            .cloned()
            .collect())
    }

    async fn all_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.log.read().await.records.clone())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>> {
        Ok(Box::new(InMemoryScope {
            wallets: Arc::clone(&self.wallets),
            log: Arc::clone(&self.log),
            held: HashMap::new(),
            staged_wallets: HashMap::new(),
            staged_records: Vec::new(),
        }))
    }
}

/// Scope over [`InMemoryLedgerStore`].
///
/// Holds owned row-lock guards and buffered writes. Dropping it releases the
/// locks and discards the buffer.
pub struct InMemoryScope {
    wallets: Arc<RwLock<HashMap<WalletId, Row>>>,
    log: Arc<RwLock<Log>>,
    held: HashMap<WalletId, OwnedMutexGuard<()>>,
    staged_wallets: HashMap<WalletId, Wallet>,
    staged_records: Vec<Transaction>,
}

#[async_trait]
impl LedgerScope for InMemoryScope {
    async fn get_for_update(&mut self, wallet_id: WalletId) -> Result<Wallet> {
        if let Some(wallet) = self.staged_wallets.get(&wallet_id) {
            return Ok(wallet.clone());
        }

        if !self.held.contains_key(&wallet_id) {
            // The map guard must be gone before waiting on the row lock,
            // otherwise a committing scope could never take the write lock.
            let lock = {
                let wallets = self.wallets.read().await;
                let row = wallets
                    .get(&wallet_id)
                    .ok_or(LedgerError::WalletNotFound(wallet_id))?;
                Arc::clone(&row.lock)
            };
            debug!(%wallet_id, "waiting for row lock");
            let guard = lock.lock_owned().await;
            debug!(%wallet_id, "row lock acquired");
            self.held.insert(wallet_id, guard);
        }

        let wallets = self.wallets.read().await;
        wallets
            .get(&wallet_id)
            .map(|row| row.wallet.clone())
            .ok_or(LedgerError::WalletNotFound(wallet_id))
    }

    async fn save(&mut self, wallet: &Wallet) -> Result<()> {
        if !self.held.contains_key(&wallet.id) {
            return Err(LedgerError::Storage(format!(
                "Wallet {} saved without holding its row lock",
                wallet.id
            )));
        }
        self.staged_wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn append(&mut self, draft: TransactionDraft) -> Result<Transaction> {
        let record = draft.record(TransactionId::new(), Utc::now());
        self.staged_records.push(record.clone());
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryScope {
            wallets,
            log,
            held,
            staged_wallets,
            staged_records,
        } = *self;

        {
            let mut wallets = wallets.write().await;
            let mut log = log.write().await;
            if let Some(missing) = staged_wallets.keys().find(|id| !wallets.contains_key(*id)) {
                return Err(LedgerError::WalletNotFound(*missing));
            }
            for (wallet_id, wallet) in staged_wallets {
                if let Some(row) = wallets.get_mut(&wallet_id) {
                    row.wallet = wallet;
                }
            }
            for record in staged_records {
                log.push(record);
            }
        }

        debug!(locks = held.len(), "scope committed");
        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!(
            locks = self.held.len(),
            discarded = self.staged_records.len(),
            "scope rolled back"
        );
        Ok(())
    }
}

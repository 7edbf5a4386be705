use crate::domain::ports::{LedgerScope, LedgerStore, ScopeBox, TransactionLog, WalletStore};
use crate::domain::transaction::{Transaction, TransactionDraft, TransactionId};
use crate::domain::wallet::{Wallet, WalletId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Column Family for storing wallet rows.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for storing transaction records.
pub const CF_TRANSACTIONS: &str = "transactions";

/// How long `get_for_update` waits for a row lock held by another scope.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

fn column_family<'db>(db: &'db TransactionDB, name: &str) -> Result<&'db ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::Storage(format!("Column family '{}' not found", name)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// A persistent ledger store backed by a pessimistic RocksDB `TransactionDB`.
///
/// Wallets and transaction records live in separate column families. Row
/// locks come from `get_for_update_cf`, which RocksDB holds until the
/// enclosing transaction commits or rolls back. Waiting longer than the lock
/// timeout fails the operation with a storage error.
///
/// `Clone` shares the underlying `Arc<TransactionDB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a database at `path` with the default lock timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Opens or creates a database at `path`.
    ///
    /// Ensures that the required column families ("wallets" and
    /// "transactions") exist.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let lock_timeout_ms = i64::try_from(lock_timeout.as_millis()).unwrap_or(i64::MAX);
        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(lock_timeout_ms);
        txn_db_opts.set_default_lock_timeout(lock_timeout_ms);

        let cf_wallets = ColumnFamilyDescriptor::new(CF_WALLETS, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &txn_db_opts,
            path,
            vec![cf_wallets, cf_transactions],
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = column_family(&self.db, cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn create(&self, wallet: Wallet) -> Result<Wallet> {
        let cf = column_family(&self.db, CF_WALLETS)?;
        let txn = self.db.transaction();
        if txn
            .get_for_update_cf(cf, wallet.id.as_bytes(), true)?
            .is_some()
        {
            return Err(LedgerError::Storage(format!(
                "Wallet {} already exists",
                wallet.id
            )));
        }
        txn.put_cf(cf, wallet.id.as_bytes(), encode(&wallet)?)?;
        txn.commit()?;
        Ok(wallet)
    }

    async fn get(&self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        let cf = column_family(&self.db, CF_WALLETS)?;
        match self.db.get_cf(cf, wallet_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS)
    }
}

#[async_trait]
impl TransactionLog for RocksDBStore {
    async fn get_transaction(&self, tx_id: TransactionId) -> Result<Option<Transaction>> {
        let cf = column_family(&self.db, CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, tx_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn transactions_for(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let mut records: Vec<Transaction> = self
            .scan::<Transaction>(CF_TRANSACTIONS)?
            .into_iter()
            .filter(|record| record.touches(wallet_id))
            .collect();
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    async fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut records = self.scan::<Transaction>(CF_TRANSACTIONS)?;
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>> {
        Ok(Box::new(RocksDBScope {
            db: &self.db,
            txn: self.db.transaction(),
            locked: HashSet::new(),
        }))
    }
}

/// Scope over a RocksDB transaction. Dropping the inner transaction without
/// committing rolls it back and releases its locks.
pub struct RocksDBScope<'a> {
    db: &'a TransactionDB,
    txn: rocksdb::Transaction<'a, TransactionDB>,
    locked: HashSet<WalletId>,
}

#[async_trait]
impl<'a> LedgerScope for RocksDBScope<'a> {
    async fn get_for_update(&mut self, wallet_id: WalletId) -> Result<Wallet> {
        let cf = column_family(self.db, CF_WALLETS)?;
        let bytes = self
            .txn
            .get_for_update_cf(cf, wallet_id.as_bytes(), true)?
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;
        debug!(%wallet_id, "row lock acquired");
        self.locked.insert(wallet_id);
        decode(&bytes)
    }

    async fn save(&mut self, wallet: &Wallet) -> Result<()> {
        if !self.locked.contains(&wallet.id) {
            return Err(LedgerError::Storage(format!(
                "Wallet {} saved without holding its row lock",
                wallet.id
            )));
        }
        let cf = column_family(self.db, CF_WALLETS)?;
        self.txn.put_cf(cf, wallet.id.as_bytes(), encode(wallet)?)?;
        Ok(())
    }

    async fn append(&mut self, draft: TransactionDraft) -> Result<Transaction> {
        let cf = column_family(self.db, CF_TRANSACTIONS)?;
        let record = draft.record(TransactionId::new(), Utc::now());
        self.txn.put_cf(cf, record.id.as_bytes(), encode(&record)?)?;
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn.rollback()?;
        debug!(locks = self.locked.len(), "scope rolled back");
        Ok(())
    }
}

use super::transaction::{Transaction, TransactionDraft, TransactionId};
use super::wallet::{Wallet, WalletId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Committed wallet state, read outside of any scope.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Persists a freshly opened wallet.
    async fn create(&self, wallet: Wallet) -> Result<Wallet>;
    async fn get(&self, wallet_id: WalletId) -> Result<Option<Wallet>>;
    async fn all_wallets(&self) -> Result<Vec<Wallet>>;
}

/// Committed transaction records, read outside of any scope.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn get_transaction(&self, tx_id: TransactionId) -> Result<Option<Transaction>>;
    /// Records where the wallet is source or destination, oldest first.
    async fn transactions_for(&self, wallet_id: WalletId) -> Result<Vec<Transaction>>;
    async fn all_transactions(&self) -> Result<Vec<Transaction>>;
}

/// One atomic unit of work against the store.
///
/// Row locks taken by [`LedgerScope::get_for_update`] are held until the scope
/// commits or rolls back. Dropping a scope without committing rolls it back,
/// which is what happens when an operation is cancelled mid-flight.
#[async_trait]
pub trait LedgerScope: Send {
    /// Loads a wallet and takes its exclusive row lock, waiting for any
    /// other scope holding it.
    async fn get_for_update(&mut self, wallet_id: WalletId) -> Result<Wallet>;
    /// Stages a wallet write. The scope must hold the wallet's lock.
    async fn save(&mut self, wallet: &Wallet) -> Result<()>;
    /// Stages a new write-once record, assigning its id and creation time.
    async fn append(&mut self, draft: TransactionDraft) -> Result<Transaction>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub type ScopeBox<'a> = Box<dyn LedgerScope + 'a>;

/// A transactional store holding both wallets and the transaction log.
#[async_trait]
pub trait LedgerStore: WalletStore + TransactionLog {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;

use crate::domain::money::{Amount, Currency};
use crate::domain::ports::{LedgerScope, LedgerStoreRef, ScopeBox};
use crate::domain::transaction::{Reference, Transaction, TransactionDraft, TransactionId};
use crate::domain::wallet::{UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for [`LedgerEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Deadline for a single mutating operation, lock waits included.
    /// When it expires the operation is dropped, which rolls its scope back.
    ///
    /// The deadline is only observed between store calls. A store that waits
    /// for row locks on the calling thread (RocksDB) must have its own lock
    /// timeout bounded with [`EngineConfig::lock_wait_limit`].
    pub operation_timeout: Option<Duration>,
}

impl EngineConfig {
    /// The row-lock wait a blocking store may be given without outlasting
    /// the operation deadline.
    pub fn lock_wait_limit(&self, lock_timeout: Duration) -> Duration {
        self.operation_timeout
            .map_or(lock_timeout, |deadline| lock_timeout.min(deadline))
    }
}

/// Returns the order in which a wallet pair must be locked.
///
/// Ascending by identifier, whatever the transfer direction, so two scopes
/// contending for the same pair always queue on the same first lock.
pub fn lock_order(a: WalletId, b: WalletId) -> (WalletId, WalletId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// The ledger transaction engine.
///
/// `LedgerEngine` is the only writer of wallet balances and transaction
/// records. Each mutating operation runs inside one store scope: wallets are
/// locked, mutated and saved, a record is appended, and the scope commits.
/// Any error rolls the whole scope back.
///
/// The engine keeps no in-process state of its own; serialization of
/// conflicting operations is entirely up to the store's row locks, so several
/// engines (or processes) may share one store.
pub struct LedgerEngine {
    store: LedgerStoreRef,
    config: EngineConfig,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` with the default configuration.
    pub fn new(store: LedgerStoreRef) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: LedgerStoreRef, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Opens an empty wallet for `user_id`. Takes no locks.
    pub async fn create_wallet(&self, user_id: UserId, currency: Currency) -> Result<Wallet> {
        let wallet = self.store.create(Wallet::open(user_id, currency)).await?;
        info!(
            wallet_id = %wallet.id,
            user_id = %wallet.user_id,
            currency = %wallet.currency,
            "wallet created"
        );
        Ok(wallet)
    }

    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet> {
        self.store
            .get(wallet_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet_id))
    }

    /// All wallets, oldest first.
    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        let mut wallets = self.store.all_wallets().await?;
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }

    pub async fn get_transaction(&self, tx_id: TransactionId) -> Result<Transaction> {
        self.store
            .get_transaction(tx_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(tx_id))
    }

    /// The whole transaction log, oldest first.
    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.store.all_transactions().await
    }

    /// Records touching `wallet_id`, oldest first. Fails if the wallet is unknown.
    pub async fn wallet_transactions(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        self.get_wallet(wallet_id).await?;
        self.store.transactions_for(wallet_id).await
    }

    /// Credits `amount` to a wallet and records a completed deposit.
    pub async fn deposit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
        reference: Option<Reference>,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;

        let record = self
            .within_deadline("deposit", async {
                let mut scope = self.store.begin().await?;
                let outcome = apply_deposit(scope.as_mut(), wallet_id, amount, reference).await;
                finish("deposit", scope, outcome).await
            })
            .await?;

        info!(
            tx_id = %record.id,
            %wallet_id,
            %amount,
            "deposit committed"
        );
        Ok(record)
    }

    /// Moves `amount` between two wallets of the same currency and records a
    /// completed transfer.
    pub async fn transfer(
        &self,
        from: WalletId,
        to: WalletId,
        amount: Decimal,
        reference: Option<Reference>,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }

        let record = self
            .within_deadline("transfer", async {
                let mut scope = self.store.begin().await?;
                let outcome = apply_transfer(scope.as_mut(), from, to, amount, reference).await;
                finish("transfer", scope, outcome).await
            })
            .await?;

        info!(
            tx_id = %record.id,
            from_wallet_id = %from,
            to_wallet_id = %to,
            %amount,
            "transfer committed"
        );
        Ok(record)
    }

    /// Bounds a scoped unit of work by the operation timeout. On expiry the
    /// unit is dropped mid-flight, which drops its scope and rolls it back.
    async fn within_deadline<T>(
        &self,
        op: &'static str,
        unit: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, unit).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(op, ?limit, "operation deadline exceeded, scope rolled back");
                    Err(LedgerError::Storage(format!(
                        "{} timed out after {:?}",
                        op, limit
                    )))
                }
            },
            None => unit.await,
        }
    }
}

async fn finish(
    op: &'static str,
    scope: ScopeBox<'_>,
    outcome: Result<Transaction>,
) -> Result<Transaction> {
    match outcome {
        Ok(record) => {
            scope.commit().await?;
            Ok(record)
        }
        Err(err) => {
            if let Err(rollback_err) = scope.rollback().await {
                // Dropping the scope still releases its locks.
                warn!(op, error = %rollback_err, "rollback failed");
            }
            warn!(op, error = %err, "operation rejected");
            Err(err)
        }
    }
}

async fn apply_deposit(
    scope: &mut (dyn LedgerScope + '_),
    wallet_id: WalletId,
    amount: Amount,
    reference: Option<Reference>,
) -> Result<Transaction> {
    let mut wallet = scope.get_for_update(wallet_id).await?;
    wallet.credit(amount)?;
    scope.save(&wallet).await?;

    let draft = TransactionDraft::deposit(wallet_id, amount)
        .with_reference(reference)
        .complete();
    scope.append(draft).await
}

async fn apply_transfer(
    scope: &mut (dyn LedgerScope + '_),
    from: WalletId,
    to: WalletId,
    amount: Amount,
    reference: Option<Reference>,
) -> Result<Transaction> {
    let (first, second) = lock_order(from, to);
    debug!(%first, %second, "locking wallet pair");
    let first_wallet = scope.get_for_update(first).await?;
    let second_wallet = scope.get_for_update(second).await?;
    let (mut sender, mut receiver) = if first == from {
        (first_wallet, second_wallet)
    } else {
        (second_wallet, first_wallet)
    };

    if !sender.balance.covers(amount) {
        return Err(sender.insufficient(amount));
    }
    if sender.currency != receiver.currency {
        return Err(LedgerError::CurrencyMismatch {
            from: sender.currency.clone(),
            to: receiver.currency.clone(),
        });
    }

    sender.debit(amount)?;
    receiver.credit(amount)?;
    scope.save(&sender).await?;
    scope.save(&receiver).await?;

    let draft = TransactionDraft::transfer(from, to, amount)
        .with_reference(reference)
        .complete();
    scope.append(draft).await
}

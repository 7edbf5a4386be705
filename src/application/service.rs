use super::engine::LedgerEngine;
use crate::domain::money::Currency;
use crate::domain::transaction::{Reference, Transaction, TransactionId};
use crate::domain::wallet::{UserId, Wallet, WalletId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateWalletRequest {
    pub user_id: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DepositRequest {
    pub wallet_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransferRequest {
    pub from_wallet_id: String,
    pub to_wallet_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
}

fn parse_reference(reference: Option<&str>) -> Result<Option<Reference>> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(Reference::from_str)
        .transpose()
}

/// Transport-facing façade over [`LedgerEngine`].
///
/// Accepts raw request shapes, turns them into domain types and hands them to
/// the engine. Malformed identifiers, currencies, user ids and references are
/// rejected here with a validation error before any store access.
pub struct WalletService {
    engine: LedgerEngine,
}

impl WalletService {
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    pub async fn create_wallet(&self, req: CreateWalletRequest) -> Result<Wallet> {
        let user_id: UserId = req.user_id.parse()?;
        let currency: Currency = req.currency.parse()?;
        self.engine.create_wallet(user_id, currency).await
    }

    pub async fn get_wallet(&self, wallet_id: &str) -> Result<Wallet> {
        self.engine.get_wallet(wallet_id.parse()?).await
    }

    pub async fn deposit(&self, req: DepositRequest) -> Result<Transaction> {
        let wallet_id: WalletId = req.wallet_id.parse()?;
        let reference = parse_reference(req.reference.as_deref())?;
        self.engine.deposit(wallet_id, req.amount, reference).await
    }

    pub async fn transfer(&self, req: TransferRequest) -> Result<Transaction> {
        let from: WalletId = req.from_wallet_id.parse()?;
        let to: WalletId = req.to_wallet_id.parse()?;
        let reference = parse_reference(req.reference.as_deref())?;
        self.engine.transfer(from, to, req.amount, reference).await
    }

    pub async fn get_transaction(&self, tx_id: &str) -> Result<Transaction> {
        let tx_id: TransactionId = tx_id.parse()?;
        self.engine.get_transaction(tx_id).await
    }

    pub async fn wallet_transactions(&self, wallet_id: &str) -> Result<Vec<Transaction>> {
        self.engine.wallet_transactions(wallet_id.parse()?).await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.engine.transactions().await
    }

    /// Consumes the service and returns the final state of all wallets.
    pub async fn into_results(self) -> Result<Vec<Wallet>> {
        self.engine.wallets().await
    }
}

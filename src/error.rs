use crate::domain::money::Currency;
use crate::domain::transaction::TransactionId;
use crate::domain::wallet::WalletId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure classes surfaced by the ledger.
///
/// Every variant is raised before a scope commits, so a returned error always
/// means nothing was written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(
        "Invalid amount {0}: must be positive with at most 2 fractional digits, and no balance may exceed 999999999999999999.99"
    )]
    InvalidAmount(Decimal),
    #[error("Wallet {0} not found")]
    WalletNotFound(WalletId),
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("Insufficient balance in wallet {wallet}: available {available}, requested {requested}")]
    InsufficientBalance {
        wallet: WalletId,
        available: Decimal,
        requested: Decimal,
    },
    #[error("Currency mismatch: {from} -> {to} (exchange not supported)")]
    CurrencyMismatch { from: Currency, to: Currency },
    #[error("Cannot transfer from wallet {0} to itself")]
    SelfTransfer(WalletId),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Only storage failures may succeed when retried unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(format!("Serialization error: {}", err))
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Errors raised while running a CSV command script.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing column '{field}' for {op} command")]
    MissingField { op: &'static str, field: &'static str },
    #[error("Unknown wallet '{0}'")]
    UnknownWallet(String),
    #[error("Wallet label '{0}' is already in use")]
    DuplicateLabel(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

use super::money::Amount;
use super::wallet::WalletId;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MAX_REFERENCE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TransactionId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| LedgerError::Validation(format!("Invalid transaction ID '{}'", s)))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        })
    }
}

/// Free-form external reference attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference(String);

impl Reference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Reference {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() > MAX_REFERENCE_LEN {
            return Err(LedgerError::Validation(format!(
                "Reference exceeds {} characters",
                MAX_REFERENCE_LEN
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Reference {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.0
    }
}

/// A record that has not been appended to the log yet.
///
/// The log assigns the identifier and creation time on append. The status
/// only moves forward: once completed or failed it stays that way.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionDraft {
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
    pub amount: Amount,
    pub r#type: TransactionType,
    pub status: TransactionStatus,
    pub reference: Option<Reference>,
}

impl TransactionDraft {
    pub fn deposit(to: WalletId, amount: Amount) -> Self {
        Self {
            from_wallet_id: None,
            to_wallet_id: Some(to),
            amount,
            r#type: TransactionType::Deposit,
            status: TransactionStatus::Pending,
            reference: None,
        }
    }

    pub fn transfer(from: WalletId, to: WalletId, amount: Amount) -> Self {
        Self {
            from_wallet_id: Some(from),
            to_wallet_id: Some(to),
            amount,
            r#type: TransactionType::Transfer,
            status: TransactionStatus::Pending,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<Reference>) -> Self {
        self.reference = reference;
        self
    }

    pub fn complete(self) -> Self {
        self.finalize(TransactionStatus::Completed)
    }

    pub fn fail(self) -> Self {
        self.finalize(TransactionStatus::Failed)
    }

    fn finalize(mut self, status: TransactionStatus) -> Self {
        if !self.status.is_final() {
            self.status = status;
        }
        self
    }

    /// Turns the draft into a stored record.
    pub fn record(self, id: TransactionId, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            from_wallet_id: self.from_wallet_id,
            to_wallet_id: self.to_wallet_id,
            amount: self.amount,
            r#type: self.r#type,
            status: self.status,
            reference: self.reference,
            created_at,
        }
    }
}

/// An immutable audit entry for one balance-affecting event.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_wallet_id: Option<WalletId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_wallet_id: Option<WalletId>,
    pub amount: Amount,
    pub r#type: TransactionType,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns whether `wallet` is the source or destination of this record.
    pub fn touches(&self, wallet: WalletId) -> bool {
        self.from_wallet_id == Some(wallet) || self.to_wallet_id == Some(wallet)
    }
}

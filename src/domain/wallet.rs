use super::money::{Amount, Balance, Currency};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const MAX_USER_ID_LEN: usize = 100;

/// Unique wallet identifier. Ordering is used to lock wallet pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for WalletId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for WalletId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| LedgerError::Validation(format!("Invalid wallet ID '{}'", s)))
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the user owning a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LedgerError::Validation("User ID is empty".to_string()));
        }
        if s.chars().count() > MAX_USER_ID_LEN {
            return Err(LedgerError::Validation(format!(
                "User ID exceeds {} characters",
                MAX_USER_ID_LEN
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for UserId {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<UserId> for String {
    fn from(user: UserId) -> Self {
        user.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-owned, single-currency balance.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub currency: Currency,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Opens an empty wallet under a fresh identifier.
    pub fn open(user_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::new(),
            user_id,
            currency,
            balance: Balance::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Credits the balance, refusing to take it past
    /// [`max_money`](super::money::max_money).
    pub fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount.value()))?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Debits the balance, refusing to take it below zero.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        match self.balance.checked_sub(amount) {
            Some(balance) => {
                self.balance = balance;
                self.updated_at = Utc::now();
                Ok(())
            }
            None => Err(self.insufficient(amount)),
        }
    }

    pub fn insufficient(&self, requested: Amount) -> LedgerError {
        LedgerError::InsufficientBalance {
            wallet: self.id,
            available: self.balance.value(),
            requested: requested.value(),
        }
    }
}

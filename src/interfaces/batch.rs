use super::csv::command_reader::{Command, CommandReader};
use crate::application::service::{
    CreateWalletRequest, DepositRequest, TransferRequest, WalletService,
};
use crate::domain::money::Currency;
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Wallet, WalletId};
use crate::error::BatchError;
use std::collections::HashMap;
use std::io::Read;
use tracing::{error, info};

/// What a successfully applied command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created { label: String, wallet: Wallet },
    Recorded(Transaction),
}

/// Counts of applied and skipped rows for one script.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Runs command scripts against a [`WalletService`].
///
/// Wallets created by a script are addressed by their label for the rest of
/// the run. Wallets that already exist in the store are addressed by id.
pub struct BatchRunner {
    service: WalletService,
    default_currency: Currency,
    labels: HashMap<String, WalletId>,
}

impl BatchRunner {
    pub fn new(service: WalletService, default_currency: Currency) -> Self {
        Self {
            service,
            default_currency,
            labels: HashMap::new(),
        }
    }

    pub fn service(&self) -> &WalletService {
        &self.service
    }

    pub fn into_service(self) -> WalletService {
        self.service
    }

    /// Applies every row in order. Failing rows are logged and skipped.
    pub async fn run_script<R: Read>(&mut self, reader: CommandReader<R>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for command in reader.commands() {
            let result = match command {
                Ok(command) => self.run(command).await,
                Err(e) => {
                    error!("Error reading command: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };
            match result {
                Ok(_) => summary.applied += 1,
                Err(e) => {
                    error!("Error processing command: {}", e);
                    summary.skipped += 1;
                }
            }
        }
        info!(
            applied = summary.applied,
            skipped = summary.skipped,
            "script finished"
        );
        summary
    }

    pub async fn run(&mut self, command: Command) -> Result<Outcome, BatchError> {
        match command {
            Command::Create {
                label,
                user,
                currency,
            } => {
                if self.labels.contains_key(&label) {
                    return Err(BatchError::DuplicateLabel(label));
                }
                let currency = currency.unwrap_or_else(|| self.default_currency.to_string());
                let wallet = self
                    .service
                    .create_wallet(CreateWalletRequest {
                        user_id: user,
                        currency,
                    })
                    .await?;
                self.labels.insert(label.clone(), wallet.id);
                Ok(Outcome::Created { label, wallet })
            }
            Command::Deposit {
                wallet,
                amount,
                reference,
            } => {
                let record = self
                    .service
                    .deposit(DepositRequest {
                        wallet_id: self.resolve(&wallet)?,
                        amount,
                        reference,
                    })
                    .await?;
                Ok(Outcome::Recorded(record))
            }
            Command::Transfer {
                from,
                to,
                amount,
                reference,
            } => {
                let record = self
                    .service
                    .transfer(TransferRequest {
                        from_wallet_id: self.resolve(&from)?,
                        to_wallet_id: self.resolve(&to)?,
                        amount,
                        reference,
                    })
                    .await?;
                Ok(Outcome::Recorded(record))
            }
        }
    }

    fn resolve(&self, wallet: &str) -> Result<String, BatchError> {
        if let Some(id) = self.labels.get(wallet) {
            return Ok(id.to_string());
        }
        wallet
            .parse::<WalletId>()
            .map(|id| id.to_string())
            .map_err(|_| BatchError::UnknownWallet(wallet.to_string()))
    }
}

use crate::domain::wallet::Wallet;
use crate::error::BatchError;
use std::io::Write;

/// Writes wallet state as CSV with a header row.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets(&mut self, wallets: Vec<Wallet>) -> Result<(), BatchError> {
        for wallet in wallets {
            self.writer.serialize(wallet)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

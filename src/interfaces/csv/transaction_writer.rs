use crate::domain::transaction::Transaction;
use crate::error::BatchError;
use std::io::Write;

const HEADER: [&str; 8] = [
    "id",
    "type",
    "status",
    "from_wallet_id",
    "to_wallet_id",
    "amount",
    "reference",
    "created_at",
];

/// Writes transaction records as CSV.
///
/// Optional columns are written as empty fields, so every row has the same
/// shape as the header.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions(&mut self, records: &[Transaction]) -> Result<(), BatchError> {
        self.writer.write_record(HEADER)?;
        for record in records {
            self.writer.write_record([
                record.id.to_string(),
                record.r#type.to_string(),
                record.status.to_string(),
                record.from_wallet_id.map(|id| id.to_string()).unwrap_or_default(),
                record.to_wallet_id.map(|id| id.to_string()).unwrap_or_default(),
                record.amount.to_string(),
                record
                    .reference
                    .as_ref()
                    .map(|r| r.as_str().to_string())
                    .unwrap_or_default(),
                record.created_at.to_rfc3339(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

use crate::error::BatchError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Deposit,
    Transfer,
}

/// One raw row of a command script.
///
/// `wallet` is the label of the wallet to create for `create`, and the
/// (source) wallet label or id otherwise. `counterparty` is the destination
/// of a transfer.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: Operation,
    pub wallet: String,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
    pub user: Option<String>,
    pub currency: Option<String>,
    pub reference: Option<String>,
}

/// A command with the columns its operation requires.
#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Create {
        label: String,
        user: String,
        currency: Option<String>,
    },
    Deposit {
        wallet: String,
        amount: Decimal,
        reference: Option<String>,
    },
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        reference: Option<String>,
    },
}

impl TryFrom<CommandRecord> for Command {
    type Error = BatchError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        match record.op {
            Operation::Create => Ok(Command::Create {
                label: record.wallet,
                user: record.user.ok_or(BatchError::MissingField {
                    op: "create",
                    field: "user",
                })?,
                currency: record.currency,
            }),
            Operation::Deposit => Ok(Command::Deposit {
                wallet: record.wallet,
                amount: record.amount.ok_or(BatchError::MissingField {
                    op: "deposit",
                    field: "amount",
                })?,
                reference: record.reference,
            }),
            Operation::Transfer => Ok(Command::Transfer {
                from: record.wallet,
                to: record.counterparty.ok_or(BatchError::MissingField {
                    op: "transfer",
                    field: "counterparty",
                })?,
                amount: record.amount.ok_or(BatchError::MissingField {
                    op: "transfer",
                    field: "amount",
                })?,
                reference: record.reference,
            }),
        }
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<Command>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and checks commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command, BatchError>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| Command::try_from(result?))
    }
}

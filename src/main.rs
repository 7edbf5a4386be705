use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use wallet_ledger::application::engine::{EngineConfig, LedgerEngine};
use wallet_ledger::application::service::WalletService;
use wallet_ledger::domain::money::Currency;
use wallet_ledger::domain::ports::LedgerStoreRef;
use wallet_ledger::infrastructure::in_memory::InMemoryLedgerStore;
#[cfg(feature = "storage-rocksdb")]
use wallet_ledger::infrastructure::rocksdb::RocksDBStore;
use wallet_ledger::interfaces::batch::BatchRunner;
use wallet_ledger::interfaces::csv::command_reader::CommandReader;
use wallet_ledger::interfaces::csv::transaction_writer::TransactionWriter;
use wallet_ledger::interfaces::csv::wallet_writer::WalletWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Output format for the final wallet state
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Also write the transaction log as CSV to this file
    #[arg(long)]
    transactions_out: Option<PathBuf>,

    /// Currency for `create` rows that leave it blank
    #[arg(long, env = "LEDGER_DEFAULT_CURRENCY", default_value = "THB")]
    default_currency: Currency,

    /// Deadline for each deposit or transfer, lock waits included
    #[arg(long, env = "LEDGER_OPERATION_TIMEOUT_MS")]
    operation_timeout_ms: Option<u64>,

    /// RocksDB row lock wait timeout
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 1000)]
    lock_timeout_ms: u64,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_ledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn open_store(db_path: Option<&Path>, lock_timeout: Duration) -> Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open_with_lock_timeout(path, lock_timeout).into_diagnostic()?;
            info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                ?lock_timeout,
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = EngineConfig {
        operation_timeout: cli.operation_timeout_ms.map(Duration::from_millis),
    };
    let store = open_store(
        cli.db_path.as_deref(),
        config.lock_wait_limit(Duration::from_millis(cli.lock_timeout_ms)),
    )?;
    let service = WalletService::new(LedgerEngine::with_config(store, config));
    let mut runner = BatchRunner::new(service, cli.default_currency);

    // Process commands
    info!(input = %cli.input.display(), "running command script");
    let file = File::open(&cli.input).into_diagnostic()?;
    runner.run_script(CommandReader::new(file)).await;

    let service = runner.into_service();
    if let Some(path) = &cli.transactions_out {
        let records = service.transactions().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        TransactionWriter::new(file)
            .write_transactions(&records)
            .into_diagnostic()?;
    }

    // Output final state
    let wallets = service.into_results().await.into_diagnostic()?;
    let stdout = io::stdout();
    match cli.format {
        OutputFormat::Csv => {
            let mut writer = WalletWriter::new(stdout.lock());
            writer.write_wallets(wallets).into_diagnostic()?;
        }
        OutputFormat::Json => {
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &wallets).into_diagnostic()?;
            writeln!(out).into_diagnostic()?;
        }
    }

    Ok(())
}

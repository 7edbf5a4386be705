#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use wallet_ledger::domain::wallet::Wallet;

pub const HEADER: &str = "op, wallet, counterparty, amount, user, currency, reference";

/// Writes `rows` below the command header into a temporary script.
pub fn script(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

/// Parses the wallet CSV the binary writes to stdout.
pub fn parse_wallets(stdout: &[u8]) -> Vec<Wallet> {
    csv::Reader::from_reader(stdout)
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("stdout should be wallet CSV")
}

/// Writes a script that opens `wallets` THB wallets `w0..`, funds each with
/// 1000.00 and then issues `transfers` random transfers between them.
pub fn generate_script(
    path: &Path,
    wallets: usize,
    transfers: usize,
    seed: u64,
) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["op", "wallet", "counterparty", "amount", "user", "currency", "reference"])?;

    for i in 0..wallets {
        let label = format!("w{}", i);
        let user = format!("user{}", i);
        wtr.write_record(["create", label.as_str(), "", "", user.as_str(), "THB", ""])?;
        wtr.write_record(["deposit", label.as_str(), "", "1000.00", "", "", ""])?;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..transfers {
        let from = rng.gen_range(0..wallets);
        let to = rng.gen_range(0..wallets);
        let cents: u32 = rng.gen_range(1..=50_000);
        let (from, to) = (format!("w{}", from), format!("w{}", to));
        let amount = format!("{}.{:02}", cents / 100, cents % 100);
        wtr.write_record([
            "transfer",
            from.as_str(),
            to.as_str(),
            amount.as_str(),
            "",
            "",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

use assert_cmd::cargo_bin;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::process::Command;

mod common;

#[test]
fn test_large_script_conserves_money() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large_script.csv");
    common::generate_script(&path, 50, 20_000, 7).expect("Failed to generate script");

    let output = Command::new(cargo_bin!("wallet-ledger"))
        .arg(&path)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to process script");

    let wallets = common::parse_wallets(&output.stdout);
    assert_eq!(wallets.len(), 50);
    assert!(wallets.iter().all(|w| w.balance.value() >= Decimal::ZERO));
    let total: Decimal = wallets.iter().map(|w| w.balance.value()).sum();
    assert_eq!(total, dec!(50_000.00));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_large_script_db() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large_script.csv");
    common::generate_script(&path, 20, 2_000, 11).expect("Failed to generate script");

    let output = Command::new(cargo_bin!("wallet-ledger"))
        .arg(&path)
        .arg("--db-path")
        .arg(dir.path().join("test_db"))
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to process script");

    let total: Decimal = common::parse_wallets(&output.stdout)
        .iter()
        .map(|w| w.balance.value())
        .sum();
    assert_eq!(total, dec!(20_000.00));
}

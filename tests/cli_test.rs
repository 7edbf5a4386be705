use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenarios.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "id,user_id,currency,balance,created_at,updated_at",
        ))
        .stdout(predicate::str::contains(",alice,THB,60.00,"))
        .stdout(predicate::str::contains(",bob,THB,40.00,"))
        .stdout(predicate::str::contains(",carol,USD,0.00,"))
        .stderr(predicate::str::contains("Insufficient balance"))
        .stderr(predicate::str::contains("Currency mismatch"))
        .stderr(predicate::str::contains("to itself"));

    Ok(())
}

#[test]
fn test_cli_json_output() {
    let output = Command::new(cargo_bin!())
        .arg("tests/fixtures/scenarios.csv")
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let wallets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let wallets = wallets.as_array().unwrap();
    assert_eq!(wallets.len(), 3);

    let alice = wallets
        .iter()
        .find(|w| w["user_id"] == "alice")
        .unwrap();
    assert_eq!(alice["currency"], "THB");
    assert_eq!(alice["balance"], "60.00");
}

#[test]
fn test_cli_transactions_out() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("transactions.csv");

    Command::new(cargo_bin!())
        .arg("tests/fixtures/scenarios.csv")
        .arg("--transactions-out")
        .arg(&log_path)
        .assert()
        .success();

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    // Only the deposit and the first transfer were committed.
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,type,status,from_wallet_id,to_wallet_id,amount,reference,created_at"
    );
    assert!(lines[1].contains(",deposit,completed,,"));
    assert!(lines[1].contains(",100.00,topup-1,"));
    assert!(lines[2].contains(",transfer,completed,"));
    assert!(lines[2].contains(",40.00,rent,"));
}

#[test]
fn test_cli_default_currency_from_env() {
    let script = common::script(&["create, alice, , , alice, , "]);

    Command::new(cargo_bin!())
        .arg(script.path())
        .env("LEDGER_DEFAULT_CURRENCY", "usd")
        .assert()
        .success()
        .stdout(predicate::str::contains(",alice,USD,0.00,"));
}

#[test]
fn test_cli_missing_input_fails() {
    Command::new(cargo_bin!())
        .arg("tests/fixtures/does_not_exist.csv")
        .assert()
        .failure();
}

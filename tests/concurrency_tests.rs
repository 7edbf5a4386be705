use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use wallet_ledger::application::engine::LedgerEngine;
use wallet_ledger::domain::ports::LedgerStoreRef;
use wallet_ledger::domain::transaction::TransactionType;
use wallet_ledger::domain::wallet::WalletId;
use wallet_ledger::error::LedgerError;
use wallet_ledger::infrastructure::in_memory::InMemoryLedgerStore;

async fn funded_wallets(engine: &LedgerEngine, count: usize, funds: Decimal) -> Vec<WalletId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let wallet = engine
            .create_wallet(format!("user{}", i).parse().unwrap(), "THB".parse().unwrap())
            .await
            .unwrap();
        engine.deposit(wallet.id, funds, None).await.unwrap();
        ids.push(wallet.id);
    }
    ids
}

async fn alternating_transfers(store: LedgerStoreRef, transfers: usize) {
    let engine = Arc::new(LedgerEngine::new(store));
    let ids = funded_wallets(&engine, 2, dec!(1000.00)).await;
    let (a, b) = (ids[0], ids[1]);

    let mut handles = Vec::with_capacity(transfers);
    for i in 0..transfers {
        let engine = engine.clone();
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        handles.push(tokio::spawn(async move {
            engine.transfer(from, to, dec!(1.00), None).await
        }));
    }

    let joined = tokio::time::timeout(Duration::from_secs(60), async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    })
    .await;
    assert!(joined.is_ok(), "alternating transfers did not all complete");

    assert_eq!(engine.get_wallet(a).await.unwrap().balance.value(), dec!(1000.00));
    assert_eq!(engine.get_wallet(b).await.unwrap().balance.value(), dec!(1000.00));
    assert_eq!(engine.transactions().await.unwrap().len(), transfers + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_alternating_transfers_do_not_deadlock() {
    alternating_transfers(Arc::new(InMemoryLedgerStore::new()), 1000).await;
}

#[cfg(feature = "storage-rocksdb")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_alternating_transfers_do_not_deadlock_rocksdb() {
    use wallet_ledger::infrastructure::rocksdb::RocksDBStore;

    let dir = tempfile::tempdir().unwrap();
    let store = RocksDBStore::open(dir.path()).unwrap();
    alternating_transfers(Arc::new(store), 200).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_transfers_conserve_money() {
    let engine = Arc::new(LedgerEngine::new(Arc::new(InMemoryLedgerStore::new())));
    let ids = funded_wallets(&engine, 5, dec!(100.00)).await;
    let total = dec!(500.00);

    // Watches committed state while transfers run.
    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let engine = engine.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let mut snapshots = 0usize;
            while !done.load(Ordering::Relaxed) {
                let wallets = engine.wallets().await.unwrap();
                let sum: Decimal = wallets.iter().map(|w| w.balance.value()).sum();
                assert_eq!(sum, total, "money was created or destroyed");
                assert!(wallets.iter().all(|w| w.balance.value() >= Decimal::ZERO));
                snapshots += 1;
                tokio::task::yield_now().await;
            }
            snapshots
        })
    };

    let mut rng = StdRng::seed_from_u64(42);
    let mut handles = Vec::new();
    for _ in 0..500 {
        let from = rng.gen_range(0..ids.len());
        let mut to = rng.gen_range(0..ids.len());
        if to == from {
            to = (to + 1) % ids.len();
        }
        let amount = Decimal::new(rng.gen_range(1..=6_000), 2);
        let engine = engine.clone();
        let (from, to) = (ids[from], ids[to]);
        handles.push(tokio::spawn(async move {
            engine.transfer(from, to, amount, None).await
        }));
    }

    let mut completed = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => completed += 1,
            Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    done.store(true, Ordering::Relaxed);
    assert!(observer.await.unwrap() > 0);

    let wallets = engine.wallets().await.unwrap();
    let sum: Decimal = wallets.iter().map(|w| w.balance.value()).sum();
    assert_eq!(sum, total);

    // Every committed transfer has exactly one record, and replaying the log
    // reproduces each balance.
    let log = engine.transactions().await.unwrap();
    let transfers = log
        .iter()
        .filter(|tx| tx.r#type == TransactionType::Transfer)
        .count();
    assert_eq!(transfers, completed);

    for wallet in wallets {
        let replayed: Decimal = log
            .iter()
            .map(|tx| {
                let amount = tx.amount.value();
                if tx.to_wallet_id == Some(wallet.id) {
                    amount
                } else if tx.from_wallet_id == Some(wallet.id) {
                    -amount
                } else {
                    Decimal::ZERO
                }
            })
            .sum();
        assert_eq!(replayed, wallet.balance.value());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_all_applied() {
    let engine = Arc::new(LedgerEngine::new(Arc::new(InMemoryLedgerStore::new())));
    let ids = funded_wallets(&engine, 1, dec!(0.01)).await;
    let wallet = ids[0];

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.deposit(wallet, dec!(0.50), None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance = engine.get_wallet(wallet).await.unwrap().balance.value();
    assert_eq!(balance, dec!(100.01));
    assert_eq!(engine.wallet_transactions(wallet).await.unwrap().len(), 201);
}

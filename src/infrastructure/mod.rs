//! Storage adapters implementing the ledger ports.
//!
//! The in-memory store is always available. The RocksDB store is compiled in
//! with the `storage-rocksdb` feature.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

//! Application layer containing the ledger orchestration.
//!
//! [`engine::LedgerEngine`] runs every balance mutation as one atomic store
//! scope. [`service::WalletService`] is the façade a transport talks to: it
//! validates raw request shapes and delegates to the engine.

pub mod engine;
pub mod service;

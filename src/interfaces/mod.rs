//! Inbound and outbound adapters for the batch binary.

pub mod batch;
pub mod csv;

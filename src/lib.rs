//! HyperliquidLedger Library
//!
//! A Rust library that ingests Hyperliquid trade fills and maintains a
//! per-instrument, per-network position ledger (net size, average entry
//! price, cost basis) backed by SQLite.

pub mod common;
pub mod config;
pub mod hyperliquid;
pub mod ledger;

// Re-export commonly used types
pub use common::errors::{LedgerError, Result};
pub use common::types::{
    Fill, FillFilter, Network, Position, RecordOutcome, Side, SIZE_EPSILON,
};
pub use config::types::AppConfig;
pub use hyperliquid::messages::{extract_fills, WsFill, WsUserFills};
pub use ledger::accounting::PositionState;
pub use ledger::store::Ledger;

//! Common test utilities and fixtures

use hyperliquid_ledger::common::types::{Fill, Network, Side};
use hyperliquid_ledger::config::types::DatabaseConfig;
use hyperliquid_ledger::ledger::Ledger;

/// Open a fresh in-memory ledger
///
/// A single-connection pool so every query sees the same in-memory database.
pub async fn memory_ledger() -> Ledger {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        busy_timeout_seconds: 5,
    };
    Ledger::connect_with(&config)
        .await
        .expect("Failed to open in-memory ledger")
}

/// Create a sample buy fill for testing
pub fn sample_fill(trade_id: i64, side: Side, price: f64, size: f64) -> Fill {
    Fill {
        trade_id,
        order_id: trade_id + 10_000,
        coin: "BTC".to_string(),
        side,
        price,
        size,
        fee: 0.5,
        timestamp: 1_700_000_000_000 + trade_id,
        closed_pnl: 0.0,
        hash: Some(format!("0x{trade_id:x}")),
        crossed: Some(true),
        dir: None,
        start_position: None,
        fee_token: Some("USDC".to_string()),
        builder_fee: None,
    }
}

/// Same as [`sample_fill`] but for an arbitrary coin
pub fn sample_fill_for(coin: &str, trade_id: i64, side: Side, price: f64, size: f64) -> Fill {
    Fill {
        coin: coin.to_string(),
        ..sample_fill(trade_id, side, price, size)
    }
}

/// The network most tests run on
pub const NET: Network = Network::Testnet;

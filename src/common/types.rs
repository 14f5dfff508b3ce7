//! Unified types used across the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{LedgerError, Result};

/// Sizes within this epsilon of zero are treated as a flat position
pub const SIZE_EPSILON: f64 = 1e-9;

/// Network identifier partitioning independent ledgers
///
/// Every ledger operation takes the network explicitly; there is no
/// ambient "current network" state shared between callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(LedgerError::Validation(format!(
                "unknown network: {other}"
            ))),
        }
    }
}

/// Trade side, serialized with the exchange's single-letter encoding
/// ("B" = buy/bid, "A" = sell/ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "A")]
    Sell,
}

impl Side {
    /// Sign applied to size and value when aggregating: +1 for buys, -1 for sells
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "B",
            Side::Sell => "A",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "B" | "Buy" | "buy" => Ok(Side::Buy),
            "A" | "Sell" | "sell" => Ok(Side::Sell),
            other => Err(LedgerError::Validation(format!("unknown side: {other}"))),
        }
    }
}

/// A single executed trade event (one side of a matched order)
///
/// Fills are immutable: written once to the append-only log, never updated.
/// `(trade_id, network)` is the idempotency key; a redelivered fill with a
/// known key is absorbed without touching the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Exchange-unique trade ID (tid), scoped to a network
    pub trade_id: i64,
    /// Exchange order ID (oid) this fill executed against
    pub order_id: i64,
    /// Instrument symbol, e.g. "BTC"
    pub coin: String,
    /// Buy or Sell
    pub side: Side,
    /// Execution price, must be positive
    pub price: f64,
    /// Executed size, must be positive
    pub size: f64,
    /// Fee charged for this fill
    #[serde(default)]
    pub fee: f64,
    /// Execution time in milliseconds since Unix epoch
    pub timestamp: i64,
    /// PnL realized by this fill, as reported by the exchange.
    /// The ledger stores it; it never computes PnL itself.
    #[serde(default)]
    pub closed_pnl: f64,
    /// Transaction hash, if the exchange provides one
    #[serde(default)]
    pub hash: Option<String>,
    /// Whether the fill crossed the spread (taker)
    #[serde(default)]
    pub crossed: Option<bool>,
    /// Exchange direction label, e.g. "Open Long", "Close Short"
    #[serde(default)]
    pub dir: Option<String>,
    /// Position size before this fill, as reported by the exchange
    #[serde(default)]
    pub start_position: Option<String>,
    /// Token the fee was charged in
    #[serde(default)]
    pub fee_token: Option<String>,
    /// Builder fee, if any
    #[serde(default)]
    pub builder_fee: Option<f64>,
}

impl Fill {
    /// Check the fill's invariants before it is allowed anywhere near storage
    pub fn validate(&self) -> Result<()> {
        if self.trade_id <= 0 {
            return Err(LedgerError::Validation(format!(
                "trade_id must be positive, got {}",
                self.trade_id
            )));
        }
        if self.coin.trim().is_empty() {
            return Err(LedgerError::Validation("coin must not be empty".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(LedgerError::Validation(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(LedgerError::Validation(format!(
                "size must be positive, got {}",
                self.size
            )));
        }
        if self.timestamp <= 0 {
            return Err(LedgerError::Validation(format!(
                "timestamp must be positive, got {}",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// Notional value of the fill
    pub fn value(&self) -> f64 {
        self.price * self.size
    }
}

/// Aggregate position for one `(coin, network)` pair
///
/// `net_size` is signed: positive = long, negative = short, zero = flat.
/// A flat position carries no cost basis: `average_entry_price` and
/// `total_cost` are both zero whenever `net_size` is within epsilon of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol
    pub coin: String,
    /// Network this position belongs to
    pub network: Network,
    /// Signed open quantity
    pub net_size: f64,
    /// Cost-weighted price of the currently open exposure
    pub average_entry_price: f64,
    /// Signed cumulative cost attributed to the open position
    pub total_cost: f64,
    /// Timestamp of the last fill applied to this position
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// A fresh flat position for a coin/network pair
    pub fn flat(coin: impl Into<String>, network: Network) -> Self {
        Self {
            coin: coin.into(),
            network,
            net_size: 0.0,
            average_entry_price: 0.0,
            total_cost: 0.0,
            last_updated: Utc::now(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.net_size.abs() < SIZE_EPSILON
    }

    pub fn is_long(&self) -> bool {
        self.net_size > SIZE_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.net_size < -SIZE_EPSILON
    }
}

/// Result of recording a fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// False when the fill was a duplicate and the position was left untouched
    pub applied: bool,
    /// The position for the fill's coin/network after the call
    pub position: Position,
}

/// Optional filters for fill queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillFilter {
    /// Only fills at or after this timestamp (ms epoch)
    pub since: Option<i64>,
    /// Only fills at or before this timestamp (ms epoch)
    pub until: Option<i64>,
    /// Maximum number of fills to return
    pub limit: Option<u32>,
}

impl FillFilter {
    pub fn since(mut self, ts: i64) -> Self {
        self.since = Some(ts);
        self
    }

    pub fn until(mut self, ts: i64) -> Self {
        self.until = Some(ts);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill() -> Fill {
        Fill {
            trade_id: 1001,
            order_id: 2001,
            coin: "BTC".to_string(),
            side: Side::Buy,
            price: 50000.0,
            size: 0.1,
            fee: 0.5,
            timestamp: 1_700_000_000_000,
            closed_pnl: 0.0,
            hash: None,
            crossed: Some(true),
            dir: Some("Open Long".to_string()),
            start_position: None,
            fee_token: Some("USDC".to_string()),
            builder_fee: None,
        }
    }

    #[test]
    fn test_valid_fill_passes() {
        assert!(fill().validate().is_ok());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut f = fill();
        f.price = 0.0;
        assert!(matches!(f.validate(), Err(LedgerError::Validation(_))));
        f.price = -1.0;
        assert!(matches!(f.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_non_positive_size_rejected() {
        let mut f = fill();
        f.size = 0.0;
        assert!(matches!(f.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_empty_coin_rejected() {
        let mut f = fill();
        f.coin = "  ".to_string();
        assert!(matches!(f.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_side_serde_uses_exchange_encoding() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"B\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"A\"");
        let side: Side = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(side, Side::Sell);
    }

    #[test]
    fn test_network_round_trip() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!(Network::Testnet.to_string(), "testnet");
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_flat_position_predicates() {
        let mut p = Position::flat("ETH", Network::Testnet);
        assert!(p.is_flat());
        assert!(!p.is_long());
        p.net_size = 0.5;
        assert!(p.is_long());
        p.net_size = -0.5;
        assert!(p.is_short());
    }
}

//! Hyperliquid-specific message types
//!
//! Wire shapes for the `userFills` WebSocket channel and REST fill history.
//! Prices and sizes arrive as strings and are only parsed when a [`WsFill`]
//! is converted into a validated domain [`Fill`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::errors::{LedgerError, Result};
use crate::common::types::Fill;

/// A single fill as Hyperliquid sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFill {
    /// Instrument symbol
    pub coin: String,
    /// Execution price (decimal string)
    pub px: String,
    /// Executed size (decimal string)
    pub sz: String,
    /// "B" (buy/bid) or "A" (sell/ask)
    pub side: String,
    /// Execution time, ms since epoch
    pub time: i64,
    /// Order ID the fill executed against
    pub oid: i64,
    /// Exchange-unique trade ID
    pub tid: i64,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(rename = "closedPnl", default)]
    pub closed_pnl: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub crossed: Option<bool>,
    #[serde(rename = "startPosition", default)]
    pub start_position: Option<String>,
    /// Direction label, e.g. "Open Long", "Close Short"
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(rename = "feeToken", default)]
    pub fee_token: Option<String>,
    #[serde(rename = "builderFee", default)]
    pub builder_fee: Option<String>,
}

/// Payload of a `userFills` channel message
///
/// The first message after subscribing carries a snapshot of recent fills
/// (`isSnapshot: true`); later messages stream incremental updates. Both
/// shapes use the same `fills` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsUserFills {
    #[serde(rename = "isSnapshot", default)]
    pub is_snapshot: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub fills: Vec<WsFill>,
}

/// Top-level channel envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsChannelMessage {
    pub channel: String,
    pub data: Value,
}

/// Pull fills out of whatever shape the upstream hands us
///
/// Accepts a full channel envelope, a bare `userFills` data payload, a
/// single fill object, or a plain list of fills. Anything else is a
/// validation error.
pub fn extract_fills(value: &Value) -> Result<Vec<WsFill>> {
    // Channel envelope: unwrap and recurse into the data payload
    if let Some(obj) = value.as_object() {
        if obj.contains_key("channel") && obj.contains_key("data") {
            return extract_fills(&obj["data"]);
        }
        if obj.contains_key("fills") {
            let payload: WsUserFills = serde_json::from_value(value.clone())?;
            return Ok(payload.fills);
        }
        // A single fill object, not wrapped in a list
        if obj.contains_key("tid") && obj.contains_key("coin") {
            let fill: WsFill = serde_json::from_value(value.clone())?;
            return Ok(vec![fill]);
        }
        return Err(LedgerError::Validation(
            "object is neither a userFills payload nor a fill".to_string(),
        ));
    }

    if value.is_array() {
        let fills: Vec<WsFill> = serde_json::from_value(value.clone())?;
        return Ok(fills);
    }

    Err(LedgerError::Validation(format!(
        "cannot extract fills from {value}"
    )))
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| LedgerError::Validation(format!("unparsable {field}: {raw:?}")))
}

impl TryFrom<WsFill> for Fill {
    type Error = LedgerError;

    /// Convert a wire fill into a validated domain fill
    ///
    /// This is the validation boundary: unparsable or non-positive numbers
    /// and unknown sides are rejected here, before the ledger sees the fill.
    fn try_from(ws: WsFill) -> Result<Fill> {
        let fill = Fill {
            trade_id: ws.tid,
            order_id: ws.oid,
            coin: ws.coin,
            side: ws.side.parse()?,
            price: parse_f64("px", &ws.px)?,
            size: parse_f64("sz", &ws.sz)?,
            fee: match ws.fee.as_deref() {
                Some(raw) => parse_f64("fee", raw)?,
                None => 0.0,
            },
            timestamp: ws.time,
            closed_pnl: match ws.closed_pnl.as_deref() {
                Some(raw) => parse_f64("closedPnl", raw)?,
                None => 0.0,
            },
            hash: ws.hash,
            crossed: ws.crossed,
            dir: ws.dir,
            start_position: ws.start_position,
            fee_token: ws.fee_token,
            builder_fee: match ws.builder_fee.as_deref() {
                Some(raw) => Some(parse_f64("builderFee", raw)?),
                None => None,
            },
        };
        fill.validate()?;
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use pretty_assertions::assert_eq;

    const SNAPSHOT_MESSAGE: &str = r#"{
        "channel": "userFills",
        "data": {
            "isSnapshot": true,
            "user": "0xabc",
            "fills": [
                {"tid": 1001, "oid": 2001, "coin": "BTC", "side": "B", "px": "55000",
                 "sz": "0.01", "time": 1678886400000, "fee": "0.5", "closedPnl": "0",
                 "hash": "0xaaa", "crossed": true, "startPosition": "0",
                 "dir": "Open Long", "feeToken": "USDC"},
                {"tid": 1002, "oid": 2002, "coin": "ETH", "side": "A", "px": "4000",
                 "sz": "0.1", "time": 1678886500000, "fee": "0.4", "closedPnl": "0",
                 "hash": "0xbbb", "crossed": false, "startPosition": "0",
                 "dir": "Open Short", "feeToken": "USDC"}
            ]
        }
    }"#;

    const STREAM_FILL: &str = r#"{
        "tid": 1003, "oid": 2003, "coin": "BTC", "side": "A", "px": "55500",
        "sz": "0.005", "time": 1678886600000, "fee": "0.25", "closedPnl": "2.5",
        "hash": "0xccc", "crossed": true, "startPosition": "0.01",
        "dir": "Close Long", "feeToken": "USDC"
    }"#;

    #[test]
    fn test_extract_fills_from_channel_envelope() {
        let value: Value = serde_json::from_str(SNAPSHOT_MESSAGE).unwrap();
        let fills = extract_fills(&value).unwrap();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].tid, 1001);
        assert_eq!(fills[1].coin, "ETH");
    }

    #[test]
    fn test_extract_fills_from_bare_fill_object() {
        let value: Value = serde_json::from_str(STREAM_FILL).unwrap();
        let fills = extract_fills(&value).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].tid, 1003);
    }

    #[test]
    fn test_extract_fills_from_list() {
        let value: Value =
            serde_json::from_str(&format!("[{STREAM_FILL}, {STREAM_FILL}]")).unwrap();
        let fills = extract_fills(&value).unwrap();
        assert_eq!(fills.len(), 2);
    }

    #[test]
    fn test_extract_fills_rejects_unrelated_object() {
        let value: Value = serde_json::from_str(r#"{"channel": "trades"}"#).unwrap();
        assert!(extract_fills(&value).is_err());
    }

    #[test]
    fn test_ws_fill_converts_to_domain_fill() {
        let ws: WsFill = serde_json::from_str(STREAM_FILL).unwrap();
        let fill = Fill::try_from(ws).unwrap();
        assert_eq!(fill.trade_id, 1003);
        assert_eq!(fill.side, Side::Sell);
        assert_eq!(fill.price, 55500.0);
        assert_eq!(fill.size, 0.005);
        assert_eq!(fill.closed_pnl, 2.5);
        assert_eq!(fill.dir.as_deref(), Some("Close Long"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"tid": 7, "oid": 8, "coin": "SOL", "side": "B",
                      "px": "150", "sz": "1", "time": 1678886700000}"#;
        let ws: WsFill = serde_json::from_str(raw).unwrap();
        let fill = Fill::try_from(ws).unwrap();
        assert_eq!(fill.fee, 0.0);
        assert_eq!(fill.closed_pnl, 0.0);
        assert_eq!(fill.builder_fee, None);
    }

    #[test]
    fn test_unparsable_price_is_validation_error() {
        let raw = r#"{"tid": 7, "oid": 8, "coin": "SOL", "side": "B",
                      "px": "n/a", "sz": "1", "time": 1678886700000}"#;
        let ws: WsFill = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            Fill::try_from(ws),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_size_is_validation_error() {
        let raw = r#"{"tid": 7, "oid": 8, "coin": "SOL", "side": "B",
                      "px": "150", "sz": "0", "time": 1678886700000}"#;
        let ws: WsFill = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            Fill::try_from(ws),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_side_is_validation_error() {
        let raw = r#"{"tid": 7, "oid": 8, "coin": "SOL", "side": "X",
                      "px": "150", "sz": "1", "time": 1678886700000}"#;
        let ws: WsFill = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            Fill::try_from(ws),
            Err(LedgerError::Validation(_))
        ));
    }
}

//! Hyperliquid module - wire types for the exchange's fill payloads

pub mod messages;

pub use messages::{extract_fills, WsChannelMessage, WsFill, WsUserFills};

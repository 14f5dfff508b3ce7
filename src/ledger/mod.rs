//! Position ledger - fill ingestion and position aggregation
//!
//! The ledger owns two tables: an append-only `fills` log, deduplicated by
//! `(trade_id, network)`, and a `positions` aggregate keyed by
//! `(coin, network)`. [`Ledger::record_fill`] is the single write path;
//! it applies each fill at most once and keeps both tables consistent
//! within one transaction.
//!
//! The arithmetic itself lives in [`accounting`] and is pure: same-direction
//! fills re-weight the average entry, partial reductions leave it unchanged,
//! a sign flip re-anchors the basis at the flip price, and closing to flat
//! resets everything.

pub mod accounting;
pub mod store;

pub use accounting::PositionState;
pub use store::Ledger;

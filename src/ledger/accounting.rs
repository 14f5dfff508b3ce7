//! Incremental position/cost-basis accounting
//!
//! Pure arithmetic over a single position aggregate. Storage concerns live
//! in [`super::store`]; this module only answers "given the current state
//! and one more fill, what is the new state".

use serde::{Deserialize, Serialize};

use crate::common::types::{Side, SIZE_EPSILON};

/// The mutable part of a position aggregate
///
/// Invariant: a flat state (net size within [`SIZE_EPSILON`] of zero) always
/// carries `average_entry_price == 0` and `total_cost == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionState {
    /// Signed open quantity (positive = long, negative = short)
    pub net_size: f64,
    /// Cost-weighted price of the currently open exposure
    pub average_entry_price: f64,
    /// Signed cumulative cost of the open position
    pub total_cost: f64,
}

impl PositionState {
    /// The empty/flat state
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.net_size.abs() < SIZE_EPSILON
    }

    /// Apply one fill to this state and return the resulting state
    ///
    /// The caller guarantees `price > 0` and `size > 0` (enforced by
    /// `Fill::validate` at the ingestion boundary).
    ///
    /// Three regimes, checked in order:
    /// 1. The fill closes the position to (effectively) zero: the state
    ///    resets entirely, so a later re-open starts from a clean basis.
    /// 2. The position keeps its sign: an increase re-weights the average
    ///    entry from the accumulated cost; a partial reduction leaves the
    ///    average entry untouched, since closing part of a position does not
    ///    change what the remainder cost.
    /// 3. The fill pushes the position through zero to the opposite sign:
    ///    the surviving exposure was opened entirely by this fill, so the
    ///    average entry re-anchors at the fill's own price and the cost
    ///    basis is rebuilt from it.
    pub fn apply(&self, side: Side, price: f64, size: f64) -> PositionState {
        let signed_delta = side.sign() * size;
        let signed_value = side.sign() * price * size;

        let new_net_size = self.net_size + signed_delta;
        let new_total_cost = self.total_cost + signed_value;

        // Closed to flat: terminal reset, takes priority over everything else
        if new_net_size.abs() < SIZE_EPSILON {
            return PositionState::flat();
        }

        let was_flat = self.is_flat();
        let same_sign = was_flat || self.net_size.signum() == new_net_size.signum();

        if same_sign {
            let increasing = was_flat || side.sign() == self.net_size.signum();
            let average_entry_price = if increasing {
                if new_net_size > 0.0 {
                    new_total_cost / new_net_size
                } else {
                    // Short cost accumulates negative; the average entry is
                    // still quoted positive
                    (new_total_cost / new_net_size).abs()
                }
            } else {
                // Partial reduction: the remainder keeps its basis
                self.average_entry_price
            };
            PositionState {
                net_size: new_net_size,
                average_entry_price,
                total_cost: new_total_cost,
            }
        } else {
            // Sign flip: the old basis is fully realized, the new exposure
            // was opened at this fill's price
            PositionState {
                net_size: new_net_size,
                average_entry_price: price,
                total_cost: price * new_net_size,
            }
        }
    }
}

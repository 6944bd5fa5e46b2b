//! Per-user per-symbol share position.

/// A user's current position in one symbol.
///
/// Identified by `(user_id, symbol)`; at most one row per pair. `shares` is
/// always positive while the row exists: a position sold down to zero is
/// deleted, never stored as a zero row. `name` is the display name cached
/// from the last quote that touched the holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub user_id: i64,
    pub symbol: String,
    pub shares: i64,
    pub name: String,
}

impl Holding {
    /// shares * price
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }
}

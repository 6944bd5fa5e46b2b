//! Immutable transaction ledger entries.

use chrono::NaiveDateTime;
use std::fmt;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<TradeKind> {
        match s {
            "buy" => Some(TradeKind::Buy),
            "sell" => Some(TradeKind::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only ledger entry, written exactly once per successful trade
/// and never mutated afterwards.
///
/// `value` is `shares * price` at execution time; `cash_after` is the user's
/// cash balance immediately after the trade settled.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub user_id: i64,
    pub transacted: NaiveDateTime,
    pub kind: TradeKind,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub shares: i64,
    pub value: f64,
    pub cash_after: f64,
}

impl TransactionRecord {
    /// The entry's contribution to the user's cash balance: buys debit,
    /// sells credit. Starting cash plus the signed sum over a user's ledger
    /// reconstructs their current cash.
    pub fn signed_value(&self) -> f64 {
        match self.kind {
            TradeKind::Buy => -self.value,
            TradeKind::Sell => self.value,
        }
    }
}

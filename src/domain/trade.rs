//! Trade settlement: the pure arithmetic and invariant checks behind buy/sell.
//!
//! These functions are called by the ledger adapter inside its storage
//! transaction, so the funds/shares checks they perform are re-validated
//! against current state under isolation. They never mutate anything; they
//! either return the full set of resulting values or a rejection.

use super::error::PapertradeError;
use super::holding::Holding;
use super::quote::Quote;
use super::transaction::TradeKind;

/// How the holding row for `(user, symbol)` changes when a trade settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingChange {
    /// First purchase of the symbol: create the row with this share count.
    Open { shares: i64 },
    /// Existing row keeps existing, with this new (positive) share count.
    Adjust { shares: i64 },
    /// Position sold down to exactly zero: delete the row.
    Close,
}

/// Everything a settled trade writes: the ledger entry fields plus the
/// user's new cash balance (`cash_after`).
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub kind: TradeKind,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub shares: i64,
    pub value: f64,
    pub cash_after: f64,
}

fn ensure_positive_shares(shares: i64) -> Result<(), PapertradeError> {
    if shares <= 0 {
        return Err(PapertradeError::Validation {
            field: "shares".into(),
            reason: "must be a positive whole number".into(),
        });
    }
    Ok(())
}

/// Settle a purchase of `shares` at the quoted price against a balance of
/// `cash`, where `held` is the current share count for the symbol (if any).
///
/// Fails with `InsufficientFunds` when cost exceeds cash. The outcome's
/// display name comes from the quote, refreshing the cached holding name.
pub fn settle_buy(
    cash: f64,
    held: Option<i64>,
    quote: &Quote,
    shares: i64,
) -> Result<(TradeOutcome, HoldingChange), PapertradeError> {
    ensure_positive_shares(shares)?;

    let cost = shares as f64 * quote.price;
    if cost > cash {
        return Err(PapertradeError::InsufficientFunds {
            needed: cost,
            available: cash,
        });
    }

    let change = match held {
        None => HoldingChange::Open { shares },
        Some(existing) => HoldingChange::Adjust {
            shares: existing + shares,
        },
    };

    Ok((
        TradeOutcome {
            kind: TradeKind::Buy,
            name: quote.name.clone(),
            symbol: quote.symbol.clone(),
            price: quote.price,
            shares,
            value: cost,
            cash_after: cash - cost,
        },
        change,
    ))
}

/// Settle a sale of `shares` at `price` against a balance of `cash`, where
/// `holding` is the user's current position in `symbol` (if any).
///
/// Fails with `NoSuchHolding` when the user holds nothing, and with
/// `InsufficientShares` when asked to sell more than held; there are no
/// partial sells. The outcome keeps the holding's cached display name, as
/// the sale happens regardless of what the provider calls the company now.
pub fn settle_sell(
    cash: f64,
    symbol: &str,
    holding: Option<&Holding>,
    price: f64,
    shares: i64,
) -> Result<(TradeOutcome, HoldingChange), PapertradeError> {
    ensure_positive_shares(shares)?;

    let holding = holding.ok_or_else(|| PapertradeError::NoSuchHolding {
        symbol: symbol.to_string(),
    })?;

    if shares > holding.shares {
        return Err(PapertradeError::InsufficientShares {
            symbol: symbol.to_string(),
            requested: shares,
            held: holding.shares,
        });
    }

    let change = if shares == holding.shares {
        HoldingChange::Close
    } else {
        HoldingChange::Adjust {
            shares: holding.shares - shares,
        }
    };

    let proceeds = shares as f64 * price;

    Ok((
        TradeOutcome {
            kind: TradeKind::Sell,
            name: holding.name.clone(),
            symbol: symbol.to_string(),
            price,
            shares,
            value: proceeds,
            cash_after: cash + proceeds,
        },
        change,
    ))
}

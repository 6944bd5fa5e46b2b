//! The transaction engine: buy, sell, valuation, history.
//!
//! Stateless over its ports. Every operation takes the acting user id
//! explicitly; session resolution happens at the web boundary. The engine
//! validates inputs and resolves quotes, then hands the mutation to the
//! ledger port, which re-checks funds/shares inside a single storage
//! transaction so concurrent requests for the same user serialize.

use chrono::Utc;
use std::sync::Arc;

use super::error::PapertradeError;
use super::quote::Quote;
use super::transaction::TransactionRecord;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

/// One line of a portfolio valuation: the current worth of a single holding.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionValue {
    pub name: String,
    pub symbol: String,
    pub shares: i64,
    pub price: f64,
    pub value: f64,
}

/// Current worth of a user's cash plus holdings at quoted prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValuation {
    pub positions: Vec<PositionValue>,
    pub holdings_value: f64,
    pub cash: f64,
    pub grand_total: f64,
}

/// Trim, reject empty, and uppercase a user-supplied symbol.
pub fn validate_symbol(symbol: &str) -> Result<String, PapertradeError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(PapertradeError::Validation {
            field: "symbol".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(symbol.to_uppercase())
}

fn validate_shares(shares: i64) -> Result<(), PapertradeError> {
    if shares <= 0 {
        return Err(PapertradeError::Validation {
            field: "shares".into(),
            reason: "must be a positive whole number".into(),
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct TradingEngine {
    ledger: Arc<dyn LedgerPort + Send + Sync>,
    quotes: Arc<dyn QuotePort + Send + Sync>,
}

impl TradingEngine {
    pub fn new(
        ledger: Arc<dyn LedgerPort + Send + Sync>,
        quotes: Arc<dyn QuotePort + Send + Sync>,
    ) -> Self {
        Self { ledger, quotes }
    }

    /// Look up a current quote for a symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, PapertradeError> {
        let symbol = validate_symbol(symbol)?;
        self.quotes.lookup(&symbol).await
    }

    /// Buy `shares` of `symbol` at the current quoted price.
    ///
    /// On success the cash debit, holding upsert, and ledger append have all
    /// committed; on any error nothing has changed.
    pub async fn buy(
        &self,
        user_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<TransactionRecord, PapertradeError> {
        let symbol = validate_symbol(symbol)?;
        validate_shares(shares)?;

        let quote = self.quotes.lookup(&symbol).await?;
        self.ledger
            .execute_buy(user_id, &quote, shares, Utc::now().naive_utc())
    }

    /// Sell `shares` of `symbol` at the current quoted price.
    ///
    /// The holding is checked before the quote lookup so a user who holds
    /// nothing gets `NoSuchHolding` rather than a quote error; the ledger
    /// re-checks under its transaction before committing.
    pub async fn sell(
        &self,
        user_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<TransactionRecord, PapertradeError> {
        let symbol = validate_symbol(symbol)?;
        validate_shares(shares)?;

        let holding = self
            .ledger
            .holding(user_id, &symbol)?
            .ok_or_else(|| PapertradeError::NoSuchHolding {
                symbol: symbol.clone(),
            })?;
        if shares > holding.shares {
            return Err(PapertradeError::InsufficientShares {
                symbol: symbol.clone(),
                requested: shares,
                held: holding.shares,
            });
        }

        let quote = self.quotes.lookup(&symbol).await?;
        self.ledger
            .execute_sell(user_id, &symbol, quote.price, shares, Utc::now().naive_utc())
    }

    /// Value every holding at current quotes and combine with cash.
    ///
    /// Pure read. A quote failure for any symbol fails the whole valuation;
    /// no partial results.
    pub async fn portfolio(&self, user_id: i64) -> Result<PortfolioValuation, PapertradeError> {
        let cash = self.ledger.cash(user_id)?;
        let holdings = self.ledger.holdings(user_id)?;

        let mut positions = Vec::with_capacity(holdings.len());
        let mut holdings_value = 0.0;
        for holding in &holdings {
            let quote = self.quotes.lookup(&holding.symbol).await?;
            let value = holding.market_value(quote.price);
            holdings_value += value;
            positions.push(PositionValue {
                name: quote.name,
                symbol: quote.symbol,
                shares: holding.shares,
                price: quote.price,
                value,
            });
        }

        Ok(PortfolioValuation {
            positions,
            holdings_value,
            cash,
            grand_total: cash + holdings_value,
        })
    }

    /// The user's full transaction ledger in timestamp order.
    pub fn history(&self, user_id: i64) -> Result<Vec<TransactionRecord>, PapertradeError> {
        self.ledger.history(user_id)
    }
}

//! Quote provider port trait.

use async_trait::async_trait;

use crate::domain::error::PapertradeError;
use crate::domain::quote::Quote;

/// Price lookup for a ticker symbol.
///
/// An unknown ticker surfaces as `InvalidSymbol`; the engine does not retry
/// or fall back, it just reports the failure to the caller.
#[async_trait]
pub trait QuotePort {
    async fn lookup(&self, symbol: &str) -> Result<Quote, PapertradeError>;
}

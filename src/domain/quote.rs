//! Current price quote for a tradable symbol.

/// A point-in-time quote from the quote provider.
///
/// `price` is always a positive, finite currency amount; adapters reject
/// anything else before constructing a `Quote`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub name: String,
    pub symbol: String,
    pub price: f64,
}

impl Quote {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, price: f64) -> Self {
        Quote {
            name: name.into(),
            symbol: symbol.into(),
            price,
        }
    }
}

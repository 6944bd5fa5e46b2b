//! HTML templates using Askama.
//!
//! Money is formatted into strings before it reaches a template; the
//! templates themselves only ever see display-ready values.

use askama::Template;

/// Format a currency amount the way the pages show it: `$9,500.00`.
pub fn usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let total_cents = (amount.abs() * 100.0).round() as i64;
    let dollars = total_cents / 100;
    let cents = total_cents % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{cents:02}")
}

pub struct PortfolioRow {
    pub name: String,
    pub symbol: String,
    pub shares: i64,
    pub price: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "portfolio.html")]
pub struct PortfolioTemplate<'a> {
    pub username: &'a str,
    pub rows: &'a [PortfolioRow],
    pub holdings_value: String,
    pub cash: String,
    pub grand_total: String,
}

#[derive(Template)]
#[template(path = "buy.html")]
pub struct BuyTemplate;

pub struct SellRow {
    pub symbol: String,
    pub shares: i64,
}

#[derive(Template)]
#[template(path = "sell.html")]
pub struct SellTemplate<'a> {
    pub rows: &'a [SellRow],
}

#[derive(Template)]
#[template(path = "quote_form.html")]
pub struct QuoteFormTemplate;

#[derive(Template)]
#[template(path = "quoted.html")]
pub struct QuotedTemplate<'a> {
    pub name: &'a str,
    pub symbol: &'a str,
    pub price: String,
}

pub struct HistoryRow {
    pub transacted: String,
    pub kind: &'static str,
    pub name: String,
    pub symbol: String,
    pub shares: i64,
    pub price: String,
    pub value: String,
    pub cash_after: String,
}

#[derive(Template)]
#[template(path = "history.html")]
pub struct HistoryTemplate<'a> {
    pub rows: &'a [HistoryRow],
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

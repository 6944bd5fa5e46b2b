//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::domain::error::PapertradeError;

use super::auth::{self, Credentials, SessionUser};
use super::templates::{
    BuyTemplate, HistoryRow, HistoryTemplate, LoginTemplate, PortfolioRow,
    PortfolioTemplate, QuoteFormTemplate, QuotedTemplate, RegisterTemplate, SellRow, SellTemplate,
    usd,
};
use super::{AppState, AuthSession, WebError};

fn render<T: Template>(template: &T) -> Result<Response, WebError> {
    let html = template
        .render()
        .map_err(|e| WebError::internal(e.to_string()))?;
    Ok(Html(html).into_response())
}

fn current_user(auth_session: &AuthSession) -> Result<SessionUser, WebError> {
    auth_session
        .user
        .clone()
        .ok_or_else(|| WebError::new(StatusCode::UNAUTHORIZED, "authentication required"))
}

/// Parse a form share count. Anything that is not a whole number is a
/// validation failure, never a silent default.
fn parse_shares(raw: &str) -> Result<i64, PapertradeError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| PapertradeError::Validation {
            field: "shares".into(),
            reason: "must be a positive whole number".into(),
        })
}

pub async fn portfolio(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    let user = current_user(&auth_session)?;
    let valuation = state.engine.portfolio(user.id).await?;

    let rows: Vec<PortfolioRow> = valuation
        .positions
        .iter()
        .map(|p| PortfolioRow {
            name: p.name.clone(),
            symbol: p.symbol.clone(),
            shares: p.shares,
            price: usd(p.price),
            value: usd(p.value),
        })
        .collect();

    render(&PortfolioTemplate {
        username: &user.username,
        rows: &rows,
        holdings_value: usd(valuation.holdings_value),
        cash: usd(valuation.cash),
        grand_total: usd(valuation.grand_total),
    })
}

pub async fn buy_form() -> Result<Response, WebError> {
    render(&BuyTemplate)
}

#[derive(serde::Deserialize)]
pub struct TradeForm {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub shares: String,
}

pub async fn buy(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Form(form): Form<TradeForm>,
) -> Result<Response, WebError> {
    let user = current_user(&auth_session)?;
    let shares = parse_shares(&form.shares)?;
    state.engine.buy(user.id, &form.symbol, shares).await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn sell_form(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    let user = current_user(&auth_session)?;
    let holdings = state.ledger.holdings(user.id)?;

    if holdings.is_empty() {
        return Err(WebError::bad_request("you have no shares to sell"));
    }

    let rows: Vec<SellRow> = holdings
        .iter()
        .map(|h| SellRow {
            symbol: h.symbol.clone(),
            shares: h.shares,
        })
        .collect();

    render(&SellTemplate { rows: &rows })
}

pub async fn sell(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
    Form(form): Form<TradeForm>,
) -> Result<Response, WebError> {
    let user = current_user(&auth_session)?;
    let shares = parse_shares(&form.shares)?;
    state.engine.sell(user.id, &form.symbol, shares).await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn quote_form() -> Result<Response, WebError> {
    render(&QuoteFormTemplate)
}

#[derive(serde::Deserialize)]
pub struct QuoteForm {
    #[serde(default)]
    pub symbol: String,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuoteForm>,
) -> Result<Response, WebError> {
    let quote = state.engine.quote(&form.symbol).await?;
    render(&QuotedTemplate {
        name: &quote.name,
        symbol: &quote.symbol,
        price: usd(quote.price),
    })
}

pub async fn history(
    auth_session: AuthSession,
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    let user = current_user(&auth_session)?;
    let records = state.engine.history(user.id)?;

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|r| HistoryRow {
            transacted: r.transacted.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: r.kind.as_str(),
            name: r.name.clone(),
            symbol: r.symbol.clone(),
            shares: r.shares,
            price: usd(r.price),
            value: usd(r.value),
            cash_after: usd(r.cash_after),
        })
        .collect();

    render(&HistoryTemplate { rows: &rows })
}

pub async fn login_form() -> Result<Response, WebError> {
    render(&LoginTemplate { error: None })
}

fn login_rejected() -> Result<Response, WebError> {
    let template = LoginTemplate {
        error: Some("invalid username and/or password"),
    };
    let html = template
        .render()
        .map_err(|e| WebError::internal(e.to_string()))?;
    Ok((StatusCode::FORBIDDEN, Html(html)).into_response())
}

pub async fn login(
    mut auth_session: AuthSession,
    Form(creds): Form<Credentials>,
) -> Result<Response, WebError> {
    // One generic message regardless of which field was wrong.
    if creds.username.trim().is_empty() || creds.password.is_empty() {
        return login_rejected();
    }

    let user = match auth_session
        .authenticate(creds)
        .await
        .map_err(|e| WebError::internal(e.to_string()))?
    {
        Some(user) => user,
        None => return login_rejected(),
    };

    auth_session
        .login(&user)
        .await
        .map_err(|e| WebError::internal(e.to_string()))?;

    log::info!("user {} logged in", user.username);
    Ok(Redirect::to("/").into_response())
}

pub async fn logout(mut auth_session: AuthSession) -> Result<Response, WebError> {
    auth_session
        .logout()
        .await
        .map_err(|e| WebError::internal(e.to_string()))?;
    Ok(Redirect::to("/login").into_response())
}

pub async fn register_form() -> Result<Response, WebError> {
    render(&RegisterTemplate)
}

#[derive(serde::Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirmation: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(PapertradeError::Validation {
            field: "username".into(),
            reason: "must not be empty".into(),
        }
        .into());
    }
    if form.password.is_empty() || form.confirmation.is_empty() {
        return Err(PapertradeError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        }
        .into());
    }
    if form.password != form.confirmation {
        return Err(PapertradeError::PasswordMismatch.into());
    }

    let password_hash = auth::hash_password(&form.password)?;
    let starting_cash = state.config.get_double("ledger", "starting_cash", 10_000.0);
    state
        .ledger
        .create_user(username, &password_hash, starting_cash)?;

    log::info!("registered user {username}");
    Ok(Redirect::to("/login").into_response())
}

pub async fn not_found() -> WebError {
    WebError::not_found("page not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_counts_must_be_whole_numbers() {
        assert_eq!(parse_shares("10").unwrap(), 10);
        assert_eq!(parse_shares(" 3 ").unwrap(), 3);
        for raw in ["", "abc", "1.5", "2e3"] {
            assert!(matches!(
                parse_shares(raw),
                Err(PapertradeError::Validation { .. })
            ));
        }
    }
}

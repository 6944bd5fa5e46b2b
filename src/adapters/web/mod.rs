//! Web server adapter.
//!
//! Axum application exposing the trading surface: portfolio, buy, sell,
//! quote, history, plus registration and session login. Sessions ride in
//! signed cookies; protected routes redirect to `/login`.

mod auth;
mod error;
mod handlers;
mod templates;

pub use auth::{Backend, Credentials, SessionUser, hash_password};
pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{
    Router,
    routing::{get, post},
};
use axum_login::{AuthManagerLayerBuilder, login_required};
use std::sync::Arc;
use time::Duration;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};

use crate::domain::engine::TradingEngine;
use crate::domain::error::PapertradeError;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

pub type AuthSession = axum_login::AuthSession<Backend>;

pub struct AppState {
    pub engine: TradingEngine,
    pub ledger: Arc<dyn LedgerPort + Send + Sync>,
    pub config: Arc<dyn ConfigPort + Send + Sync>,
}

fn session_key(config: &dyn ConfigPort) -> Result<Key, PapertradeError> {
    let secret = config.get_string("auth", "session_secret").ok_or_else(|| {
        PapertradeError::ConfigMissing {
            section: "auth".into(),
            key: "session_secret".into(),
        }
    })?;

    let bytes = hex::decode(secret.trim()).map_err(|e| PapertradeError::ConfigInvalid {
        section: "auth".into(),
        key: "session_secret".into(),
        reason: e.to_string(),
    })?;

    Key::try_from(&bytes[..]).map_err(|_| PapertradeError::ConfigInvalid {
        section: "auth".into(),
        key: "session_secret".into(),
        reason: "must decode to at least 64 bytes".into(),
    })
}

pub fn build_router(state: AppState) -> Result<Router, PapertradeError> {
    let key = session_key(&*state.config)?;
    let lifetime = state.config.get_int("auth", "session_lifetime", 86_400);

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_signed(key)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(lifetime)));

    let backend = Backend::new(state.ledger.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let router = Router::new()
        .route("/", get(handlers::portfolio))
        .route("/buy", get(handlers::buy_form).post(handlers::buy))
        .route("/sell", get(handlers::sell_form).post(handlers::sell))
        .route("/quote", get(handlers::quote_form).post(handlers::quote))
        .route("/history", get(handlers::history))
        .route("/logout", post(handlers::logout))
        .route_layer(login_required!(Backend, login_url = "/login"))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .nest_service("/static", ServeDir::new("static"))
        .fallback(handlers::not_found)
        .layer(auth_layer)
        .with_state(Arc::new(state));

    Ok(router)
}

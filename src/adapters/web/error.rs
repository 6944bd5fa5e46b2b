//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::domain::error::PapertradeError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &PapertradeError) -> StatusCode {
    match err {
        // Request rejections render as the classic 400 "apology" page.
        PapertradeError::Validation { .. }
        | PapertradeError::InvalidSymbol { .. }
        | PapertradeError::InsufficientFunds { .. }
        | PapertradeError::InsufficientShares { .. }
        | PapertradeError::NoSuchHolding { .. }
        | PapertradeError::DuplicateUsername { .. }
        | PapertradeError::PasswordMismatch => StatusCode::BAD_REQUEST,
        PapertradeError::Authentication => StatusCode::FORBIDDEN,
        PapertradeError::Database { .. }
        | PapertradeError::DatabaseQuery { .. }
        | PapertradeError::ConfigParse { .. }
        | PapertradeError::ConfigMissing { .. }
        | PapertradeError::ConfigInvalid { .. }
        | PapertradeError::QuoteProvider { .. }
        | PapertradeError::PasswordHash { .. }
        | PapertradeError::UnknownUser { .. }
        | PapertradeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PapertradeError> for WebError {
    fn from(err: PapertradeError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = super::templates::ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_bad_request() {
        let err = PapertradeError::InsufficientFunds {
            needed: 500.0,
            available: 400.0,
        };
        assert_eq!(status_from_error(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_maps_to_forbidden_and_storage_to_internal() {
        assert_eq!(
            status_from_error(&PapertradeError::Authentication),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_from_error(&PapertradeError::Database {
                reason: "locked".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

//! Authentication backend for axum-login.
//!
//! Credentials are verified against the argon2 hashes stored in the users
//! table. Login failures are never attributed to a specific field: a missing
//! username and a wrong password both surface as the same generic message.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use axum_login::{AuthUser, AuthnBackend, UserId};
use rand::rngs::OsRng;
use std::sync::Arc;

use crate::domain::error::PapertradeError;
use crate::domain::user::UserRecord;
use crate::ports::ledger_port::LedgerPort;

/// Authenticated user as stored in the session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    /// The password hash string as bytes, used by axum-login to validate
    /// sessions; a password change invalidates existing sessions.
    pw_hash_bytes: Vec<u8>,
}

impl AuthUser for SessionUser {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.pw_hash_bytes
    }
}

/// Login credentials submitted via the login form.
#[derive(Clone, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Authentication backend over the users table.
#[derive(Clone)]
pub struct Backend {
    ledger: Arc<dyn LedgerPort + Send + Sync>,
}

impl Backend {
    pub fn new(ledger: Arc<dyn LedgerPort + Send + Sync>) -> Self {
        Self { ledger }
    }

    fn make_user(record: &UserRecord) -> SessionUser {
        SessionUser {
            id: record.id,
            username: record.username.clone(),
            pw_hash_bytes: record.password_hash.as_bytes().to_vec(),
        }
    }
}

impl AuthnBackend for Backend {
    type User = SessionUser;
    type Credentials = Credentials;
    type Error = PapertradeError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(record) = self.ledger.user_by_name(&creds.username)? else {
            return Ok(None);
        };

        let parsed_hash = match PasswordHash::new(&record.password_hash) {
            Ok(h) => h,
            Err(_) => return Ok(None),
        };

        let argon2 = Argon2::default();
        if argon2
            .verify_password(creds.password.as_bytes(), &parsed_hash)
            .is_ok()
        {
            Ok(Some(Self::make_user(&record)))
        } else {
            Ok(None)
        }
    }

    async fn get_user(
        &self,
        user_id: &UserId<Self>,
    ) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.ledger.user_by_id(*user_id)?.map(|r| Self::make_user(&r)))
    }
}

/// Argon2id hash of a new password, for registration and the CLI.
pub fn hash_password(password: &str) -> Result<String, PapertradeError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PapertradeError::PasswordHash {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"correct horse", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong horse", &parsed)
                .is_err()
        );
    }
}

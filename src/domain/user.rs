//! Registered user account.

/// One row of the users table.
///
/// `cash` is mutated only by buy/sell settlement and never goes below zero.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub cash: f64,
}

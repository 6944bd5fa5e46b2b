//! Core domain types and logic.

pub mod engine;
pub mod error;
pub mod holding;
pub mod quote;
pub mod trade;
pub mod transaction;
pub mod user;

//! Ledger storage port trait.

use chrono::NaiveDateTime;

use crate::domain::error::PapertradeError;
use crate::domain::holding::Holding;
use crate::domain::quote::Quote;
use crate::domain::transaction::TransactionRecord;
use crate::domain::user::UserRecord;

/// Persistence for users, holdings, and the transaction ledger.
///
/// `execute_buy` and `execute_sell` are the only mutating trade entry points
/// and must be atomic: the cash update, holding upsert/delete, and ledger
/// append all commit together or not at all, with the funds/shares checks
/// re-evaluated against current state inside the same transaction.
pub trait LedgerPort {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        starting_cash: f64,
    ) -> Result<i64, PapertradeError>;

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, PapertradeError>;

    fn user_by_id(&self, user_id: i64) -> Result<Option<UserRecord>, PapertradeError>;

    /// Current cash balance; `UnknownUser` if the id does not exist.
    fn cash(&self, user_id: i64) -> Result<f64, PapertradeError>;

    /// All of a user's holdings, ordered by symbol.
    fn holdings(&self, user_id: i64) -> Result<Vec<Holding>, PapertradeError>;

    fn holding(&self, user_id: i64, symbol: &str) -> Result<Option<Holding>, PapertradeError>;

    /// The user's ledger entries in timestamp order.
    fn history(&self, user_id: i64) -> Result<Vec<TransactionRecord>, PapertradeError>;

    fn execute_buy(
        &self,
        user_id: i64,
        quote: &Quote,
        shares: i64,
        at: NaiveDateTime,
    ) -> Result<TransactionRecord, PapertradeError>;

    fn execute_sell(
        &self,
        user_id: i64,
        symbol: &str,
        price: f64,
        shares: i64,
        at: NaiveDateTime,
    ) -> Result<TransactionRecord, PapertradeError>;
}

//! SQLite ledger adapter.
//!
//! Holds users, holdings, and the append-only transactions table. Buy/sell
//! settlement runs inside a single IMMEDIATE transaction so concurrent
//! mutations of the same user's rows serialize; the funds/shares checks from
//! [`crate::domain::trade`] are evaluated against state read under that
//! transaction, never against a stale pre-read.

use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};

use crate::domain::error::PapertradeError;
use crate::domain::holding::Holding;
use crate::domain::quote::Quote;
use crate::domain::trade::{self, HoldingChange, TradeOutcome};
use crate::domain::transaction::{TradeKind, TransactionRecord};
use crate::domain::user::UserRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> PapertradeError {
    PapertradeError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> PapertradeError {
    PapertradeError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteLedger {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertradeError> {
        let db_path =
            config
                .get_string("database", "path")
                .ok_or_else(|| PapertradeError::ConfigMissing {
                    section: "database".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("database", "pool_size", 4) as u32;

        // Contended writers wait for the lock rather than failing with
        // SQLITE_BUSY.
        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.busy_timeout(std::time::Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PapertradeError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                cash REAL NOT NULL CHECK (cash >= 0)
            );
            CREATE TABLE IF NOT EXISTS holdings (
                user_id INTEGER NOT NULL REFERENCES users(id),
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                shares INTEGER NOT NULL CHECK (shares > 0),
                PRIMARY KEY (user_id, symbol)
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                transacted TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('buy', 'sell')),
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                price REAL NOT NULL,
                shares INTEGER NOT NULL,
                value REAL NOT NULL,
                cash_after REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_user
                ON transactions(user_id, transacted);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    fn read_cash(tx: &Transaction<'_>, user_id: i64) -> Result<f64, PapertradeError> {
        tx.query_row(
            "SELECT cash FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(query_err)?
        .ok_or(PapertradeError::UnknownUser { user_id })
    }

    fn read_holding(
        tx: &Transaction<'_>,
        user_id: i64,
        symbol: &str,
    ) -> Result<Option<Holding>, PapertradeError> {
        tx.query_row(
            "SELECT symbol, shares, name FROM holdings WHERE user_id = ?1 AND symbol = ?2",
            params![user_id, symbol],
            |row| {
                Ok(Holding {
                    user_id,
                    symbol: row.get(0)?,
                    shares: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    /// Write all three mutations of a settled trade. Caller commits.
    fn apply_trade(
        tx: &Transaction<'_>,
        user_id: i64,
        outcome: &TradeOutcome,
        change: &HoldingChange,
        at: NaiveDateTime,
    ) -> Result<(), PapertradeError> {
        tx.execute(
            "UPDATE users SET cash = ?1 WHERE id = ?2",
            params![outcome.cash_after, user_id],
        )
        .map_err(query_err)?;

        match change {
            HoldingChange::Open { shares } => {
                tx.execute(
                    "INSERT INTO holdings (user_id, symbol, name, shares)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, outcome.symbol, outcome.name, shares],
                )
                .map_err(query_err)?;
            }
            HoldingChange::Adjust { shares } => {
                tx.execute(
                    "UPDATE holdings SET shares = ?1, name = ?2
                     WHERE user_id = ?3 AND symbol = ?4",
                    params![shares, outcome.name, user_id, outcome.symbol],
                )
                .map_err(query_err)?;
            }
            HoldingChange::Close => {
                tx.execute(
                    "DELETE FROM holdings WHERE user_id = ?1 AND symbol = ?2",
                    params![user_id, outcome.symbol],
                )
                .map_err(query_err)?;
            }
        }

        tx.execute(
            "INSERT INTO transactions
                 (user_id, transacted, kind, name, symbol, price, shares, value, cash_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user_id,
                at.format(TIMESTAMP_FORMAT).to_string(),
                outcome.kind.as_str(),
                outcome.name,
                outcome.symbol,
                outcome.price,
                outcome.shares,
                outcome.value,
                outcome.cash_after,
            ],
        )
        .map_err(query_err)?;

        Ok(())
    }

    fn record_from_outcome(user_id: i64, at: NaiveDateTime, outcome: TradeOutcome) -> TransactionRecord {
        TransactionRecord {
            user_id,
            transacted: at,
            kind: outcome.kind,
            name: outcome.name,
            symbol: outcome.symbol,
            price: outcome.price,
            shares: outcome.shares,
            value: outcome.value,
            cash_after: outcome.cash_after,
        }
    }
}

impl LedgerPort for SqliteLedger {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        starting_cash: f64,
    ) -> Result<i64, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO users (username, password_hash, cash) VALUES (?1, ?2, ?3)",
            params![username, password_hash, starting_cash],
        )
        .map_err(|e: rusqlite::Error| match e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PapertradeError::DuplicateUsername {
                    username: username.to_string(),
                }
            }
            other => query_err(other),
        })?;

        Ok(conn.last_insert_rowid())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT id, username, password_hash, cash FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    cash: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn user_by_id(&self, user_id: i64) -> Result<Option<UserRecord>, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT id, username, password_hash, cash FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    cash: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn cash(&self, user_id: i64) -> Result<f64, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT cash FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(query_err)?
        .ok_or(PapertradeError::UnknownUser { user_id })
    }

    fn holdings(&self, user_id: i64) -> Result<Vec<Holding>, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, shares, name FROM holdings
                 WHERE user_id = ?1 ORDER BY symbol",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(Holding {
                    user_id,
                    symbol: row.get(0)?,
                    shares: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .map_err(query_err)?;

        let mut holdings = Vec::new();
        for row in rows {
            holdings.push(row.map_err(query_err)?);
        }

        Ok(holdings)
    }

    fn holding(&self, user_id: i64, symbol: &str) -> Result<Option<Holding>, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT symbol, shares, name FROM holdings WHERE user_id = ?1 AND symbol = ?2",
            params![user_id, symbol],
            |row| {
                Ok(Holding {
                    user_id,
                    symbol: row.get(0)?,
                    shares: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn history(&self, user_id: i64) -> Result<Vec<TransactionRecord>, PapertradeError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT transacted, kind, name, symbol, price, shares, value, cash_after
                 FROM transactions WHERE user_id = ?1
                 ORDER BY transacted ASC, id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let ts_str: String = row.get(0)?;
                let transacted = NaiveDateTime::parse_from_str(&ts_str, TIMESTAMP_FORMAT)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            ts_str.len(),
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                let kind_str: String = row.get(1)?;
                let kind = TradeKind::parse(&kind_str).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        kind_str.len(),
                        rusqlite::types::Type::Text,
                        "unrecognized transaction kind".into(),
                    )
                })?;
                Ok(TransactionRecord {
                    user_id,
                    transacted,
                    kind,
                    name: row.get(2)?,
                    symbol: row.get(3)?,
                    price: row.get(4)?,
                    shares: row.get(5)?,
                    value: row.get(6)?,
                    cash_after: row.get(7)?,
                })
            })
            .map_err(query_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_err)?);
        }

        Ok(records)
    }

    fn execute_buy(
        &self,
        user_id: i64,
        quote: &Quote,
        shares: i64,
        at: NaiveDateTime,
    ) -> Result<TransactionRecord, PapertradeError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let cash = Self::read_cash(&tx, user_id)?;
        let held = Self::read_holding(&tx, user_id, &quote.symbol)?.map(|h| h.shares);

        let (outcome, change) = trade::settle_buy(cash, held, quote, shares)?;
        Self::apply_trade(&tx, user_id, &outcome, &change, at)?;

        tx.commit().map_err(query_err)?;

        Ok(Self::record_from_outcome(user_id, at, outcome))
    }

    fn execute_sell(
        &self,
        user_id: i64,
        symbol: &str,
        price: f64,
        shares: i64,
        at: NaiveDateTime,
    ) -> Result<TransactionRecord, PapertradeError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let cash = Self::read_cash(&tx, user_id)?;
        let holding = Self::read_holding(&tx, user_id, symbol)?;

        let (outcome, change) = trade::settle_sell(cash, symbol, holding.as_ref(), price, shares)?;
        Self::apply_trade(&tx, user_id, &outcome, &change, at)?;

        tx.commit().map_err(query_err)?;

        Ok(Self::record_from_outcome(user_id, at, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn ledger() -> SqliteLedger {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.initialize_schema().unwrap();
        ledger
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote::new(format!("{symbol} Corp"), symbol, price)
    }

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteLedger::from_config(&EmptyConfig);
        match result {
            Err(PapertradeError::ConfigMissing { section, key }) => {
                assert_eq!(section, "database");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn create_user_and_fetch_back() {
        let ledger = ledger();
        let id = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        let by_name = ledger.user_by_name("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_abs_diff_eq!(by_name.cash, 10_000.0);

        let by_id = ledger.user_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(ledger.user_by_name("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let ledger = ledger();
        ledger.create_user("alice", "hash", 10_000.0).unwrap();

        let err = ledger.create_user("alice", "hash2", 10_000.0).unwrap_err();
        assert!(matches!(err, PapertradeError::DuplicateUsername { .. }));
    }

    #[test]
    fn cash_for_unknown_user_errors() {
        let ledger = ledger();
        let err = ledger.cash(42).unwrap_err();
        assert!(matches!(err, PapertradeError::UnknownUser { user_id: 42 }));
    }

    #[test]
    fn buy_debits_cash_and_opens_holding() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        let record = ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap();

        assert_eq!(record.kind, TradeKind::Buy);
        assert_abs_diff_eq!(record.value, 500.0);
        assert_abs_diff_eq!(record.cash_after, 9500.0);
        assert_abs_diff_eq!(ledger.cash(user).unwrap(), 9500.0);

        let holding = ledger.holding(user, "AAA").unwrap().unwrap();
        assert_eq!(holding.shares, 10);
        assert_eq!(holding.name, "AAA Corp");
    }

    #[test]
    fn second_buy_increments_and_refreshes_name() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap();
        ledger
            .execute_buy(user, &Quote::new("AAA Renamed", "AAA", 60.0), 5, at(10, 5))
            .unwrap();

        assert_abs_diff_eq!(ledger.cash(user).unwrap(), 9200.0);
        let holding = ledger.holding(user, "AAA").unwrap().unwrap();
        assert_eq!(holding.shares, 15);
        assert_eq!(holding.name, "AAA Renamed");
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 400.0).unwrap();

        let err = ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap_err();
        assert!(matches!(err, PapertradeError::InsufficientFunds { .. }));

        assert_abs_diff_eq!(ledger.cash(user).unwrap(), 400.0);
        assert!(ledger.holding(user, "AAA").unwrap().is_none());
        assert!(ledger.history(user).unwrap().is_empty());
    }

    #[test]
    fn full_sell_deletes_holding_row() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap();
        ledger
            .execute_buy(user, &quote("AAA", 60.0), 5, at(10, 5))
            .unwrap();

        let record = ledger
            .execute_sell(user, "AAA", 70.0, 15, at(11, 0))
            .unwrap();

        assert_eq!(record.kind, TradeKind::Sell);
        assert_abs_diff_eq!(record.value, 1050.0);
        assert_abs_diff_eq!(record.cash_after, 10_250.0);
        assert!(ledger.holding(user, "AAA").unwrap().is_none());
    }

    #[test]
    fn partial_sell_decrements_holding() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap();
        ledger.execute_sell(user, "AAA", 55.0, 4, at(11, 0)).unwrap();

        let holding = ledger.holding(user, "AAA").unwrap().unwrap();
        assert_eq!(holding.shares, 6);
        assert_abs_diff_eq!(ledger.cash(user).unwrap(), 9720.0);
    }

    #[test]
    fn oversell_changes_nothing() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("BBB", 100.0), 3, at(10, 0))
            .unwrap();

        let err = ledger
            .execute_sell(user, "BBB", 100.0, 5, at(11, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            PapertradeError::InsufficientShares { held: 3, .. }
        ));

        assert_abs_diff_eq!(ledger.cash(user).unwrap(), 9700.0);
        assert_eq!(ledger.holding(user, "BBB").unwrap().unwrap().shares, 3);
        assert_eq!(ledger.history(user).unwrap().len(), 1);
    }

    #[test]
    fn history_is_ordered_and_complete() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("AAA", 50.0), 10, at(9, 30))
            .unwrap();
        ledger
            .execute_buy(user, &quote("BBB", 20.0), 2, at(10, 0))
            .unwrap();
        ledger.execute_sell(user, "AAA", 55.0, 10, at(14, 0)).unwrap();

        let history = ledger.history(user).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].symbol, "AAA");
        assert_eq!(history[0].kind, TradeKind::Buy);
        assert_eq!(history[2].kind, TradeKind::Sell);
        assert!(history.windows(2).all(|w| w[0].transacted <= w[1].transacted));

        // Starting cash plus the signed ledger sum reconstructs current cash.
        let replayed: f64 = 10_000.0 + history.iter().map(|r| r.signed_value()).sum::<f64>();
        assert_abs_diff_eq!(replayed, ledger.cash(user).unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn holdings_are_listed_by_symbol() {
        let ledger = ledger();
        let user = ledger.create_user("alice", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(user, &quote("ZZZ", 10.0), 1, at(10, 0))
            .unwrap();
        ledger
            .execute_buy(user, &quote("AAA", 10.0), 1, at(10, 1))
            .unwrap();

        let holdings = ledger.holdings(user).unwrap();
        let symbols: Vec<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn users_are_isolated() {
        let ledger = ledger();
        let alice = ledger.create_user("alice", "hash", 10_000.0).unwrap();
        let bob = ledger.create_user("bob", "hash", 10_000.0).unwrap();

        ledger
            .execute_buy(alice, &quote("AAA", 50.0), 10, at(10, 0))
            .unwrap();

        assert!(ledger.holdings(bob).unwrap().is_empty());
        assert!(ledger.history(bob).unwrap().is_empty());
        assert_abs_diff_eq!(ledger.cash(bob).unwrap(), 10_000.0);
    }
}

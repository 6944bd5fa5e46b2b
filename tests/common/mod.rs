#![allow(dead_code)]

use async_trait::async_trait;
use papertrade::domain::engine::TradingEngine;
use papertrade::domain::error::PapertradeError;
use papertrade::domain::quote::Quote;
use papertrade::ports::config_port::ConfigPort;
use papertrade::ports::ledger_port::LedgerPort;
use papertrade::ports::quote_port::QuotePort;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub use papertrade::adapters::sqlite_ledger::SqliteLedger;

/// Quote source backed by a fixed price table. Symbols in the failure set
/// report as invalid; everything else not in the table does too.
pub struct MockQuotePort {
    quotes: HashMap<String, Quote>,
    failures: HashSet<String>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            quotes: HashMap::new(),
            failures: HashSet::new(),
        }
    }

    pub fn with_quote(mut self, symbol: &str, name: &str, price: f64) -> Self {
        self.quotes
            .insert(symbol.to_string(), Quote::new(name, symbol, price));
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failures.insert(symbol.to_string());
        self
    }
}

#[async_trait]
impl QuotePort for MockQuotePort {
    async fn lookup(&self, symbol: &str) -> Result<Quote, PapertradeError> {
        if self.failures.contains(symbol) {
            return Err(PapertradeError::QuoteProvider {
                reason: format!("simulated outage for {symbol}"),
            });
        }
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| PapertradeError::InvalidSymbol {
                symbol: symbol.to_string(),
            })
    }
}

pub struct MockConfigPort;

impl ConfigPort for MockConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            ("auth", "session_secret") => Some(
                "00000000000000000000000000000001\
                 00000000000000000000000000000001\
                 00000000000000000000000000000001\
                 00000000000000000000000000000001"
                    .to_string(),
            ),
            ("database", "path") => Some(":memory:".to_string()),
            _ => None,
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match (section, key) {
            ("auth", "session_lifetime") => 86400,
            _ => default,
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match (section, key) {
            ("ledger", "starting_cash") => 10_000.0,
            _ => default,
        }
    }

    fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
        default
    }
}

struct FileDbConfig {
    path: String,
}

impl ConfigPort for FileDbConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            ("database", "path") => Some(self.path.clone()),
            _ => None,
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match (section, key) {
            ("database", "pool_size") => 8,
            _ => default,
        }
    }

    fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
        default
    }

    fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
        default
    }
}

/// File-backed ledger with a multi-connection pool, for tests that exercise
/// concurrent mutations.
pub fn file_ledger(path: &std::path::Path) -> Arc<SqliteLedger> {
    let config = FileDbConfig {
        path: path.display().to_string(),
    };
    let ledger = SqliteLedger::from_config(&config).expect("file-backed ledger");
    ledger.initialize_schema().expect("schema");
    Arc::new(ledger)
}

pub fn new_ledger() -> Arc<SqliteLedger> {
    let ledger = SqliteLedger::in_memory().expect("in-memory ledger");
    ledger.initialize_schema().expect("schema");
    Arc::new(ledger)
}

pub fn new_engine(ledger: Arc<SqliteLedger>, quotes: MockQuotePort) -> TradingEngine {
    let ledger: Arc<dyn LedgerPort + Send + Sync> = ledger;
    TradingEngine::new(ledger, Arc::new(quotes))
}

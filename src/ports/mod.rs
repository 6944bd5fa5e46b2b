pub mod config_port;
pub mod ledger_port;
pub mod quote_port;

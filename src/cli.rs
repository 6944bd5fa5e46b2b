//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http_quote_adapter::HttpQuoteAdapter;
use crate::adapters::sqlite_ledger::SqliteLedger;
use crate::domain::error::PapertradeError;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "papertrade", about = "Paper-trading portfolio server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the ledger schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register a user account (reads the password from stdin)
    AddUser {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        username: String,
    },
    /// Look up a current quote for a symbol
    Quote {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
    },
    /// Output an argon2 hash for a password
    HashPassword,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::AddUser { config, username } => run_add_user(&config, &username),
        Command::Quote { config, symbol } => run_quote(&config, &symbol),
        Command::HashPassword => run_hash_password(),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PapertradeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_ledger(config: &dyn ConfigPort) -> Result<SqliteLedger, ExitCode> {
    let ledger = match SqliteLedger::from_config(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return Err((&e).into());
        }
    };
    if let Err(e) = ledger.initialize_schema() {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    Ok(ledger)
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    use std::net::SocketAddr;

    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let quotes = match HttpQuoteAdapter::from_config(&config) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let addr: SocketAddr = config
        .get_string("web", "listen")
        .unwrap_or_else(|| "127.0.0.1:3000".to_string())
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:3000".parse().unwrap());

    let ledger: Arc<dyn LedgerPort + Send + Sync> = Arc::new(ledger);
    let engine = crate::domain::engine::TradingEngine::new(ledger.clone(), Arc::new(quotes));

    let state = crate::adapters::web::AppState {
        engine,
        ledger,
        config: Arc::new(config),
    };

    let router = match crate::adapters::web::build_router(state) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    log::info!("starting web server on {addr}");
    eprintln!("Starting web server on {addr}");

    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, router).await.unwrap();
    });

    ExitCode::SUCCESS
}

fn run_init_db(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match open_ledger(&config) {
        Ok(_) => {
            eprintln!("Ledger schema initialized");
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_add_user(config_path: &PathBuf, username: &str) -> ExitCode {
    use std::io::{self, BufRead};

    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };

    eprintln!("Enter password for {username}:");
    let stdin = io::stdin();
    let password = stdin
        .lock()
        .lines()
        .next()
        .unwrap_or(Ok(String::new()))
        .unwrap_or_default();

    if password.is_empty() {
        eprintln!("error: password must not be empty");
        return ExitCode::from(4);
    }

    let hash = match crate::adapters::web::hash_password(&password) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let starting_cash = config.get_double("ledger", "starting_cash", 10_000.0);
    match ledger.create_user(username, &hash, starting_cash) {
        Ok(id) => {
            eprintln!("Created user {username} (id {id}) with {starting_cash:.2} starting cash");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_quote(config_path: &PathBuf, symbol: &str) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let quotes = match HttpQuoteAdapter::from_config(&config) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbol = match crate::domain::engine::validate_symbol(symbol) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let result = tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(quotes.lookup(&symbol));

    match result {
        Ok(quote) => {
            println!("{} ({}): {:.2}", quote.name, quote.symbol, quote.price);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_hash_password() -> ExitCode {
    use std::io::{self, BufRead};

    eprintln!("Enter password to hash:");
    let stdin = io::stdin();
    let password = stdin
        .lock()
        .lines()
        .next()
        .unwrap_or(Ok(String::new()))
        .unwrap_or_default();

    match crate::adapters::web::hash_password(&password) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

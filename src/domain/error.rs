//! Domain error types.

/// Top-level error type for papertrade.
///
/// Trade rejections (`Validation`, `InvalidSymbol`, `InsufficientFunds`,
/// `InsufficientShares`, `NoSuchHolding`) are recoverable: the operation that
/// produced them has made no state change.
#[derive(Debug, thiserror::Error)]
pub enum PapertradeError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid stock symbol: {symbol}")]
    InvalidSymbol { symbol: String },

    #[error("quote provider error: {reason}")]
    QuoteProvider { reason: String },

    #[error("not enough cash: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("cannot sell {requested} shares of {symbol}: only {held} held")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error("no holding of {symbol}")]
    NoSuchHolding { symbol: String },

    #[error("username already taken: {username}")]
    DuplicateUsername { username: String },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password hashing failed: {reason}")]
    PasswordHash { reason: String },

    #[error("invalid username and/or password")]
    Authentication,

    #[error("no such user: {user_id}")]
    UnknownUser { user_id: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertradeError {
    /// Whether this error is a rejection of a single request, as opposed to
    /// a storage, configuration, or provider-infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PapertradeError::Validation { .. }
                | PapertradeError::InvalidSymbol { .. }
                | PapertradeError::InsufficientFunds { .. }
                | PapertradeError::InsufficientShares { .. }
                | PapertradeError::NoSuchHolding { .. }
                | PapertradeError::DuplicateUsername { .. }
                | PapertradeError::PasswordMismatch
                | PapertradeError::Authentication
        )
    }
}

impl From<&PapertradeError> for std::process::ExitCode {
    fn from(err: &PapertradeError) -> Self {
        let code: u8 = match err {
            PapertradeError::Io(_) => 1,
            PapertradeError::ConfigParse { .. }
            | PapertradeError::ConfigMissing { .. }
            | PapertradeError::ConfigInvalid { .. } => 2,
            PapertradeError::Database { .. } | PapertradeError::DatabaseQuery { .. } => 3,
            PapertradeError::Validation { .. } | PapertradeError::PasswordMismatch => 4,
            PapertradeError::InvalidSymbol { .. }
            | PapertradeError::QuoteProvider { .. }
            | PapertradeError::InsufficientFunds { .. }
            | PapertradeError::InsufficientShares { .. }
            | PapertradeError::NoSuchHolding { .. } => 5,
            PapertradeError::DuplicateUsername { .. }
            | PapertradeError::PasswordHash { .. }
            | PapertradeError::Authentication
            | PapertradeError::UnknownUser { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

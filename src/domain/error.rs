//! Domain error types.

/// Top-level error type for marketscan.
#[derive(Debug, thiserror::Error)]
pub enum MarketScanError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("storage query error: {reason}")]
    StorageQuery { reason: String },

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

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("parse error in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MarketScanError {
    /// True for failures that only concern one symbol's data.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            MarketScanError::NoData { .. } | MarketScanError::InsufficientData { .. }
        )
    }
}

impl From<&MarketScanError> for std::process::ExitCode {
    fn from(err: &MarketScanError) -> Self {
        let code: u8 = match err {
            MarketScanError::Io(_) => 1,
            MarketScanError::ConfigParse { .. }
            | MarketScanError::ConfigMissing { .. }
            | MarketScanError::ConfigInvalid { .. } => 2,
            MarketScanError::Storage { .. } | MarketScanError::StorageQuery { .. } => 3,
            MarketScanError::NoData { .. }
            | MarketScanError::InsufficientData { .. }
            | MarketScanError::Parse { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Rejections from ledger mutations. The ledger is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds: order costs {cost:.2}, balance is {balance:.2}")]
    InsufficientFunds { cost: f64, balance: f64 },

    #[error("no open position in {symbol}")]
    NotHeld { symbol: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(_: &LedgerError) -> Self {
        std::process::ExitCode::from(1)
    }
}

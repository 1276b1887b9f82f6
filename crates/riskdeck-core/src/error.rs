use thiserror::Error;

/// Validation errors for domain types built from configuration or upstream payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("series dates must be strictly increasing (at index {index})")]
    SeriesNotIncreasing { index: usize },
    #[error("series close at index {index} must be finite")]
    NonFiniteClose { index: usize },
}

/// The requested series or ratio could not be produced.
///
/// Every failure below the dashboard collapses into this type. It is always recoverable: the
/// caller shows an unavailable state for that one panel and moves on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataUnavailable {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("failed to parse upstream response: {0}")]
    Parse(String),
    #[error("series has {got} points, at least {need} are required")]
    InsufficientHistory { got: usize, need: usize },
    #[error("indicator is undefined: {0}")]
    UndefinedIndicator(&'static str),
    #[error("previous close is zero; percent change is undefined")]
    ZeroPreviousClose,
    #[error("no report found within {attempts} days")]
    HorizonExhausted { attempts: u32 },
}

impl DataUnavailable {
    /// Stable machine-readable code, used in snapshots.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "data.transport",
            Self::Status(_) => "data.status",
            Self::Parse(_) => "data.parse",
            Self::InsufficientHistory { .. } => "data.insufficient_history",
            Self::UndefinedIndicator(_) => "data.undefined_indicator",
            Self::ZeroPreviousClose => "data.zero_previous_close",
            Self::HorizonExhausted { .. } => "data.horizon_exhausted",
        }
    }
}

impl From<ValidationError> for DataUnavailable {
    fn from(value: ValidationError) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Startup configuration errors. The only errors allowed to stop the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidEnv {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_fold_into_parse_failures() {
        let err: DataUnavailable = ValidationError::SeriesNotIncreasing { index: 3 }.into();
        assert_eq!(err.code(), "data.parse");
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn horizon_message_names_attempt_count() {
        let err = DataUnavailable::HorizonExhausted { attempts: 7 };
        assert_eq!(err.to_string(), "no report found within 7 days");
    }
}

use thiserror::Error;

/// Service-level errors mapped to exit codes.
///
/// Only startup can fail; once the refresh loop runs, every cycle failure is logged and the
/// loop continues.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] riskdeck_core::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
        }
    }
}

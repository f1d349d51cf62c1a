use thiserror::Error;

/// Result type local to evmatch-engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant here is fatal: the run aborts, finalized segments stay
/// valid on disk. Lookup misses are not errors and never reach this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] evmatch_core::error::Error),

    #[error(transparent)]
    Mem(#[from] evmatch_mem::error::Error),

    #[error(transparent)]
    Io(#[from] evmatch_io::error::Error),

    #[error("summary serialization: {0}")]
    Summary(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Summary(e.to_string())
    }
}

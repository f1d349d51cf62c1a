use thiserror::Error;

/// Result type local to evmatch-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("bad container '{path}': {reason}")]
    BadContainer { path: String, reason: String },

    #[error("checksum mismatch in '{0}'")]
    ChecksumMismatch(String),

    #[error("field '{field}' missing from chunk '{path}'")]
    MissingField { path: String, field: String },

    #[error("empty file list '{0}'")]
    EmptyFileList(String),

    #[error("cursor has no loaded chunk")]
    NoChunkLoaded,

    #[error("record ordinal {ordinal} out of range (total {total})")]
    OrdinalOutOfRange { ordinal: u64, total: u64 },

    #[error("chunk data error: {0}")]
    ChunkData(String),

    #[error(transparent)]
    Mem(#[from] evmatch_mem::error::Error),

    #[error(transparent)]
    Core(#[from] evmatch_core::error::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ChunkData(e.to_string())
    }
}

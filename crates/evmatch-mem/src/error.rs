use thiserror::Error;

/// Result type local to evmatch-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("field '{0}' already registered")]
    DuplicateField(String),

    #[error("no buffer registered for field '{0}'")]
    UnknownField(String),

    #[error("array field '{field}' references unregistered counter '{counter}'")]
    UnknownCounter { field: String, counter: String },

    #[error("buffer for '{field}' holds {actual} storage, expected {expected}")]
    StorageMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("read of {count} elements at {offset} past buffer length {len}")]
    OutOfBounds {
        offset: usize,
        count: usize,
        len: usize,
    },

    #[error("counter '{0}' does not hold an integer value")]
    BadCounterValue(String),
}

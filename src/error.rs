use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BloomError>;

#[derive(Error, Debug)]
pub enum BloomError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index out of bounds: {index} >= {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error("Bit array size mismatch: expected {expected} bits, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Backing store unavailable: {0}")]
    BackingStoreUnavailable(#[from] std::io::Error),

    #[error("Backing file {0:?} is already owned by another bit array")]
    BackingStoreLocked(PathBuf),

    #[error("Operation `{operation}` is not supported by the {backend} bit array")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    #[error("Bit array has been closed")]
    Closed,

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Failed to parse environment variable {var_name}: value '{value}' - {error}")]
    EnvParseError {
        var_name: String,
        value: String,
        error: String,
    },
}

impl BloomError {
    /// True for failures of the disk-backed storage itself.
    pub fn is_io(&self) -> bool {
        matches!(self, BloomError::BackingStoreUnavailable(_))
    }
}

pub mod history;
pub mod kv;
pub mod run_record;

use thiserror::Error;

/// Errors from the history persistence boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value under '{key}' is not valid history: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("history could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

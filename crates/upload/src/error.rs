//! Upload error types.

use filedock_transfer::TransferError;

/// Errors produced while uploading a file. Every variant is scoped to one
/// file; a batch keeps going when one of its files fails.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("planning error: {0}")]
    Planning(String),

    #[error("read error: {0}")]
    Hash(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{operation} rejected by server (code {code}): {message}")]
    Protocol {
        operation: &'static str,
        code: i32,
        message: String,
    },

    #[error("chunk upload stopped with {uploaded} of {total} chunks accepted")]
    Incomplete { uploaded: u64, total: u64 },

    #[error("invalid job state: {0}")]
    InvalidState(String),

    #[error("no target directory for {0}")]
    Resolution(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("a file named {0} already exists in the target directory")]
    NameTaken(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Planning(msg) => UploadError::Planning(msg),
            TransferError::Hash(e) => UploadError::Hash(e),
        }
    }
}

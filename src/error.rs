//! Error types for the bucketlib library.

use thiserror::Error;

/// Main error type for bucketlib operations.
#[derive(Error, Debug)]
pub enum S3Error {
    /// HTTP request failed with status code.
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Network request error.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Signature computation failed (bad credentials or clock).
    #[error("Signing error: {0}")]
    Signing(String),

    /// A folder operation was invoked with a file path.
    #[error("Not a folder path: {0}")]
    NotAFolder(String),

    /// A file operation was invoked with a folder path.
    #[error("Not a file path: {0}")]
    NotAFile(String),

    /// Listing request failed or its response could not be parsed.
    #[error("Listing error: {0}")]
    Listing(String),

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Bulk delete succeeded for some keys and failed for others.
    ///
    /// Succeeded deletions are not rolled back; `failed` names every key the
    /// provider reported an error for, with the provider's error message.
    #[error("Partial delete: {} key(s) failed", .failed.len())]
    PartialDelete { failed: Vec<FailedKey> },

    /// Upload failed. The session may remain resumable.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// A resumed upload no longer matches the local source.
    #[error("Resume mismatch: {0}")]
    ResumeMismatch(String),

    /// JSON serialization error (policy documents, persisted sessions).
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

/// A single key the provider failed to delete during a bulk delete.
#[derive(Debug, Clone)]
pub struct FailedKey {
    /// Object key that was not deleted.
    pub key: String,
    /// Provider-reported error code or message.
    pub message: String,
}

/// Upload failure classification.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Transport-level failure; the upload id is retained for resume.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The transfer was canceled by the caller.
    #[error("canceled by caller")]
    Aborted,

    /// The provider rejected the upload (bad policy, missing part, etc.).
    #[error("rejected by provider: {0}")]
    Rejected(String),
}

/// Result type alias for bucketlib operations.
pub type Result<T> = std::result::Result<T, S3Error>;

impl S3Error {
    /// Whether this error left behind a session that can be resumed.
    pub fn is_resumable(&self) -> bool {
        matches!(self, S3Error::Upload(UploadError::Transient(_)))
    }
}

//! Progress reporting for file transfers.

use serde::Serialize;

/// Progress information for an upload.
#[derive(Debug, Clone, Serialize)]
pub struct TransferProgress {
    /// Bytes transferred so far
    pub done: u64,
    /// Total bytes to transfer
    pub total: u64,
    /// Name of the file being transferred
    pub filename: String,
}

impl TransferProgress {
    /// Create a new progress report.
    pub fn new(done: u64, total: u64, filename: impl Into<String>) -> Self {
        Self {
            done,
            total,
            filename: filename.into(),
        }
    }

    /// Get progress as a percentage (0.0 to 100.0).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.done as f64 / self.total as f64) * 100.0
    }

    /// Check if transfer is complete.
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

/// Type alias for progress callback function.
///
/// The callback receives progress information and can return `false` to
/// cancel the transfer.
pub type ProgressCallback = Box<dyn FnMut(&TransferProgress) -> bool + Send>;

/// Lifecycle events emitted by the upload engine.
///
/// For each file the ordering contract is `Progress* →
/// Completed|Failed|Canceled`, with `RefreshRequested` following a
/// completion, and one `QueueDrained` after the last queued file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    /// A chunk finished transferring.
    Progress {
        /// File name being transferred.
        filename: String,
        /// Completed fraction, 0.0 to 100.0.
        percent: f64,
        /// Bytes transferred so far.
        bytes_loaded: u64,
    },
    /// A file finished uploading.
    Completed { filename: String },
    /// A file failed; the message is caller-displayable.
    Failed { filename: String, message: String },
    /// A transfer was canceled by the caller.
    Canceled { filename: String },
    /// Folder contents changed; the caller should re-list.
    RefreshRequested,
    /// Every queued file has been processed.
    QueueDrained,
}

/// Type alias for the transfer event callback.
pub type EventCallback = Box<dyn FnMut(&TransferEvent) + Send>;

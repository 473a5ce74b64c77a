//! Upload session state.

use crate::path::RemotePath;

/// Default part size for multipart transfers (10 MiB).
pub const DEFAULT_PART_SIZE: u64 = 10 * 1024 * 1024;

/// Lifecycle phase of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Accepted into the queue, not yet started.
    Queued,
    /// Querying the provider for an id or an in-flight upload.
    AwaitingUploadId,
    /// Verifying already-acknowledged parts of a found upload.
    Resuming,
    /// Transferring parts.
    Uploading,
    /// Finalized; the object is live.
    Completed,
    /// Aborted by the caller; provider-side parts released.
    Canceled,
    /// Transport failure; the upload id is retained for a later resume.
    Failed,
}

/// One acknowledged part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Part number, 1-based.
    pub part_number: u32,
    /// Entity tag the provider acknowledged the part with.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
}

/// Mutable state of one file transfer.
///
/// Created when a file is accepted into the queue, mutated in place as parts
/// complete, and discarded once the phase reaches `Completed` or `Canceled`.
/// A `Failed` session keeps its upload id so the transfer can be resumed.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Destination path of the object.
    pub dest: RemotePath,
    /// Source file name.
    pub filename: String,
    /// Provider-assigned multipart upload id, once known.
    pub upload_id: Option<String>,
    /// Acknowledged parts, ascending by part number.
    pub parts: Vec<PartRecord>,
    /// Total bytes to transfer.
    pub total_bytes: u64,
    /// Bytes acknowledged so far.
    pub uploaded_bytes: u64,
    /// Current lifecycle phase.
    pub phase: UploadPhase,
}

impl UploadSession {
    /// Create a fresh session for a file entering the queue.
    pub fn new(dest: RemotePath, filename: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            dest,
            filename: filename.into(),
            upload_id: None,
            parts: Vec::new(),
            total_bytes,
            uploaded_bytes: 0,
            phase: UploadPhase::Queued,
        }
    }

    /// Record an acknowledged part, keeping the list ordered.
    pub fn record_part(&mut self, part: PartRecord) {
        self.uploaded_bytes += part.size;
        let insert_at = self
            .parts
            .partition_point(|p| p.part_number < part.part_number);
        self.parts.insert(insert_at, part);
    }

    /// Whether the session can be handed back to the engine for resume.
    pub fn is_resumable(&self) -> bool {
        self.phase == UploadPhase::Failed && self.upload_id.is_some()
    }
}

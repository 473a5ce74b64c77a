//! Transport seam between the upload engine and the storage protocol.
//!
//! The engine drives transfers through this trait rather than calling the
//! REST client directly, so the strategy is chosen explicitly at
//! construction time and tests can substitute an in-memory implementation.

use async_trait::async_trait;

use crate::api::xml::PartSummary;
use crate::error::Result;
use crate::path::RemotePath;
use crate::upload::state::PartRecord;

/// Provider operations the upload engine needs.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Upload a whole object in one shot.
    ///
    /// Used for files at or below one part size, which bypass the multipart
    /// protocol entirely.
    async fn put_object(&self, dest: &RemotePath, data: Vec<u8>) -> Result<()>;

    /// Find an in-flight multipart upload for the destination key.
    ///
    /// Returns the provider upload id when one exists.
    async fn find_upload(&self, dest: &RemotePath) -> Result<Option<String>>;

    /// Start a new multipart upload and return its id.
    async fn initiate_upload(&self, dest: &RemotePath) -> Result<String>;

    /// List the parts the provider has already acknowledged.
    async fn list_parts(&self, dest: &RemotePath, upload_id: &str) -> Result<Vec<PartSummary>>;

    /// Transfer one part and return the entity tag the provider recorded.
    async fn upload_part(
        &self,
        dest: &RemotePath,
        upload_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<String>;

    /// Finalize the upload from its ordered part records.
    ///
    /// The provider rejects finalization when any part is missing.
    async fn complete_upload(
        &self,
        dest: &RemotePath,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<()>;

    /// Abort the upload, releasing provider-side storage for its parts.
    async fn abort_upload(&self, dest: &RemotePath, upload_id: &str) -> Result<()>;
}

//! # bucketlib
//!
//! Rust client library for S3-compatible object storage, presenting a flat
//! key namespace as a navigable virtual filesystem. Designed for clients
//! that talk to the storage service directly, with no backend proxy:
//! request signatures and upload policies are computed locally from
//! already-resolved credentials.
//!
//! ## Features
//!
//! - **Virtual folders**: folder/file emulation over flat keys using the
//!   trailing-separator convention ([`RemotePath`]).
//! - **Local signing**: query-string request signatures, presigned download
//!   links, and browser-POST policy documents, all computed client-side.
//! - **Listings**: current-state and version-history folder listings with
//!   exhaustive pagination, plus reconciliation of the two into live and
//!   soft-deleted entries ([`reconcile`](reconcile::reconcile)).
//! - **Resumable uploads**: chunked multipart transfers that survive
//!   interruption; already-acknowledged parts are verified by content hash
//!   and only unconfirmed or corrupted parts are re-sent.
//! - **Progress tracking**: per-chunk progress callbacks with cancellation,
//!   and a lifecycle event stream for UI layers.
//!
//! ## Example
//!
//! ```no_run
//! use bucketlib::{Backend, Credentials, RemotePath, S3Config};
//!
//! # async fn example() -> bucketlib::Result<()> {
//! let config = S3Config::new("my-bucket", Credentials::new("AKIA...", "secret"));
//! let backend = Backend::new(config);
//!
//! // Navigate: list a folder's current contents.
//! let folder = RemotePath::parse("photos/2024/");
//! let contents = backend.list_folder(&folder).await?;
//! for entry in &contents.folders {
//!     println!("{}/", entry.name());
//! }
//!
//! // Detect soft-deleted entries on a versioned bucket.
//! let history = backend.list_folder_versions(&folder).await?;
//! let reconciled = bucketlib::reconcile::reconcile(&contents, &history);
//! println!("{} deleted folder(s)", reconciled.deleted_folders.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: resumable upload
//!
//! ```no_run
//! use bucketlib::{Backend, Credentials, RemotePath, S3Config};
//! use bucketlib::upload::{FileSource, UploadEngine};
//!
//! # async fn example() -> bucketlib::Result<()> {
//! let backend = Backend::new(S3Config::new("my-bucket", Credentials::new("AKIA...", "secret")));
//! let mut engine = UploadEngine::new(backend);
//! engine.set_progress_callback(Box::new(|progress| {
//!     println!("{}: {:.1}%", progress.filename, progress.percent());
//!     true // keep going
//! }));
//!
//! // Interrupted transfers resume from the last verified part when the
//! // same file is submitted to the same destination again.
//! let mut source = FileSource::open("backup.tar").await?;
//! let dest = RemotePath::parse("backups/backup.tar");
//! engine.upload(&mut source, &dest).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod backend;
pub mod entry;
pub mod error;
pub mod http;
pub mod path;
pub mod progress;
pub mod reconcile;
pub mod sign;
pub mod upload;

// Re-export commonly used types
pub use api::{Credentials, S3Config};
pub use backend::{Backend, ConfirmCallback, DeleteOutcome};
pub use entry::{
    Bucket, BucketEntry, FileEntry, FileVersion, FolderContents, FolderEntry, UploadConfig,
};
pub use error::{FailedKey, Result, S3Error, UploadError};
pub use path::RemotePath;
pub use progress::{EventCallback, ProgressCallback, TransferEvent, TransferProgress};
pub use reconcile::{reconcile, ReconciledContents};
pub use upload::{
    BytesSource, DataSource, FileSource, PartRecord, UploadEngine, UploadPhase, UploadSession,
    UploadTransport,
};

//! Resumable multipart uploads.

pub mod engine;
pub mod source;
pub mod state;
pub mod transport;

pub use engine::UploadEngine;
pub use source::{BytesSource, DataSource, FileSource};
pub use state::{PartRecord, UploadPhase, UploadSession, DEFAULT_PART_SIZE};
pub use transport::UploadTransport;

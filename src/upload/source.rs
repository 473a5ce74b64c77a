//! Data sources for uploads.
//!
//! The engine reads one part's byte range at a time, so a source only ever
//! backs a single chunk buffer in memory. Hashing for resume verification
//! reads the range in smaller slices and feeds an incremental digest for the
//! same reason.

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::error::{Result, S3Error};

/// Slice size for incremental range hashing.
const HASH_READ_SIZE: u64 = 1024 * 1024;

/// A readable, sized source of upload bytes.
#[async_trait]
pub trait DataSource: Send {
    /// Total size in bytes.
    fn len(&self) -> u64;

    /// Whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File name used for the destination key and progress reporting.
    fn name(&self) -> &str;

    /// Read exactly `length` bytes starting at `offset`.
    async fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>>;
}

/// An in-memory source, for small files or browser-style blobs.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    data: Vec<u8>,
}

impl BytesSource {
    /// Wrap a byte buffer as an upload source.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[async_trait]
impl DataSource for BytesSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                S3Error::Custom(format!(
                    "range {}..{} out of bounds for {} byte source",
                    offset,
                    offset + length,
                    self.data.len()
                ))
            })?;
        Ok(self.data[start..end].to_vec())
    }
}

/// A local file source backed by an async file handle.
pub struct FileSource {
    name: String,
    file: tokio::fs::File,
    len: u64,
}

impl FileSource {
    /// Open a local file as an upload source.
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| S3Error::Custom(format!("invalid file path: {}", path.display())))?;

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| S3Error::Custom(format!("failed to open file: {}", e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| S3Error::Custom(format!("failed to stat file: {}", e)))?
            .len();

        Ok(Self { name, file, len })
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        self.file
            .seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| S3Error::Custom(format!("failed to seek: {}", e)))?;

        let mut buffer = vec![0u8; length as usize];
        self.file
            .read_exact(&mut buffer)
            .await
            .map_err(|e| S3Error::Custom(format!("read error: {}", e)))?;
        Ok(buffer)
    }
}

/// Hex-encoded MD5 of a byte slice.
///
/// Single-part object and part entity tags are MD5 digests, which is what
/// resume verification compares against.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex-encoded MD5 of a source byte range, hashed incrementally.
pub async fn md5_of_range(
    source: &mut dyn DataSource,
    offset: u64,
    length: u64,
) -> Result<String> {
    let mut hasher = Md5::new();
    let mut remaining = length;
    let mut position = offset;

    while remaining > 0 {
        let step = remaining.min(HASH_READ_SIZE);
        let slice = source.read_range(position, step).await?;
        hasher.update(&slice);
        position += step;
        remaining -= step;
    }

    Ok(hex::encode(hasher.finalize()))
}

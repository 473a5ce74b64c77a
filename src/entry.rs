//! Bucket entry types for the virtual filesystem view.
//!
//! Entries are created fresh from each listing response and are immutable
//! afterwards; navigation always re-fetches rather than patching a cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, S3Error};
use crate::path::RemotePath;

/// A bucket and its versioning state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Whether object versioning is enabled.
    pub versioning_enabled: bool,
}

/// A folder entry derived from a listing's common prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    path: RemotePath,
}

impl FolderEntry {
    /// Create a folder entry.
    ///
    /// Fails fast when given a file path; this is a programmer error, not a
    /// retryable condition.
    pub fn new(path: RemotePath) -> Result<Self> {
        if !path.is_folder() {
            return Err(S3Error::NotAFolder(path.to_string()));
        }
        Ok(Self { path })
    }

    /// Get the absolute path.
    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    /// Get the folder name.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Get the parent folder.
    pub fn parent(&self) -> FolderEntry {
        let mut parent = self.path.clone();
        parent.pop();
        FolderEntry { path: parent }
    }
}

/// A file entry derived from a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    path: RemotePath,
    /// Presigned download link, when one was requested.
    pub download_link: Option<String>,
    /// Whether the file's latest version is a delete marker.
    pub deleted: bool,
    /// Version history, ascending by modification time. Empty for entries
    /// from a current-state listing.
    pub versions: Vec<FileVersion>,
}

impl FileEntry {
    /// Create a file entry.
    ///
    /// Fails fast when given a folder path.
    pub fn new(path: RemotePath) -> Result<Self> {
        if path.is_folder() {
            return Err(S3Error::NotAFile(path.to_string()));
        }
        Ok(Self {
            path,
            download_link: None,
            deleted: false,
            versions: Vec::new(),
        })
    }

    /// Get the absolute path.
    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    /// Get the file name.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The latest version by modification time, if history was fetched.
    pub fn latest_version(&self) -> Option<&FileVersion> {
        self.versions.last()
    }
}

/// A specific version of a file from a version-history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    /// Unique version identifier.
    pub version_id: String,
    /// Last modified timestamp.
    pub last_modified: DateTime<Utc>,
    /// Whether this version is currently the latest available one.
    pub latest: bool,
    /// Whether this version is a deletion marker.
    pub delete_marker: bool,
    /// Link to download this specific version. Not applicable for delete
    /// markers.
    pub download_link: Option<String>,
}

/// An entry in a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BucketEntry {
    /// A sub-folder.
    Folder(FolderEntry),
    /// A file.
    File(FileEntry),
}

impl BucketEntry {
    /// Get the entry's absolute path.
    pub fn path(&self) -> &RemotePath {
        match self {
            BucketEntry::Folder(folder) => folder.path(),
            BucketEntry::File(file) => file.path(),
        }
    }
}

/// The contents of a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderContents {
    /// Sub-folders.
    pub folders: Vec<FolderEntry>,
    /// Files.
    pub files: Vec<FileEntry>,
}

impl FolderContents {
    /// All entries as one sequence, folders first.
    pub fn entries(&self) -> Vec<BucketEntry> {
        self.folders
            .iter()
            .cloned()
            .map(BucketEntry::Folder)
            .chain(self.files.iter().cloned().map(BucketEntry::File))
            .collect()
    }
}

/// Settings for uploading a file with a browser-style POST request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload URL to send the POST request to.
    pub url: String,
    /// Fields to include in the POST request for it to succeed.
    pub fields: Vec<(String, String)>,
}

//! Folder listing operations.

use std::collections::BTreeMap;

use reqwest::Method;
use tracing::debug;

use crate::api::xml;
use crate::entry::{FileEntry, FileVersion, FolderContents, FolderEntry};
use crate::error::{Result, S3Error};
use crate::path::RemotePath;

use super::Backend;

impl Backend {
    /// List the current contents of a folder.
    ///
    /// Pagination is exhausted before returning. Provider common prefixes
    /// become folder entries; the key equal to the folder's own marker
    /// object is excluded from the files, it represents the folder
    /// placeholder rather than a file.
    pub async fn list_folder(&self, folder: &RemotePath) -> Result<FolderContents> {
        if !folder.is_folder() {
            return Err(S3Error::NotAFolder(folder.to_string()));
        }

        let prefix = folder.to_string();
        let mut contents = FolderContents::default();
        let mut continuation: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("delimiter".to_string(), "/".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query.push(("prefix".to_string(), prefix.clone()));
            }
            if let Some(token) = &continuation {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let body = self
                .client()
                .request_text(Method::GET, &RemotePath::root(), &query, &[], None)
                .await
                .map_err(|e| S3Error::Listing(e.to_string()))?;
            let page = xml::parse_list_page(&body).map_err(|e| S3Error::Listing(e.to_string()))?;

            for common_prefix in &page.common_prefixes {
                contents
                    .folders
                    .push(FolderEntry::new(RemotePath::parse(common_prefix))?);
            }
            for object in &page.objects {
                if object.key == prefix || object.key.ends_with('/') {
                    continue;
                }
                contents
                    .files
                    .push(FileEntry::new(RemotePath::parse(&object.key))?);
            }

            match page.next_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(
            folder = %folder,
            folders = contents.folders.len(),
            files = contents.files.len(),
            "listed folder"
        );
        Ok(contents)
    }

    /// List a folder's contents from the version-history endpoint.
    ///
    /// Each file carries its version records, ascending by modification
    /// time, and is flagged deleted when its latest record is a delete
    /// marker. Live versions get presigned download links. Common prefixes
    /// here may include folders the current listing omits, which is what
    /// soft-folder-deletion detection relies on.
    pub async fn list_folder_versions(&self, folder: &RemotePath) -> Result<FolderContents> {
        if !folder.is_folder() {
            return Err(S3Error::NotAFolder(folder.to_string()));
        }

        let prefix = folder.to_string();
        let mut folders: Vec<FolderEntry> = Vec::new();
        let mut versions_by_key: BTreeMap<String, Vec<FileVersion>> = BTreeMap::new();
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("versions".to_string(), String::new()),
                ("delimiter".to_string(), "/".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query.push(("prefix".to_string(), prefix.clone()));
            }
            if let Some(marker) = &key_marker {
                query.push(("key-marker".to_string(), marker.clone()));
            }
            if let Some(marker) = &version_id_marker {
                query.push(("version-id-marker".to_string(), marker.clone()));
            }

            let body = self
                .client()
                .request_text(Method::GET, &RemotePath::root(), &query, &[], None)
                .await
                .map_err(|e| S3Error::Listing(e.to_string()))?;
            let page =
                xml::parse_version_page(&body).map_err(|e| S3Error::Listing(e.to_string()))?;

            for common_prefix in &page.common_prefixes {
                let entry = FolderEntry::new(RemotePath::parse(common_prefix))?;
                if !folders.iter().any(|f| f.path() == entry.path()) {
                    folders.push(entry);
                }
            }

            for record in &page.records {
                if record.key == prefix || record.key.ends_with('/') {
                    continue;
                }
                let path = RemotePath::parse(&record.key);
                let download_link = if record.delete_marker {
                    None
                } else {
                    Some(
                        self.client()
                            .presigned_download_url(&path, Some(&record.version_id))?,
                    )
                };
                versions_by_key
                    .entry(record.key.clone())
                    .or_default()
                    .push(FileVersion {
                        version_id: record.version_id.clone(),
                        last_modified: record.last_modified.unwrap_or_default(),
                        latest: record.is_latest,
                        delete_marker: record.delete_marker,
                        download_link,
                    });
            }

            if page.next_key_marker.is_none() && page.next_version_id_marker.is_none() {
                break;
            }
            key_marker = page.next_key_marker;
            version_id_marker = page.next_version_id_marker;
        }

        let mut files = Vec::with_capacity(versions_by_key.len());
        for (key, mut versions) in versions_by_key {
            versions.sort_by_key(|v| v.last_modified);

            let mut file = FileEntry::new(RemotePath::parse(&key))?;
            file.deleted = versions.last().is_some_and(|v| v.delete_marker);
            if !file.deleted {
                file.download_link =
                    Some(self.client().presigned_download_url(file.path(), None)?);
            }
            file.versions = versions;
            files.push(file);
        }

        Ok(FolderContents { folders, files })
    }
}

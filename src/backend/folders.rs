//! Folder mutation operations.

use base64::{engine::general_purpose, Engine};
use md5::{Digest, Md5};
use reqwest::Method;
use tracing::{debug, warn};

use crate::api::xml;
use crate::error::{FailedKey, Result, S3Error};
use crate::path::RemotePath;

use super::{Backend, DeleteOutcome};

/// Maximum keys per bulk-delete request.
const BULK_DELETE_BATCH: usize = 1000;

impl Backend {
    /// Create a folder by writing its zero-length marker object.
    pub async fn create_folder(&self, folder: &RemotePath) -> Result<()> {
        if !folder.is_folder() {
            return Err(S3Error::NotAFolder(folder.to_string()));
        }

        self.client()
            .request(Method::PUT, folder, &[], &[], Some(Vec::new()))
            .await?;
        debug!(folder = %folder, "created folder marker");
        Ok(())
    }

    /// Delete a folder and everything under it.
    ///
    /// The listing of keys under the prefix is exhausted before any delete
    /// is issued, then keys go out in bulk batches. Per-key failures are
    /// aggregated into [`S3Error::PartialDelete`]; keys that did delete are
    /// not rolled back.
    pub async fn delete_folder(&self, folder: &RemotePath) -> Result<DeleteOutcome> {
        if !folder.is_folder() {
            return Err(S3Error::NotAFolder(folder.to_string()));
        }
        if !self.confirmed(folder) {
            return Ok(DeleteOutcome::Declined);
        }

        let keys = self.collect_keys_under(folder).await?;
        debug!(folder = %folder, keys = keys.len(), "deleting folder contents");

        let mut failed: Vec<FailedKey> = Vec::new();
        for batch in keys.chunks(BULK_DELETE_BATCH) {
            failed.extend(self.bulk_delete(batch).await?);
        }

        if !failed.is_empty() {
            warn!(folder = %folder, failed = failed.len(), "partial folder delete");
            return Err(S3Error::PartialDelete { failed });
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// Every key under the folder's prefix, pagination exhausted.
    ///
    /// No delimiter: nested keys are included, so deleting a folder removes
    /// its whole subtree along with the marker objects.
    async fn collect_keys_under(&self, folder: &RemotePath) -> Result<Vec<String>> {
        let prefix = folder.to_string();
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
                ("prefix".to_string(), prefix.clone()),
            ];
            if let Some(token) = &continuation {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let body = self
                .client()
                .request_text(Method::GET, &RemotePath::root(), &query, &[], None)
                .await
                .map_err(|e| S3Error::Listing(e.to_string()))?;
            let page = xml::parse_list_page(&body).map_err(|e| S3Error::Listing(e.to_string()))?;

            keys.extend(page.objects.into_iter().map(|o| o.key));

            match page.next_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }

    /// Issue one bulk-delete call and return the keys that failed.
    async fn bulk_delete(&self, keys: &[String]) -> Result<Vec<FailedKey>> {
        let mut body = String::from("<Delete>");
        for key in keys {
            body.push_str("<Object><Key>");
            body.push_str(&xml::escape(key));
            body.push_str("</Key></Object>");
        }
        body.push_str("</Delete>");
        let body = body.into_bytes();

        // The provider requires an integrity header on bulk deletes.
        let content_md5 = general_purpose::STANDARD.encode(Md5::digest(&body));
        let headers = vec![("Content-MD5".to_string(), content_md5)];

        let response_body = self
            .client()
            .request_text(
                Method::POST,
                &RemotePath::root(),
                &[("delete".to_string(), String::new())],
                &headers,
                Some(body),
            )
            .await?;

        xml::parse_delete_result(&response_body)
    }
}

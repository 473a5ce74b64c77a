//! File operations: delete, download links, browser upload policies.

use chrono::Utc;
use reqwest::Method;
use tracing::debug;

use crate::entry::UploadConfig;
use crate::error::{Result, S3Error};
use crate::path::RemotePath;
use crate::sign;

use super::{Backend, DeleteOutcome};

impl Backend {
    /// Delete a single file.
    pub async fn delete_file(&self, file: &RemotePath) -> Result<DeleteOutcome> {
        if file.is_folder() {
            return Err(S3Error::NotAFile(file.to_string()));
        }
        if !self.confirmed(file) {
            return Ok(DeleteOutcome::Declined);
        }

        self.client()
            .request(Method::DELETE, file, &[], &[], None)
            .await?;
        debug!(file = %file, "deleted file");
        Ok(DeleteOutcome::Deleted)
    }

    /// Build a presigned download link for a file.
    ///
    /// # Arguments
    /// * `file` - File path
    /// * `version_id` - Specific version to link, or the latest when `None`
    pub fn download_link(&self, file: &RemotePath, version_id: Option<&str>) -> Result<String> {
        if file.is_folder() {
            return Err(S3Error::NotAFile(file.to_string()));
        }
        self.client().presigned_download_url(file, version_id)
    }

    /// Build the URL and form fields for a browser-style POST upload into a
    /// folder.
    ///
    /// The returned fields carry a signed policy document instead of the
    /// secret key; the `key` field is a template the form fills with the
    /// chosen file name.
    pub fn upload_config(&self, folder: &RemotePath) -> Result<UploadConfig> {
        if !folder.is_folder() {
            return Err(S3Error::NotAFolder(folder.to_string()));
        }

        let credentials = self.client().credentials();
        let prefix = folder.to_string();
        let policy = sign::sign_upload_policy(
            &credentials.secret_access_key,
            self.client().bucket(),
            &prefix,
            Utc::now(),
        )?;

        let mut fields = vec![
            ("key".to_string(), format!("{}{}", prefix, "${filename}")),
            ("acl".to_string(), "private".to_string()),
            (
                "AWSAccessKeyId".to_string(),
                credentials.access_key_id.clone(),
            ),
            ("policy".to_string(), policy.document),
            ("signature".to_string(), policy.signature),
        ];
        if let Some(token) = &credentials.session_token {
            fields.push(("x-amz-security-token".to_string(), token.clone()));
        }

        Ok(UploadConfig {
            url: self.client().url_for(""),
            fields,
        })
    }

    /// Upload a file with a browser-style form POST.
    ///
    /// The policy-signed form variant of uploading: the request carries the
    /// signed policy document and never the secret key itself. Suited to
    /// small files; large transfers go through the multipart engine.
    pub async fn upload_via_form(
        &self,
        folder: &RemotePath,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        let config = self.upload_config(folder)?;

        let fields = config
            .fields
            .into_iter()
            .map(|(name, value)| {
                if name == "key" {
                    (name, value.replace("${filename}", filename))
                } else {
                    (name, value)
                }
            })
            .collect();

        let response = self
            .client()
            .http()
            .post_form(&config.url, fields, filename, data)
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(S3Error::HttpError(status.as_u16()));
        }
        debug!(folder = %folder, filename, "form upload complete");
        Ok(())
    }
}

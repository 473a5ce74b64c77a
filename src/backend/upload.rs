//! Multipart upload transport over the REST protocol.

use async_trait::async_trait;
use reqwest::Method;

use crate::api::xml::{self, PartSummary};
use crate::error::{Result, S3Error};
use crate::path::RemotePath;
use crate::upload::state::PartRecord;
use crate::upload::transport::UploadTransport;

use super::Backend;

#[async_trait]
impl UploadTransport for Backend {
    async fn put_object(&self, dest: &RemotePath, data: Vec<u8>) -> Result<()> {
        self.client()
            .request(Method::PUT, dest, &[], &[], Some(data))
            .await?;
        Ok(())
    }

    async fn find_upload(&self, dest: &RemotePath) -> Result<Option<String>> {
        let key = dest.to_string();
        let query = vec![
            ("uploads".to_string(), String::new()),
            ("prefix".to_string(), key.clone()),
        ];
        let body = self
            .client()
            .request_text(Method::GET, &RemotePath::root(), &query, &[], None)
            .await?;

        let uploads = xml::parse_list_uploads(&body)?;
        Ok(uploads
            .into_iter()
            .find(|upload| upload.key == key)
            .map(|upload| upload.upload_id))
    }

    async fn initiate_upload(&self, dest: &RemotePath) -> Result<String> {
        let body = self
            .client()
            .request_text(
                Method::POST,
                dest,
                &[("uploads".to_string(), String::new())],
                &[],
                None,
            )
            .await?;
        xml::parse_initiate_upload(&body)
    }

    async fn list_parts(&self, dest: &RemotePath, upload_id: &str) -> Result<Vec<PartSummary>> {
        let body = self
            .client()
            .request_text(
                Method::GET,
                dest,
                &[("uploadId".to_string(), upload_id.to_string())],
                &[],
                None,
            )
            .await?;
        xml::parse_list_parts(&body)
    }

    async fn upload_part(
        &self,
        dest: &RemotePath,
        upload_id: &str,
        part_number: u32,
        data: Vec<u8>,
    ) -> Result<String> {
        let query = vec![
            ("partNumber".to_string(), part_number.to_string()),
            ("uploadId".to_string(), upload_id.to_string()),
        ];
        let response = self
            .client()
            .request(Method::PUT, dest, &query, &[], Some(data))
            .await?;

        response
            .headers()
            .get("etag")
            .and_then(|value| value.to_str().ok())
            .map(|etag| etag.trim_matches('"').to_string())
            .ok_or_else(|| S3Error::Parse("part response missing ETag header".to_string()))
    }

    async fn complete_upload(
        &self,
        dest: &RemotePath,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<()> {
        let mut body = String::from("<CompleteMultipartUpload>");
        for part in parts {
            body.push_str(&format!(
                "<Part><PartNumber>{}</PartNumber><ETag>\"{}\"</ETag></Part>",
                part.part_number,
                xml::escape(&part.etag)
            ));
        }
        body.push_str("</CompleteMultipartUpload>");

        self.client()
            .request(
                Method::POST,
                dest,
                &[("uploadId".to_string(), upload_id.to_string())],
                &[],
                Some(body.into_bytes()),
            )
            .await?;
        Ok(())
    }

    async fn abort_upload(&self, dest: &RemotePath, upload_id: &str) -> Result<()> {
        self.client()
            .request(
                Method::DELETE,
                dest,
                &[("uploadId".to_string(), upload_id.to_string())],
                &[],
                None,
            )
            .await?;
        Ok(())
    }
}

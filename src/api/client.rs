//! Signed REST client for the storage service.
//!
//! Every request is authenticated with query-string parameters computed
//! locally: `AWSAccessKeyId`, `Expires` and `Signature`. An expired
//! signature surfaces as a 403 from the provider; the client re-signs and
//! retries exactly once, never silently more.

use chrono::{Duration, Utc};
use reqwest::{Method, Response};
use tracing::{debug, warn};

use crate::error::{Result, S3Error};
use crate::http::HttpClient;
use crate::path::RemotePath;
use crate::sign::{self, DOWNLOAD_LINK_EXPIRY_SECS};

/// Credentials for signing requests.
///
/// `session_token` is set when the credentials come from a temporary
/// security session rather than a long-lived key pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access key identifier, sent with every request.
    pub access_key_id: String,
    /// Secret access key, never transmitted.
    pub secret_access_key: String,
    /// Temporary session token, if any.
    pub session_token: Option<String>,
}

impl Credentials {
    /// Create long-lived credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Create temporary session credentials.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: Some(session_token.into()),
        }
    }
}

/// Connection settings for one bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Service endpoint host, without scheme.
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Signing credentials.
    pub credentials: Credentials,
}

impl S3Config {
    /// Create a config against the default public endpoint.
    pub fn new(bucket: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: "s3.amazonaws.com".to_string(),
            bucket: bucket.into(),
            credentials,
        }
    }
}

/// REST client bound to one bucket.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: HttpClient,
    config: S3Config,
}

impl RestClient {
    /// Create a client for the given bucket configuration.
    pub fn new(config: S3Config) -> Self {
        Self {
            http: HttpClient::new(),
            config,
        }
    }

    /// The bucket this client is bound to.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// The signing credentials.
    pub(crate) fn credentials(&self) -> &Credentials {
        &self.config.credentials
    }

    /// The underlying HTTP client.
    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Build the request URL for a key.
    ///
    /// Virtual-hosted addressing by default. Buckets with a literal `.` in
    /// the name break TLS hostname matching under virtual-hosted addressing,
    /// so those switch to path-style.
    pub fn url_for(&self, encoded_key: &str) -> String {
        if self.config.bucket.contains('.') {
            format!(
                "https://{}/{}/{}",
                self.config.endpoint, self.config.bucket, encoded_key
            )
        } else {
            format!(
                "https://{}.{}/{}",
                self.config.bucket, self.config.endpoint, encoded_key
            )
        }
    }

    /// The canonical resource a signature is computed over.
    ///
    /// Always path-style, regardless of the addressing mode on the wire.
    fn canonical_resource(&self, encoded_key: &str) -> String {
        format!("/{}/{}", self.config.bucket, encoded_key)
    }

    /// Send a signed request, enforcing a success status.
    ///
    /// A 403 is treated as an expired signature: the request is re-signed
    /// and retried once. Any remaining failure maps to
    /// [`S3Error::HttpError`].
    pub async fn request(
        &self,
        method: Method,
        path: &RemotePath,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let encoded_key = path.uri_encoded();

        for attempt in 0..2 {
            let url = self.signed_url(method.as_str(), &encoded_key, query)?;
            debug!(method = %method, key = %encoded_key, attempt, "storage request");

            let response = self
                .http
                .request(method.clone(), &url, headers, body.clone())
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() == 403 && attempt == 0 {
                warn!(key = %encoded_key, "signature rejected, re-signing once");
                continue;
            }
            return Err(S3Error::HttpError(status.as_u16()));
        }
        unreachable!("request loop returns within two attempts")
    }

    /// Send a signed request and return the response body as text.
    pub async fn request_text(
        &self,
        method: Method,
        path: &RemotePath,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<String> {
        let response = self.request(method, path, query, headers, body).await?;
        response.text().await.map_err(S3Error::RequestError)
    }

    /// Build a fully-signed URL for a request.
    fn signed_url(
        &self,
        method: &str,
        encoded_key: &str,
        query: &[(String, String)],
    ) -> Result<String> {
        let mut signed_query = query.to_vec();
        if let Some(token) = &self.config.credentials.session_token {
            signed_query.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let signed = sign::sign_request(
            &self.config.credentials.secret_access_key,
            method,
            &self.canonical_resource(encoded_key),
            &signed_query,
            Utc::now(),
        )?;

        Ok(self.assemble_url(encoded_key, &signed_query, &signed))
    }

    /// Build a presigned GET link with the short download expiry.
    ///
    /// # Arguments
    /// * `path` - File path to link to
    /// * `version_id` - Specific version, or the latest when `None`
    pub fn presigned_download_url(
        &self,
        path: &RemotePath,
        version_id: Option<&str>,
    ) -> Result<String> {
        let encoded_key = path.uri_encoded();

        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(version) = version_id {
            query.push(("versionId".to_string(), version.to_string()));
        }
        if let Some(token) = &self.config.credentials.session_token {
            query.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let signed = sign::sign_request_expiring_in(
            &self.config.credentials.secret_access_key,
            "GET",
            &self.canonical_resource(&encoded_key),
            &query,
            Utc::now(),
            Duration::seconds(DOWNLOAD_LINK_EXPIRY_SECS),
        )?;

        Ok(self.assemble_url(&encoded_key, &query, &signed))
    }

    fn assemble_url(
        &self,
        encoded_key: &str,
        query: &[(String, String)],
        signed: &sign::SignedRequest,
    ) -> String {
        let mut pairs: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        pairs.push(format!(
            "AWSAccessKeyId={}",
            urlencoding::encode(&self.config.credentials.access_key_id)
        ));
        pairs.push(format!("Expires={}", signed.expires));
        pairs.push(format!(
            "Signature={}",
            urlencoding::encode(&signed.signature)
        ));

        format!("{}?{}", self.url_for(encoded_key), pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(bucket: &str) -> RestClient {
        RestClient::new(S3Config::new(
            bucket,
            Credentials::new("AKIAEXAMPLE", "secret"),
        ))
    }

    #[test]
    fn test_virtual_hosted_url() {
        let client = client_for("demo");
        assert_eq!(
            client.url_for("docs/a.txt"),
            "https://demo.s3.amazonaws.com/docs/a.txt"
        );
    }

    #[test]
    fn test_dotted_bucket_uses_path_style() {
        let client = client_for("demo.example.com");
        assert_eq!(
            client.url_for("docs/a.txt"),
            "https://s3.amazonaws.com/demo.example.com/docs/a.txt"
        );
    }

    #[test]
    fn test_canonical_resource_is_always_path_style() {
        let client = client_for("demo");
        assert_eq!(client.canonical_resource("docs/a.txt"), "/demo/docs/a.txt");

        let dotted = client_for("demo.example.com");
        assert_eq!(
            dotted.canonical_resource("docs/a.txt"),
            "/demo.example.com/docs/a.txt"
        );
    }

    #[test]
    fn test_presigned_url_carries_auth_params() {
        let client = client_for("demo");
        let url = client
            .presigned_download_url(&RemotePath::parse("docs/a.txt"), Some("v7"))
            .unwrap();
        assert!(url.starts_with("https://demo.s3.amazonaws.com/docs/a.txt?"));
        assert!(url.contains("versionId=v7"));
        assert!(url.contains("AWSAccessKeyId=AKIAEXAMPLE"));
        assert!(url.contains("Expires="));
        assert!(url.contains("Signature="));
    }
}

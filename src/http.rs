//! HTTP client wrapper for storage service requests.

use reqwest::{Client, Method, Response};

use crate::error::{Result, S3Error};

/// HTTP client for talking to the storage service.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Send a request and return the raw response.
    ///
    /// # Arguments
    /// * `method` - HTTP verb
    /// * `url` - Fully-built URL including query string
    /// * `headers` - Extra headers as name/value pairs
    /// * `body` - Optional request body
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(data) = body {
            request = request.body(data);
        }
        request.send().await.map_err(S3Error::RequestError)
    }

    /// Send a multipart form POST (browser-style policy upload).
    pub async fn post_form(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> Result<Response> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        form = form.part(
            "file",
            reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string()),
        );

        self.client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(S3Error::RequestError)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let _client = HttpClient::new();
        let _default = HttpClient::default();
    }
}

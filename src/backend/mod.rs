//! Bucket backend: the virtual-filesystem operations over the REST client.
//!
//! The backend holds no navigation state. Every operation takes the folder
//! or file path explicitly and re-fetches; there is no shared mutable
//! listing cache to go stale.

mod files;
mod folders;
mod list;
mod upload;

use reqwest::Method;

use crate::api::{xml, RestClient, S3Config};
use crate::entry::Bucket;
use crate::error::Result;
use crate::path::RemotePath;

/// Callback consulted before a destructive operation proceeds.
///
/// Returning `false` aborts the operation before any request is sent.
pub type ConfirmCallback = Box<dyn Fn(&RemotePath) -> bool + Send + Sync>;

/// Outcome of a destructive operation guarded by confirmation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The deletion was carried out.
    Deleted,
    /// The confirmation callback declined; nothing was sent.
    Declined,
}

/// Client-side backend for one bucket.
pub struct Backend {
    client: RestClient,
    confirm: Option<ConfirmCallback>,
}

impl Backend {
    /// Create a backend for the given bucket configuration.
    pub fn new(config: S3Config) -> Self {
        Self {
            client: RestClient::new(config),
            confirm: None,
        }
    }

    /// Enable confirmation mode for destructive operations.
    ///
    /// With a callback installed, `delete_file` and `delete_folder` consult
    /// it first and abort with [`DeleteOutcome::Declined`] when it returns
    /// `false`, without any backend call being made.
    pub fn set_confirmation(&mut self, callback: ConfirmCallback) {
        self.confirm = Some(callback);
    }

    /// Disable confirmation mode.
    pub fn clear_confirmation(&mut self) {
        self.confirm = None;
    }

    /// The underlying REST client.
    pub(crate) fn client(&self) -> &RestClient {
        &self.client
    }

    /// Whether a destructive operation on `path` may proceed.
    pub(crate) fn confirmed(&self, path: &RemotePath) -> bool {
        match &self.confirm {
            Some(callback) => callback(path),
            None => true,
        }
    }

    /// Fetch the bucket and its versioning state.
    pub async fn get_bucket(&self) -> Result<Bucket> {
        let body = self
            .client
            .request_text(
                Method::GET,
                &RemotePath::root(),
                &[("versioning".to_string(), String::new())],
                &[],
                None,
            )
            .await?;

        Ok(Bucket {
            name: self.client.bucket().to_string(),
            versioning_enabled: xml::parse_versioning_status(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Credentials;
    use crate::error::S3Error;

    fn test_backend() -> Backend {
        Backend::new(S3Config::new("demo", Credentials::new("key", "secret")))
    }

    #[tokio::test]
    async fn test_decline_aborts_before_any_request() {
        let mut backend = test_backend();
        backend.set_confirmation(Box::new(|_| false));

        // Declined deletions return before a request goes out, so no live
        // endpoint is needed here.
        let file = RemotePath::parse("docs/a.txt");
        assert_eq!(
            backend.delete_file(&file).await.unwrap(),
            DeleteOutcome::Declined
        );

        let folder = RemotePath::parse("docs/");
        assert_eq!(
            backend.delete_folder(&folder).await.unwrap(),
            DeleteOutcome::Declined
        );
    }

    #[tokio::test]
    async fn test_confirmation_sees_the_target_path() {
        let mut backend = test_backend();
        backend.set_confirmation(Box::new(|path| path.name() != "protected.txt"));

        let outcome = backend
            .delete_file(&RemotePath::parse("docs/protected.txt"))
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
    }

    #[tokio::test]
    async fn test_kind_violations_fail_fast() {
        let backend = test_backend();

        let err = backend
            .delete_file(&RemotePath::parse("docs/"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::NotAFile(_)));

        let err = backend
            .delete_folder(&RemotePath::parse("docs/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::NotAFolder(_)));

        let err = backend
            .create_folder(&RemotePath::parse("docs/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::NotAFolder(_)));

        let err = backend
            .list_folder(&RemotePath::parse("docs/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::NotAFolder(_)));
    }
}

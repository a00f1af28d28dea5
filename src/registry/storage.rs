//! Content storage for compressed packages

use tracing::info;
use url::Url;

use crate::credentials::{CredentialError, CredentialResolver};
use crate::transport::{HttpRequest, Method, Transport};

use super::{unexpected, Auth, Endpoint, RegistryError, SigningKeys};

/// Uploads package blobs under the storage base URL
pub struct StorageClient<'a> {
    endpoint: Endpoint<'a>,
}

impl<'a> StorageClient<'a> {
    /// Build a client for `base`.
    ///
    /// Credentials embedded in the URL win, then the configured access key
    /// pair (requests are signed), then the netrc entry for the host.
    pub fn connect(
        transport: &'a dyn Transport,
        base: &Url,
        keys: Option<SigningKeys>,
        resolver: &CredentialResolver,
    ) -> Result<Self, CredentialError> {
        let (base, auth) = match keys {
            Some(keys) if base.username().is_empty() => (base.clone(), Auth::Signed(keys)),
            _ => {
                let (base, credentials) = resolver.resolve(base)?;
                (base, Auth::Basic(credentials))
            }
        };
        Ok(Self {
            endpoint: Endpoint::new(transport, base, auth),
        })
    }

    /// URL a key is stored at
    pub fn url(&self, key: &str) -> Url {
        self.endpoint.url(key)
    }

    /// PUT `bytes` at `key`; any 2xx counts as stored.
    pub fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), RegistryError> {
        let url = self.url(key);
        info!(url = %url, bytes = bytes.len(), "uploading package");
        let response = self.endpoint.send(HttpRequest::put(
            url.clone(),
            "application/octet-stream",
            bytes.to_vec(),
        ))?;
        if !response.is_success() {
            return Err(unexpected(Method::Put, &url, &response, "2xx"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::mock::{FailureConfig, MockOp, MockServer};

    fn keys() -> SigningKeys {
        SigningKeys::new("AKIA", "s3cr3t", "us-east-1")
    }

    #[test]
    fn test_upload_signed_with_access_keys() {
        let server = MockServer::new();
        let base = Url::parse("https://store.test/packages").unwrap();

        let storage =
            StorageClient::connect(&server, &base, Some(keys()), &CredentialResolver::new(None))
                .unwrap();
        storage.upload("widget-1.2.3-linux-amd64.gz", b"\x1f\x8b").unwrap();

        assert_eq!(server.object("widget-1.2.3-linux-amd64.gz").unwrap(), b"\x1f\x8b");
        let req = &server.requests()[0];
        assert_eq!(req.url.as_str(), "https://store.test/packages/widget-1.2.3-linux-amd64.gz");
        assert_eq!(req.header_value("Content-Type"), Some("application/octet-stream"));
        let auth = req.header_value("Authorization").unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIA/"));
        assert!(auth.contains("/us-east-1/s3/aws4_request"));
        assert!(!auth.starts_with("Basic"));
        assert!(req.headers.iter().all(|(_, v)| !v.contains("s3cr3t")));
        assert!(req.header_value("x-amz-content-sha256").is_some());
        assert!(req.header_value("Date").is_some());
    }

    #[test]
    fn test_url_credentials_beat_access_keys() {
        let server = MockServer::new();
        let base = Url::parse("https://u:p@store.test/").unwrap();

        let storage =
            StorageClient::connect(&server, &base, Some(keys()), &CredentialResolver::new(None))
                .unwrap();
        storage.upload("k.gz", b"x").unwrap();

        let req = &server.requests()[0];
        assert_eq!(req.url.as_str(), "https://store.test/k.gz");
        assert_eq!(
            req.header_value("Authorization"),
            Some(Credentials::new("u", "p").basic_auth().as_str())
        );
    }

    #[test]
    fn test_no_credentials() {
        let server = MockServer::new();
        let base = Url::parse("https://store.test/").unwrap();
        let result = StorageClient::connect(&server, &base, None, &CredentialResolver::new(None));
        assert!(matches!(result, Err(CredentialError::NoCredentials { .. })));
    }

    #[test]
    fn test_upload_failure() {
        let server = MockServer::new();
        server.inject(MockOp::Upload, FailureConfig::status(403));
        let base = Url::parse("https://u:p@store.test/").unwrap();
        let storage =
            StorageClient::connect(&server, &base, None, &CredentialResolver::new(None)).unwrap();

        let err = storage.upload("k.gz", b"x").unwrap_err();
        assert!(matches!(err, RegistryError::UnexpectedStatus { status: 403, .. }));
    }
}

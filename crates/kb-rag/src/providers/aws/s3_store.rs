//! S3 object download
//!
//! Only `GetObject` is needed: the PDF check reads a document straight from
//! the bucket a knowledge base ingests from.

use reqwest::Method;
use std::sync::Arc;

use super::auth::AwsAuth;
use super::client::{encode_key_path, AwsServiceClient};
use super::signer::SigningOptions;
use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Read-only S3 object store
pub struct S3ObjectStore {
    auth: Arc<AwsAuth>,
    http: HttpConfig,
    endpoint: Option<String>,
}

impl S3ObjectStore {
    pub fn new(auth: Arc<AwsAuth>, http: &HttpConfig) -> Self {
        Self {
            auth,
            http: http.clone(),
            endpoint: None,
        }
    }

    /// Send every request to a fixed path-style endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Endpoint and request path for an object
    ///
    /// Bucket names containing '.' break the wildcard certificate of
    /// virtual-hosted URLs, so those use path-style addressing.
    fn locate(&self, bucket: &str, key: &str) -> (String, String) {
        let key = encode_key_path(key.trim_start_matches('/'));
        match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), format!("/{}/{}", bucket, key)),
            None if bucket.contains('.') => (
                format!("https://s3.{}.amazonaws.com", self.auth.region()),
                format!("/{}/{}", bucket, key),
            ),
            None => (
                format!("https://{}.s3.{}.amazonaws.com", bucket, self.auth.region()),
                format!("/{}", key),
            ),
        }
    }

    /// Download an object's bytes
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        if bucket.is_empty() || key.is_empty() {
            return Err(Error::config("S3 bucket and key must both be set"));
        }

        let (endpoint, path) = self.locate(bucket, key);
        let client = AwsServiceClient::new(self.auth.clone(), "s3", "s3", &self.http)?
            .with_endpoint(endpoint)
            .with_signing_options(SigningOptions::S3);

        tracing::info!("Downloading s3://{}/{}", bucket, key);
        let bytes = client.send(Method::GET, &path, &[], Vec::new()).await?;
        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Split `s3://bucket/key` into its parts
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

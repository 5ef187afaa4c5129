use crate::domain::model::ObjectMeta;
use crate::domain::ports::ObjectBackend;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use url::Url;

pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

const ACL_HEADER: &str = "x-goog-acl";
const STORED_LENGTH_HEADER: &str = "x-goog-stored-content-length";

/// Bucket objects over the storage service's HTTP API.
#[derive(Debug, Clone)]
pub struct GcsObjectBackend {
    client: Client,
    endpoint: Url,
    bucket: String,
    access_token: Option<String>,
}

impl GcsObjectBackend {
    pub fn new(endpoint: &str, bucket: impl Into<String>) -> Result<Self> {
        Self::with_client(Client::new(), endpoint, bucket)
    }

    pub fn with_timeout(
        endpoint: &str,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, endpoint, bucket)
    }

    pub fn with_client(client: Client, endpoint: &str, bucket: impl Into<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| ShimError::InvalidConfigValueError {
            field: "storage.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        Ok(Self {
            client,
            endpoint,
            bucket: bucket.into(),
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `{endpoint}/{bucket}/{name}`, each path segment percent-encoded.
    pub fn object_url(&self, name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ShimError::ConfigError {
                message: format!("storage endpoint {} cannot be a base URL", self.endpoint),
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(name.trim_start_matches('/').split('/'));
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(name: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ShimError::not_found(name));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShimError::BackendError {
                message: format!("{} returned {}: {}", name, status, body.trim()),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectBackend for GcsObjectBackend {
    async fn put(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
        acl: Option<&str>,
    ) -> Result<()> {
        let url = self.object_url(name)?;
        tracing::debug!("PUT {} ({} bytes, {})", url, data.len(), content_type);

        let mut request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(data.to_vec());
        if let Some(acl) = acl {
            request = request.header(ACL_HEADER, acl);
        }

        let response = self.authorize(request).send().await?;
        Self::check(name, response).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.object_url(name)?;
        tracing::debug!("GET {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;
        let response = Self::check(name, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let url = self.object_url(name)?;
        tracing::debug!("DELETE {}", url);

        let response = self.authorize(self.client.delete(url)).send().await?;
        Self::check(name, response).await?;
        Ok(())
    }

    async fn head(&self, name: &str) -> Result<Option<ObjectMeta>> {
        let url = self.object_url(name)?;
        tracing::debug!("HEAD {}", url);

        let response = self.authorize(self.client.head(url)).send().await?;
        let response = match Self::check(name, response).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let headers = response.headers();
        let size = headers
            .get(STORED_LENGTH_HEADER)
            .or_else(|| headers.get(CONTENT_LENGTH))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ShimError::BackendError {
                message: format!("HEAD {} returned no object length", name),
            })?;
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Some(ObjectMeta { size, content_type }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_nests_bucket_and_name_segments() {
        let backend = GcsObjectBackend::new(DEFAULT_GCS_ENDPOINT, "geocam").unwrap();
        assert_eq!(
            backend.object_url("tracks/a b.kml").unwrap().as_str(),
            "https://storage.googleapis.com/geocam/tracks/a%20b.kml"
        );
    }

    #[test]
    fn object_url_keeps_endpoint_prefix() {
        let backend = GcsObjectBackend::new("http://localhost:4443/storage/", "b1").unwrap();
        assert_eq!(
            backend.object_url("/x.png").unwrap().as_str(),
            "http://localhost:4443/storage/b1/x.png"
        );
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(matches!(
            GcsObjectBackend::new("not a url", "b1"),
            Err(ShimError::InvalidConfigValueError { .. })
        ));
    }
}

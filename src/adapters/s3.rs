use crate::domain::model::ObjectMeta;
use crate::domain::ports::ObjectBackend;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3ObjectBackend {
    client: S3Client,
    bucket: String,
}

impl S3ObjectBackend {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// 從預設憑證鏈建立 client
    pub async fn from_env(bucket: String, region: Option<String>) -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(region) = region {
            builder = builder.region(aws_sdk_s3::config::Region::new(region));
        }
        Self::new(S3Client::from_conf(builder.build()), bucket)
    }
}

fn backend_error(action: &str, name: &str, err: impl std::fmt::Display) -> ShimError {
    ShimError::BackendError {
        message: format!("Failed to {} {} in S3: {}", action, name, err),
    }
}

#[async_trait]
impl ObjectBackend for S3ObjectBackend {
    async fn put(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
        acl: Option<&str>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(data.to_vec().into());
        if let Some(acl) = acl {
            request = request.acl(ObjectCannedAcl::from(acl));
        }

        request
            .send()
            .await
            .map_err(|e| backend_error("write", name, e.into_service_error()))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                return Err(match err.into_service_error() {
                    GetObjectError::NoSuchKey(_) => ShimError::not_found(name),
                    other => backend_error("read", name, other),
                })
            }
        };

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| backend_error("collect", name, e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| backend_error("delete", name, e.into_service_error()))?;
        Ok(())
    }

    async fn head(&self, name: &str) -> Result<Option<ObjectMeta>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(out) => Ok(Some(ObjectMeta {
                size: out.content_length().unwrap_or(0).max(0) as u64,
                content_type: out.content_type().map(str::to_string),
            })),
            Err(err) => match err.into_service_error() {
                HeadObjectError::NotFound(_) => Ok(None),
                other if other.code() == Some("NotFound") => Ok(None),
                other => Err(backend_error("stat", name, other)),
            },
        }
    }
}

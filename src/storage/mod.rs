pub mod blob;
pub mod mime;
pub mod object_store;

pub use blob::{BlobStorage, BucketBlobService};
pub use object_store::{gs_key, ObjectStoreStorage};

use crate::adapters::{GcsObjectBackend, LocalObjectBackend, MemoryBlobIndex, MemoryObjectBackend};
use crate::config::{StorageBackendKind, StorageConfig};
use crate::domain::ports::{ObjectBackend, Storage};
use crate::utils::error::Result;
use std::time::Duration;

/// Builds the storage adapter selected by `config.backend`.
pub async fn build_storage(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    tracing::debug!("building {:?} storage", config.backend);

    let storage: Box<dyn Storage> = match config.backend {
        StorageBackendKind::Gcs => {
            let backend = gcs_backend(config)?;
            let bucket = backend.bucket().to_string();
            Box::new(object_storage(config, backend, bucket))
        }
        StorageBackendKind::Blob => {
            let backend = gcs_backend(config)?;
            Box::new(BlobStorage::new(BucketBlobService::new(
                backend,
                MemoryBlobIndex::new(),
                config.blob_prefix.clone(),
            )))
        }
        StorageBackendKind::Local => Box::new(object_storage(
            config,
            LocalObjectBackend::new(&config.local_root),
            config.bucket.clone().unwrap_or_else(|| "local".to_string()),
        )),
        StorageBackendKind::Memory => Box::new(object_storage(
            config,
            MemoryObjectBackend::new(),
            config.bucket.clone().unwrap_or_else(|| "memory".to_string()),
        )),
        StorageBackendKind::S3 => s3_storage(config).await?,
    };

    Ok(storage)
}

fn object_storage<B: ObjectBackend + 'static>(
    config: &StorageConfig,
    backend: B,
    bucket: String,
) -> ObjectStoreStorage<B, MemoryBlobIndex> {
    ObjectStoreStorage::new(backend, MemoryBlobIndex::new(), bucket)
        .with_acl(config.acl.clone())
        .with_public_base_url(config.public_base_url.clone())
        .with_read_through(config.index_read_through)
}

fn gcs_backend(config: &StorageConfig) -> Result<GcsObjectBackend> {
    let backend = GcsObjectBackend::with_timeout(
        &config.endpoint,
        config.require_bucket()?,
        Duration::from_secs(config.timeout_seconds),
    )?;
    Ok(match &config.access_token {
        Some(token) => backend.with_access_token(token.clone()),
        None => backend,
    })
}

#[cfg(feature = "s3")]
async fn s3_storage(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    let bucket = config.require_bucket()?.to_string();
    let backend =
        crate::adapters::S3ObjectBackend::from_env(bucket.clone(), config.region.clone()).await;
    Ok(Box::new(object_storage(config, backend, bucket)))
}

#[cfg(not(feature = "s3"))]
async fn s3_storage(_config: &StorageConfig) -> Result<Box<dyn Storage>> {
    Err(crate::utils::error::ShimError::ConfigError {
        message: "the s3 backend requires building with the `s3` feature".to_string(),
    })
}

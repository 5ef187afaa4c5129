use crate::domain::model::{BlobInfo, BlobKey, OpenMode, StoredFile};
use crate::domain::ports::{BlobIndex, BlobService, ObjectBackend, Storage};
use crate::storage::mime::guess_mime_type;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// Storage over a managed blob service. Names handed back by `save` are
/// opaque blob keys, not the name passed in.
pub struct BlobStorage<S: BlobService> {
    service: S,
}

impl<S: BlobService> BlobStorage<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    async fn get_blob(&self, name: &str) -> Result<Option<BlobInfo>> {
        self.service.info(&BlobKey::from(name)).await
    }
}

#[async_trait]
impl<S: BlobService> Storage for BlobStorage<S> {
    async fn open(&self, name: &str, mode: &str) -> Result<StoredFile> {
        let mode = OpenMode::parse(mode)?;
        if !mode.is_read() {
            return Err(ShimError::not_implemented(&format!("open({})", mode.as_str())));
        }

        let info = self
            .get_blob(name)
            .await?
            .ok_or_else(|| ShimError::not_found(name))?;
        let data = self.service.read(&info.key).await?;
        Ok(StoredFile::new(name, mode, Some(info.content_type), data))
    }

    async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let mime_type = guess_mime_type(name);
        let blob_key = self.service.create(mime_type, Some(name), content).await?;

        tracing::info!("save wrote {} with content type {}", blob_key, mime_type);
        Ok(blob_key.to_string())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let info = self
            .get_blob(name)
            .await?
            .ok_or_else(|| ShimError::not_found(name))?;
        self.service.delete(&info.key).await
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        tracing::debug!("BlobStorage::exists() was called.");
        let result = self.get_blob(name).await?.is_some();
        tracing::info!("blob key {} exists = {}", name, result);
        Ok(result)
    }

    async fn size(&self, name: &str) -> Result<u64> {
        match self.get_blob(name).await? {
            Some(info) => Ok(info.size),
            None => Err(ShimError::not_found(name)),
        }
    }

    async fn url(&self, _name: &str) -> Result<String> {
        Err(ShimError::not_implemented("url"))
    }

    async fn listdir(&self, _dirname: &str) -> Result<(Vec<String>, Vec<String>)> {
        Err(ShimError::not_implemented("listdir"))
    }
}

/// Blob service on top of a bucket: content under `{prefix}/{key}`, info
/// records in the index. An index miss falls back to a HEAD on the object.
pub struct BucketBlobService<B: ObjectBackend, I: BlobIndex> {
    backend: B,
    index: I,
    prefix: String,
}

impl<B: ObjectBackend, I: BlobIndex> BucketBlobService<B, I> {
    pub fn new(backend: B, index: I, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            index,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    fn object_name(&self, key: &BlobKey) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl<B: ObjectBackend, I: BlobIndex> BlobService for BucketBlobService<B, I> {
    async fn create(
        &self,
        content_type: &str,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<BlobKey> {
        let key = BlobKey(Uuid::new_v4().simple().to_string());
        self.backend
            .put(&self.object_name(&key), data, content_type, None)
            .await?;
        self.index.put(BlobInfo {
            key: key.clone(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            filename: filename.map(str::to_string),
            created_at: Utc::now(),
        })?;
        Ok(key)
    }

    async fn info(&self, key: &BlobKey) -> Result<Option<BlobInfo>> {
        if let Some(info) = self.index.get(key)? {
            return Ok(Some(info));
        }

        let Some(meta) = self.backend.head(&self.object_name(key)).await? else {
            return Ok(None);
        };
        let info = BlobInfo {
            key: key.clone(),
            content_type: meta
                .content_type
                .unwrap_or_else(|| crate::storage::mime::DEFAULT_MIME_TYPE.to_string()),
            size: meta.size,
            filename: None,
            created_at: Utc::now(),
        };
        self.index.put(info.clone())?;
        Ok(Some(info))
    }

    async fn read(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.backend.get(&self.object_name(key)).await
    }

    async fn delete(&self, key: &BlobKey) -> Result<()> {
        self.index.remove(key)?;
        self.backend.delete(&self.object_name(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryBlobIndex, MemoryBlobService, MemoryObjectBackend};

    #[tokio::test]
    async fn save_returns_opaque_key_with_inferred_type() {
        let storage = BlobStorage::new(MemoryBlobService::new());
        let key = storage.save("foo.jpg", b"content").await.unwrap();
        assert_ne!(key, "foo.jpg");

        let file = storage.open(&key, "rb").await.unwrap();
        assert_eq!(file.contents(), b"content");
        assert_eq!(file.content_type(), Some("image/jpeg"));

        let other = storage.save("data.bin", b"x").await.unwrap();
        let info = storage
            .service()
            .info(&BlobKey(other))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn save_exists_delete_cycle() {
        let storage = BlobStorage::new(MemoryBlobService::new());
        let key = storage.save("foo.jpg", b"content").await.unwrap();
        assert!(storage.exists(&key).await.unwrap());
        assert_eq!(storage.size(&key).await.unwrap(), 7);

        storage.delete(&key).await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
        assert!(storage.size(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn write_modes_and_url_are_not_implemented() {
        let storage = BlobStorage::new(MemoryBlobService::new());
        let key = storage.save("foo.jpg", b"content").await.unwrap();
        assert!(matches!(
            storage.open(&key, "a").await,
            Err(ShimError::NotImplemented { .. })
        ));
        assert!(matches!(
            storage.open(&key, "w+").await,
            Err(ShimError::UnsupportedMode { .. })
        ));
        assert!(matches!(
            storage.url(&key).await,
            Err(ShimError::NotImplemented { .. })
        ));
    }

    #[tokio::test]
    async fn bucket_service_recovers_info_from_backend() {
        let service =
            BucketBlobService::new(MemoryObjectBackend::new(), MemoryBlobIndex::new(), "blobs/");
        let key = service.create("image/png", Some("a.png"), b"1234").await.unwrap();
        assert_eq!(service.object_name(&key), format!("blobs/{}", key));

        service.index.remove(&key).unwrap();
        let info = service.info(&key).await.unwrap().unwrap();
        assert_eq!(info.size, 4);
        assert_eq!(info.content_type, "image/png");

        service.delete(&key).await.unwrap();
        assert!(service.info(&key).await.unwrap().is_none());
    }
}

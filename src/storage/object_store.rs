use crate::domain::model::{BlobInfo, BlobKey, OpenMode, StoredFile};
use crate::domain::ports::{BlobIndex, ObjectBackend, Storage};
use crate::storage::mime::guess_mime_type;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;

pub const DEFAULT_ACL: &str = "public-read";

const GS_KEY_PREFIX: &str = "encoded_gs_file:";

/// Index key for an object path such as `/gs/bucket/name`.
pub fn gs_key(gcs_path: &str) -> BlobKey {
    BlobKey(format!("{}{}", GS_KEY_PREFIX, URL_SAFE_NO_PAD.encode(gcs_path)))
}

/// Bucket-backed storage.
///
/// Content lives in the object backend; `exists` and `size` are answered by
/// the blob index. `save` populates the index and `delete` invalidates it
/// once the backend confirms the object is gone, so the two only diverge
/// when something else writes to the bucket.
/// `refresh` repairs a single entry from the backend.
pub struct ObjectStoreStorage<B: ObjectBackend, I: BlobIndex> {
    backend: B,
    index: I,
    bucket: String,
    acl: Option<String>,
    public_base_url: Option<String>,
    read_through: bool,
}

impl<B: ObjectBackend, I: BlobIndex> ObjectStoreStorage<B, I> {
    pub fn new(backend: B, index: I, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            index,
            bucket: bucket.into(),
            acl: Some(DEFAULT_ACL.to_string()),
            public_base_url: None,
            read_through: false,
        }
    }

    pub fn with_acl(mut self, acl: Option<String>) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.map(|b| b.trim_end_matches('/').to_string());
        self
    }

    /// On an index miss, consult the backend and populate the index.
    pub fn with_read_through(mut self, enabled: bool) -> Self {
        self.read_through = enabled;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn gcs_path(&self, name: &str) -> String {
        format!("/gs/{}/{}", self.bucket, name)
    }

    pub fn gcs_url(&self, name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, name),
            None => format!("http://{}.commondatastorage.googleapis.com/{}", self.bucket, name),
        }
    }

    fn blob_key(&self, name: &str) -> BlobKey {
        gs_key(&self.gcs_path(name))
    }

    fn indexed_content_type(&self, name: &str) -> Result<Option<String>> {
        Ok(self.index.get(&self.blob_key(name))?.map(|i| i.content_type))
    }

    async fn lookup(&self, name: &str) -> Result<Option<BlobInfo>> {
        let key = self.blob_key(name);
        if let Some(info) = self.index.get(&key)? {
            return Ok(Some(info));
        }
        if self.read_through {
            tracing::debug!("index miss for {}, reading through", self.gcs_path(name));
            if self.refresh(name).await? {
                return self.index.get(&key);
            }
        }
        Ok(None)
    }

    /// Re-reads one object's metadata from the backend into the index.
    /// Returns whether the object exists.
    pub async fn refresh(&self, name: &str) -> Result<bool> {
        let key = self.blob_key(name);
        match self.backend.head(name).await? {
            Some(meta) => {
                self.index.put(BlobInfo {
                    key,
                    content_type: meta
                        .content_type
                        .unwrap_or_else(|| guess_mime_type(name).to_string()),
                    size: meta.size,
                    filename: Some(name.to_string()),
                    created_at: Utc::now(),
                })?;
                Ok(true)
            }
            None => {
                self.index.remove(&key)?;
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl<B: ObjectBackend, I: BlobIndex> Storage for ObjectStoreStorage<B, I> {
    async fn open(&self, name: &str, mode: &str) -> Result<StoredFile> {
        let mode = OpenMode::parse(mode)?;

        match mode {
            OpenMode::Read => {
                let data = self.backend.get(name).await?;
                Ok(StoredFile::new(name, mode, self.indexed_content_type(name)?, data))
            }
            OpenMode::Append => {
                let data = match self.backend.get(name).await {
                    Ok(data) => data,
                    Err(e) if e.is_not_found() => Vec::new(),
                    Err(e) => return Err(e),
                };
                Ok(StoredFile::new(name, mode, self.indexed_content_type(name)?, data))
            }
            OpenMode::ReadBinary => Err(ShimError::not_implemented("open(rb)")),
        }
    }

    async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let objectname = self.gcs_path(name);
        let content_type = guess_mime_type(name);

        self.backend
            .put(name, content, content_type, self.acl.as_deref())
            .await?;
        self.index.put(BlobInfo {
            key: self.blob_key(name),
            content_type: content_type.to_string(),
            size: content.len() as u64,
            filename: Some(name.to_string()),
            created_at: Utc::now(),
        })?;

        tracing::debug!("save wrote {} ({} bytes)", objectname, content.len());
        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let result = self.backend.delete(name).await;
        // 只有物件確定不存在時才讓索引失效
        match &result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::warn!(
                    "⚠️ delete {} failed, keeping index entry: {}",
                    self.gcs_path(name),
                    e
                );
                return result;
            }
        }
        let removed = self.index.remove(&self.blob_key(name))?;
        tracing::info!(
            "delete {} (index entry removed = {})",
            self.gcs_path(name),
            removed
        );
        result
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        tracing::debug!("ObjectStoreStorage::exists() was called.");
        let key = self.blob_key(name);
        let found = self.lookup(name).await?.is_some();
        if found {
            tracing::info!("blob index key {} exists", key);
        } else {
            tracing::info!("blob index key {} does not exist", key);
        }
        Ok(found)
    }

    async fn size(&self, name: &str) -> Result<u64> {
        match self.lookup(name).await? {
            Some(info) => Ok(info.size),
            None => Err(ShimError::not_found(name)),
        }
    }

    async fn url(&self, name: &str) -> Result<String> {
        Ok(self.gcs_url(name))
    }

    async fn listdir(&self, _dirname: &str) -> Result<(Vec<String>, Vec<String>)> {
        Err(ShimError::not_implemented("listdir"))
    }
}

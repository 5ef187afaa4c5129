//! In-process stores. Used by tests and by the CLI's `memory` backend.

use crate::domain::model::{BlobInfo, BlobKey, ObjectMeta};
use crate::domain::ports::{BlobIndex, BlobService, ObjectBackend};
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

fn poisoned<T>(_: T) -> ShimError {
    ShimError::BackendError {
        message: "in-memory store lock poisoned".to_string(),
    }
}

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryObjectBackend {
    objects: RwLock<HashMap<String, MemoryObject>>,
}

impl MemoryObjectBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectBackend for MemoryObjectBackend {
    async fn put(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
        _acl: Option<&str>,
    ) -> Result<()> {
        self.objects.write().map_err(poisoned)?.insert(
            name.to_string(),
            MemoryObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .map_err(poisoned)?
            .get(name)
            .map(|o| o.data.clone())
            .ok_or_else(|| ShimError::not_found(name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match self.objects.write().map_err(poisoned)?.remove(name) {
            Some(_) => Ok(()),
            None => Err(ShimError::not_found(name)),
        }
    }

    async fn head(&self, name: &str) -> Result<Option<ObjectMeta>> {
        Ok(self
            .objects
            .read()
            .map_err(poisoned)?
            .get(name)
            .map(|o| ObjectMeta {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
            }))
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobIndex {
    entries: RwLock<HashMap<BlobKey, BlobInfo>>,
}

impl MemoryBlobIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobIndex for MemoryBlobIndex {
    fn get(&self, key: &BlobKey) -> Result<Option<BlobInfo>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, info: BlobInfo) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(info.key.clone(), info);
        Ok(())
    }

    fn remove(&self, key: &BlobKey) -> Result<bool> {
        Ok(self.entries.write().map_err(poisoned)?.remove(key).is_some())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobService {
    blobs: RwLock<HashMap<BlobKey, (BlobInfo, Vec<u8>)>>,
}

impl MemoryBlobService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    async fn create(
        &self,
        content_type: &str,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<BlobKey> {
        let key = BlobKey(Uuid::new_v4().simple().to_string());
        let info = BlobInfo {
            key: key.clone(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            filename: filename.map(str::to_string),
            created_at: Utc::now(),
        };
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(key.clone(), (info, data.to_vec()));
        Ok(key)
    }

    async fn info(&self, key: &BlobKey) -> Result<Option<BlobInfo>> {
        Ok(self
            .blobs
            .read()
            .map_err(poisoned)?
            .get(key)
            .map(|(info, _)| info.clone()))
    }

    async fn read(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(key)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ShimError::not_found(key.as_str()))
    }

    async fn delete(&self, key: &BlobKey) -> Result<()> {
        match self.blobs.write().map_err(poisoned)?.remove(key) {
            Some(_) => Ok(()),
            None => Err(ShimError::not_found(key.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_head_reports_size() {
        let backend = MemoryObjectBackend::new();
        backend
            .put("a/b.kml", b"<kml/>", "application/vnd.google-earth.kml+xml", None)
            .await
            .unwrap();

        let meta = backend.head("a/b.kml").await.unwrap().unwrap();
        assert_eq!(meta.size, 6);
        assert!(backend.head("missing").await.unwrap().is_none());
        assert!(backend.get("missing").await.unwrap_err().is_not_found());
    }

    #[test]
    fn memory_index_remove_reports_presence() {
        let index = MemoryBlobIndex::new();
        let key = BlobKey::from("k1");
        index
            .put(BlobInfo {
                key: key.clone(),
                content_type: "image/png".to_string(),
                size: 3,
                filename: None,
                created_at: Utc::now(),
            })
            .unwrap();

        assert!(index.remove(&key).unwrap());
        assert!(!index.remove(&key).unwrap());
    }

    #[test]
    fn memory_blob_service_hands_out_distinct_keys() {
        let service = MemoryBlobService::new();
        let (a, b) = tokio_test::block_on(async {
            let a = service.create("image/png", None, b"1").await.unwrap();
            let b = service.create("image/png", None, b"1").await.unwrap();
            (a, b)
        });
        assert_ne!(a, b);
    }
}

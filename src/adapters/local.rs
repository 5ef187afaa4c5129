use crate::domain::model::ObjectMeta;
use crate::domain::ports::ObjectBackend;
use crate::storage::mime::guess_mime_type;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Objects as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectBackend {
    base_path: PathBuf,
}

impl LocalObjectBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ShimError::InvalidConfigValueError {
                field: "name".to_string(),
                value: name.to_string(),
                reason: "object names must stay inside the storage root".to_string(),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

fn map_io(name: &str, e: std::io::Error) -> ShimError {
    if e.kind() == ErrorKind::NotFound {
        ShimError::not_found(name)
    } else {
        ShimError::IoError(e)
    }
}

#[async_trait]
impl ObjectBackend for LocalObjectBackend {
    async fn put(
        &self,
        name: &str,
        data: &[u8],
        _content_type: &str,
        _acl: Option<&str>,
    ) -> Result<()> {
        let full_path = self.full_path(name)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(full_path, data).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(name)?;
        fs::read(full_path).await.map_err(|e| map_io(name, e))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full_path = self.full_path(name)?;
        fs::remove_file(full_path).await.map_err(|e| map_io(name, e))
    }

    async fn head(&self, name: &str) -> Result<Option<ObjectMeta>> {
        let full_path = self.full_path(name)?;
        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => Ok(Some(ObjectMeta {
                size: meta.len(),
                content_type: Some(guess_mime_type(name).to_string()),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_nested_paths_and_reads_them_back() {
        let dir = TempDir::new().unwrap();
        let backend = LocalObjectBackend::new(dir.path());

        backend
            .put("tracks/2012/a.kml", b"<kml/>", "application/vnd.google-earth.kml+xml", None)
            .await
            .unwrap();

        assert_eq!(backend.get("tracks/2012/a.kml").await.unwrap(), b"<kml/>");
        let meta = backend.head("tracks/2012/a.kml").await.unwrap().unwrap();
        assert_eq!(meta.size, 6);
        assert_eq!(
            meta.content_type.as_deref(),
            Some("application/vnd.google-earth.kml+xml")
        );
    }

    #[tokio::test]
    async fn rejects_names_escaping_the_root() {
        let dir = TempDir::new().unwrap();
        let backend = LocalObjectBackend::new(dir.path());
        assert!(backend.get("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn delete_of_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = LocalObjectBackend::new(dir.path());
        assert!(backend.delete("nope.png").await.unwrap_err().is_not_found());
        assert!(backend.head("nope.png").await.unwrap().is_none());
    }
}

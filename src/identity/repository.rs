use crate::domain::model::{NewUser, User};
use crate::domain::ports::UserRepository;
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Users plus the id counter. Both repositories mutate this under a lock, so
/// lookup-or-create is atomic.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct UserTable {
    next_id: u64,
    users: Vec<User>,
}

impl UserTable {
    fn find(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    fn get_or_create(&mut self, new_user: NewUser) -> (User, bool) {
        if let Some(existing) = self.find(&new_user.email) {
            return (existing.clone(), false);
        }
        self.next_id = self.next_id.max(self.users.iter().map(|u| u.id).max().unwrap_or(0)) + 1;
        let user = new_user.into_user(self.next_id);
        self.users.push(user.clone());
        (user, true)
    }

    fn save(&mut self, user: &User) -> Result<()> {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(ShimError::not_found(&user.email)),
        }
    }
}

fn poisoned<T>(_: T) -> ShimError {
    ShimError::BackendError {
        message: "user table lock poisoned".to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    table: Mutex<UserTable>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.table.lock().map_err(poisoned)?.find(email).cloned())
    }

    async fn get_or_create(&self, new_user: NewUser) -> Result<(User, bool)> {
        Ok(self.table.lock().map_err(poisoned)?.get_or_create(new_user))
    }

    async fn save(&self, user: &User) -> Result<()> {
        self.table.lock().map_err(poisoned)?.save(user)
    }
}

/// Same semantics as [`MemoryUserRepository`], written to a JSON file after
/// every change.
#[derive(Debug)]
pub struct JsonUserRepository {
    path: PathBuf,
    table: tokio::sync::Mutex<UserTable>,
}

impl JsonUserRepository {
    /// Loads `path` if it exists; otherwise starts empty and creates the file
    /// on the first write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UserTable::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("loaded users from {}", path.display());
        Ok(Self {
            path,
            table: tokio::sync::Mutex::new(table),
        })
    }

    async fn persist(&self, table: &UserTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(table)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for JsonUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.table.lock().await.find(email).cloned())
    }

    async fn get_or_create(&self, new_user: NewUser) -> Result<(User, bool)> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let (user, created) = next.get_or_create(new_user);
        if created {
            // 寫檔成功後才更新記憶體中的表
            self.persist(&next).await?;
            *table = next;
        }
        Ok((user, created))
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        next.save(user)?;
        self.persist(&next).await?;
        *table = next;
        Ok(())
    }
}

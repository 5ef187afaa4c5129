use crate::domain::model::{
    BlobInfo, BlobKey, NewUser, ObjectMeta, Principal, StoredFile, User,
};
use crate::identity::RequestContext;
use crate::utils::error::Result;
use async_trait::async_trait;

/// File storage contract exposed to the application.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn open(&self, name: &str, mode: &str) -> Result<StoredFile>;
    /// Returns the name (or opaque key) to use for every later call.
    async fn save(&self, name: &str, content: &[u8]) -> Result<String>;
    async fn delete(&self, name: &str) -> Result<()>;
    async fn exists(&self, name: &str) -> Result<bool>;
    async fn size(&self, name: &str) -> Result<u64>;
    async fn url(&self, name: &str) -> Result<String>;
    async fn listdir(&self, dirname: &str) -> Result<(Vec<String>, Vec<String>)>;
}

/// Raw bucket/object API.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    async fn put(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
        acl: Option<&str>,
    ) -> Result<()>;
    async fn get(&self, name: &str) -> Result<Vec<u8>>;
    async fn delete(&self, name: &str) -> Result<()>;
    /// `None` when the object does not exist.
    async fn head(&self, name: &str) -> Result<Option<ObjectMeta>>;
}

/// Metadata index kept next to an object store.
pub trait BlobIndex: Send + Sync {
    fn get(&self, key: &BlobKey) -> Result<Option<BlobInfo>>;
    fn put(&self, info: BlobInfo) -> Result<()>;
    fn remove(&self, key: &BlobKey) -> Result<bool>;
}

/// Managed blob service handing out opaque keys.
#[async_trait]
pub trait BlobService: Send + Sync {
    async fn create(
        &self,
        content_type: &str,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<BlobKey>;
    async fn info(&self, key: &BlobKey) -> Result<Option<BlobInfo>>;
    async fn read(&self, key: &BlobKey) -> Result<Vec<u8>>;
    async fn delete(&self, key: &BlobKey) -> Result<()>;
}

/// Platform authentication service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self, ctx: &RequestContext) -> Result<Option<Principal>>;
    async fn is_current_user_admin(&self, ctx: &RequestContext) -> Result<bool>;
    fn is_backend_request(&self, _ctx: &RequestContext) -> bool {
        false
    }
    fn create_login_url(&self, dest_url: &str) -> String;
    fn create_logout_url(&self, dest_url: &str) -> String;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Atomic lookup-or-create keyed by `new_user.email`. The flag is true
    /// when a record was inserted by this call.
    async fn get_or_create(&self, new_user: NewUser) -> Result<(User, bool)>;
    async fn save(&self, user: &User) -> Result<()>;
}

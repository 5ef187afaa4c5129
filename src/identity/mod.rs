//! Platform identity -> local user resolution.

pub mod header_provider;
pub mod middleware;
pub mod repository;

pub use header_provider::HeaderIdentityProvider;
pub use middleware::{backend_superuser, AuthenticationMiddleware};
pub use repository::{JsonUserRepository, MemoryUserRepository};

use crate::domain::model::RequestUser;
use crate::domain::ports::IdentityProvider;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// What happens when a platform-authenticated principal has no local record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPolicy {
    /// Create a record for every principal; platform admins become superusers.
    #[default]
    CreateAll,
    /// Only platform admins get a record (as superusers); everyone else stays anonymous.
    AdminsOnly,
}

/// Per-request state. The resolved user is cached for the life of the request.
#[derive(Debug, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    full_path: String,
    user: OnceCell<RequestUser>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, full_path: impl Into<String>) -> Self {
        Self {
            headers,
            full_path: full_path.into(),
            user: OnceCell::new(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// The user, if it has already been resolved for this request.
    pub fn cached_user(&self) -> Option<&RequestUser> {
        self.user.get()
    }

    pub(crate) fn user_cell(&self) -> &OnceCell<RequestUser> {
        &self.user
    }
}

/// Login/logout links for templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUrls {
    pub login_url: String,
    pub logout_url: String,
    pub login_url_with_next: String,
}

pub fn auth_urls<P: IdentityProvider + ?Sized>(
    provider: &P,
    full_path: &str,
    login_redirect: Option<&str>,
) -> AuthUrls {
    AuthUrls {
        login_url: provider.create_login_url(full_path),
        logout_url: provider.create_logout_url(full_path),
        login_url_with_next: provider.create_login_url(login_redirect.unwrap_or(full_path)),
    }
}

use crate::config::IdentityConfig;
use crate::domain::model::Principal;
use crate::domain::ports::IdentityProvider;
use crate::identity::RequestContext;
use crate::utils::error::Result;
use async_trait::async_trait;
use url::form_urlencoded::byte_serialize;

pub const USER_EMAIL_HEADER: &str = "x-appengine-user-email";
pub const USER_NICKNAME_HEADER: &str = "x-appengine-user-nickname";
pub const USER_IS_ADMIN_HEADER: &str = "x-appengine-user-is-admin";
pub const BACKEND_NAME_HEADER: &str = "x-appengine-backendname";

/// Reads the identity headers the platform front end injects into each request.
#[derive(Debug, Clone)]
pub struct HeaderIdentityProvider {
    login_path: String,
    logout_path: String,
}

impl Default for HeaderIdentityProvider {
    fn default() -> Self {
        Self::new("/_ah/login", "/_ah/logout")
    }
}

impl HeaderIdentityProvider {
    pub fn new(login_path: impl Into<String>, logout_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            logout_path: logout_path.into(),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.login_path.clone(), config.logout_path.clone())
    }

    fn with_continue(path: &str, dest_url: &str) -> String {
        let dest: String = byte_serialize(dest_url.as_bytes()).collect();
        format!("{}?continue={}", path, dest)
    }
}

#[async_trait]
impl IdentityProvider for HeaderIdentityProvider {
    async fn current_principal(&self, ctx: &RequestContext) -> Result<Option<Principal>> {
        let email = match ctx.header(USER_EMAIL_HEADER).map(str::trim) {
            Some(email) if !email.is_empty() => email,
            _ => return Ok(None),
        };

        // 沒有 nickname 時取 email 的 @ 前半段
        let nickname = ctx
            .header(USER_NICKNAME_HEADER)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email));

        Ok(Some(Principal::new(email, nickname)))
    }

    async fn is_current_user_admin(&self, ctx: &RequestContext) -> Result<bool> {
        Ok(matches!(
            ctx.header(USER_IS_ADMIN_HEADER).map(str::trim),
            Some("1") | Some("true") | Some("True")
        ))
    }

    fn is_backend_request(&self, ctx: &RequestContext) -> bool {
        ctx.headers().contains_key(BACKEND_NAME_HEADER)
    }

    fn create_login_url(&self, dest_url: &str) -> String {
        Self::with_continue(&self.login_path, dest_url)
    }

    fn create_logout_url(&self, dest_url: &str) -> String {
        Self::with_continue(&self.logout_path, dest_url)
    }
}

use crate::domain::model::{NewUser, RequestUser, User};
use crate::domain::ports::{IdentityProvider, UserRepository};
use crate::identity::{BootstrapPolicy, RequestContext};
use crate::utils::error::Result;
use chrono::Utc;

/// Fixed identity for backend-instance requests that carry no credentials.
/// Never persisted.
pub fn backend_superuser() -> User {
    User {
        id: 0,
        username: "backend".to_string(),
        email: "backend@localhost".to_string(),
        is_staff: true,
        is_superuser: true,
        is_active: true,
        date_joined: Utc::now(),
    }
}

/// Resolves the request's user on first access and caches it on the request.
pub struct AuthenticationMiddleware<P: IdentityProvider, R: UserRepository> {
    provider: P,
    users: R,
    policy: BootstrapPolicy,
    trust_backend_instances: bool,
}

impl<P: IdentityProvider, R: UserRepository> AuthenticationMiddleware<P, R> {
    pub fn new(provider: P, users: R) -> Self {
        Self {
            provider,
            users,
            policy: BootstrapPolicy::default(),
            trust_backend_instances: false,
        }
    }

    pub fn with_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_backend_trust(mut self, trust: bool) -> Self {
        self.trust_backend_instances = trust;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn users(&self) -> &R {
        &self.users
    }

    /// The request's user. Only the first call per request talks to the
    /// platform and the repository.
    pub async fn user<'a>(&self, ctx: &'a RequestContext) -> Result<&'a RequestUser> {
        ctx.user_cell().get_or_try_init(|| self.resolve(ctx)).await
    }

    async fn resolve(&self, ctx: &RequestContext) -> Result<RequestUser> {
        let Some(principal) = self.provider.current_principal(ctx).await? else {
            if self.trust_backend_instances && self.provider.is_backend_request(ctx) {
                tracing::warn!("⚠️ backend instance request without credentials, acting as superuser");
                return Ok(RequestUser::Authenticated(backend_superuser()));
            }
            return Ok(RequestUser::Anonymous);
        };

        if let Some(user) = self.users.find_by_email(&principal.email).await? {
            return Ok(RequestUser::Authenticated(user));
        }

        let is_admin = self.provider.is_current_user_admin(ctx).await?;
        let new_user = match (self.policy, is_admin) {
            // bootstrap: 平台管理員一律成為本地 superuser
            (_, true) => NewUser::superuser(&principal.nickname, &principal.email),
            (BootstrapPolicy::CreateAll, false) => {
                NewUser::regular(&principal.nickname, &principal.email)
            }
            (BootstrapPolicy::AdminsOnly, false) => {
                tracing::info!(
                    "{} logged in through the platform but has no local account",
                    principal.email
                );
                return Ok(RequestUser::Anonymous);
            }
        };

        let (user, created) = self.users.get_or_create(new_user).await?;
        if created {
            tracing::info!(
                "created local user {} <{}> (superuser = {})",
                user.username,
                user.email,
                user.is_superuser
            );
        }
        Ok(RequestUser::Authenticated(user))
    }
}

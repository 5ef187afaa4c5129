use anyhow::Result;
use cloud_shims::identity::header_provider::{
    BACKEND_NAME_HEADER, USER_EMAIL_HEADER, USER_IS_ADMIN_HEADER, USER_NICKNAME_HEADER,
};
use cloud_shims::domain::model::NewUser;
use cloud_shims::identity::{JsonUserRepository, MemoryUserRepository};
use cloud_shims::{
    AuthenticationMiddleware, BootstrapPolicy, HeaderIdentityProvider, RequestContext,
    RequestUser, UserRepository,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tempfile::TempDir;

fn request(pairs: &[(&'static str, &'static str)]) -> RequestContext {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.insert(*name, HeaderValue::from_static(*value));
    }
    RequestContext::new(headers, "/maps/")
}

#[tokio::test]
async fn test_no_principal_is_anonymous() -> Result<()> {
    let middleware =
        AuthenticationMiddleware::new(HeaderIdentityProvider::default(), MemoryUserRepository::new());

    let ctx = request(&[]);
    let user = middleware.user(&ctx).await?;
    assert_eq!(*user, RequestUser::Anonymous);
    assert!(middleware.users().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_known_email_reuses_record_across_requests() -> Result<()> {
    let middleware =
        AuthenticationMiddleware::new(HeaderIdentityProvider::default(), MemoryUserRepository::new());
    let headers = [
        (USER_EMAIL_HEADER, "ada@example.com"),
        (USER_NICKNAME_HEADER, "ada"),
    ];

    let first = middleware.user(&request(&headers)).await?.clone();
    let second = middleware.user(&request(&headers)).await?.clone();

    assert!(first.is_authenticated());
    assert_eq!(first, second);
    assert_eq!(middleware.users().len(), 1);
    assert!(!first.is_superuser());
    Ok(())
}

#[tokio::test]
async fn test_admin_bootstrap_persists_superuser() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let users_file = temp_dir.path().join("users.json");

    {
        let repo = JsonUserRepository::open(&users_file).await?;
        let middleware = AuthenticationMiddleware::new(HeaderIdentityProvider::default(), repo)
            .with_policy(BootstrapPolicy::AdminsOnly);
        let ctx = request(&[
            (USER_EMAIL_HEADER, "root@example.com"),
            (USER_IS_ADMIN_HEADER, "1"),
        ]);
        let user = middleware.user(&ctx).await?;
        assert!(user.is_superuser());
        assert_eq!(user.user().unwrap().username, "root");
    }

    let repo = JsonUserRepository::open(&users_file).await?;
    let stored = repo.find_by_email("root@example.com").await?.unwrap();
    assert!(stored.is_staff && stored.is_superuser);
    Ok(())
}

#[tokio::test]
async fn test_existing_record_wins_over_admin_flag() -> Result<()> {
    let repo = MemoryUserRepository::new();
    repo.get_or_create(NewUser::regular("ada", "ada@example.com"))
        .await?;

    let middleware = AuthenticationMiddleware::new(HeaderIdentityProvider::default(), repo);
    let ctx = request(&[
        (USER_EMAIL_HEADER, "ada@example.com"),
        (USER_IS_ADMIN_HEADER, "1"),
    ]);
    let user = middleware.user(&ctx).await?;

    // bootstrap only applies on first login
    assert!(user.is_authenticated());
    assert!(!user.is_superuser());
    Ok(())
}

#[tokio::test]
async fn test_strict_policy_keeps_unknown_users_anonymous() -> Result<()> {
    let middleware =
        AuthenticationMiddleware::new(HeaderIdentityProvider::default(), MemoryUserRepository::new())
            .with_policy(BootstrapPolicy::AdminsOnly);

    let ctx = request(&[(USER_EMAIL_HEADER, "guest@example.com")]);
    let user = middleware.user(&ctx).await?;
    assert_eq!(*user, RequestUser::Anonymous);
    assert!(middleware.users().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_backend_instance_fallback_is_opt_in() -> Result<()> {
    let backend_request = || request(&[(BACKEND_NAME_HEADER, "tiler")]);

    let default_middleware =
        AuthenticationMiddleware::new(HeaderIdentityProvider::default(), MemoryUserRepository::new());
    assert_eq!(
        *default_middleware.user(&backend_request()).await?,
        RequestUser::Anonymous
    );

    let trusting =
        AuthenticationMiddleware::new(HeaderIdentityProvider::default(), MemoryUserRepository::new())
            .with_backend_trust(true);
    assert!(trusting.user(&backend_request()).await?.is_superuser());
    assert!(trusting.users().is_empty());

    // a real principal on a backend request is resolved normally
    let ctx = request(&[
        (BACKEND_NAME_HEADER, "tiler"),
        (USER_EMAIL_HEADER, "ada@example.com"),
    ]);
    let user = trusting.user(&ctx).await?;
    assert_eq!(user.user().unwrap().email, "ada@example.com");
    assert!(!user.is_superuser());
    Ok(())
}

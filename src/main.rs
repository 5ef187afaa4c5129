use clap::Parser;
use cloud_shims::config::cli::{Cli, Command};
use cloud_shims::identity::header_provider::{
    BACKEND_NAME_HEADER, USER_EMAIL_HEADER, USER_IS_ADMIN_HEADER, USER_NICKNAME_HEADER,
};
use cloud_shims::identity::{auth_urls, JsonUserRepository, MemoryUserRepository};
use cloud_shims::utils::{logger, validation::Validate};
use cloud_shims::{
    build_storage, convert_pdf, AppConfig, AuthenticationMiddleware, HeaderIdentityProvider,
    HttpConversionService, PdfOptions, RequestContext, RequestUser, Result, ShimError,
    UserRepository,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::io::Write;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = run(cli).await {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        tracing::debug!("config: {:?}", config);
    }

    match cli.command {
        Command::Put { name, file } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            let content = tokio::fs::read(&file).await?;
            let stored = storage.save(&name, &content).await?;
            tracing::info!("✅ stored {} bytes from {}", content.len(), file.display());
            println!("{}", stored);
        }
        Command::Get { name, output, mode } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            let file = storage.open(&name, &mode).await?;
            match output {
                Some(path) => tokio::fs::write(&path, file.contents()).await?,
                None => std::io::stdout().write_all(file.contents())?,
            }
        }
        Command::Exists { name } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            println!("{}", storage.exists(&name).await?);
        }
        Command::Size { name } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            println!("{}", storage.size(&name).await?);
        }
        Command::Url { name } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            println!("{}", storage.url(&name).await?);
        }
        Command::Rm { name } => {
            config.storage.validate()?;
            let storage = build_storage(&config.storage).await?;
            storage.delete(&name).await?;
            tracing::info!("✅ deleted {}", name);
        }
        Command::Convert {
            pdf,
            out,
            width,
            page,
            mime,
        } => {
            config.conversion.validate()?;
            let service = HttpConversionService::from_config(&config.conversion)?;
            let options = PdfOptions {
                image_width: width.unwrap_or(config.conversion.image_width),
                dst_content_type: mime.unwrap_or_else(|| config.conversion.dst_content_type.clone()),
                file_name: pdf
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("dummyFileName")
                    .to_string(),
                page_number: page,
            };
            let data = tokio::fs::read(&pdf).await?;
            let image = convert_pdf(&service, &data, &options).await?;
            tokio::fs::write(&out, &image).await?;
            println!("✅ wrote {} bytes to {}", image.len(), out.display());
        }
        Command::Whoami {
            email,
            nickname,
            admin,
            backend,
        } => {
            config.identity.validate()?;
            let mut headers = HeaderMap::new();
            insert_header(&mut headers, USER_EMAIL_HEADER, email.as_deref())?;
            insert_header(&mut headers, USER_NICKNAME_HEADER, nickname.as_deref())?;
            insert_header(&mut headers, USER_IS_ADMIN_HEADER, admin.then_some("1"))?;
            insert_header(&mut headers, BACKEND_NAME_HEADER, backend.then_some("cli"))?;
            let ctx = RequestContext::new(headers, "/");

            match &config.identity.users_file {
                Some(path) => whoami(&config, JsonUserRepository::open(path).await?, &ctx).await?,
                None => whoami(&config, MemoryUserRepository::new(), &ctx).await?,
            }
        }
    }

    Ok(())
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        let value = HeaderValue::from_str(value).map_err(|e| ShimError::ConfigError {
            message: format!("invalid value for {}: {}", name, e),
        })?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(())
}

async fn whoami<R: UserRepository>(config: &AppConfig, users: R, ctx: &RequestContext) -> Result<()> {
    let provider = HeaderIdentityProvider::from_config(&config.identity);
    let urls = auth_urls(
        &provider,
        ctx.full_path(),
        config.identity.login_redirect_url.as_deref(),
    );
    let middleware = AuthenticationMiddleware::new(provider, users)
        .with_policy(config.identity.bootstrap)
        .with_backend_trust(config.identity.trust_backend_instances);

    match middleware.user(ctx).await? {
        RequestUser::Anonymous => {
            println!("anonymous");
            println!("login: {}", urls.login_url);
        }
        RequestUser::Authenticated(user) => {
            println!("{}", serde_json::to_string_pretty(user)?);
            println!("logout: {}", urls.logout_url);
        }
    }
    Ok(())
}

use crate::adapters::gcs::DEFAULT_GCS_ENDPOINT;
use crate::identity::BootstrapPolicy;
use crate::storage::object_store::DEFAULT_ACL;
use crate::utils::error::{Result, ShimError};
use crate::utils::validation::{
    validate_bucket_name, validate_non_empty_string, validate_path, validate_range, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    /// Bucket objects over HTTP, exists/size through the blob index.
    #[default]
    Gcs,
    /// Managed blobs with opaque keys, stored in the bucket.
    Blob,
    Local,
    Memory,
    S3,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(Self::Gcs),
            "blob" => Ok(Self::Blob),
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            "s3" => Ok(Self::S3),
            other => Err(ShimError::InvalidConfigValueError {
                field: "storage.backend".to_string(),
                value: other.to_string(),
                reason: "Valid backends: gcs, blob, local, memory, s3".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub bucket: Option<String>,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub acl: Option<String>,
    pub public_base_url: Option<String>,
    pub index_read_through: bool,
    pub blob_prefix: String,
    pub local_root: String,
    pub region: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            bucket: None,
            endpoint: DEFAULT_GCS_ENDPOINT.to_string(),
            access_token: None,
            acl: Some(DEFAULT_ACL.to_string()),
            public_base_url: None,
            index_read_through: true,
            blob_prefix: "blobs".to_string(),
            local_root: "./data".to_string(),
            region: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub bootstrap: BootstrapPolicy,
    pub trust_backend_instances: bool,
    pub users_file: Option<String>,
    pub login_redirect_url: Option<String>,
    pub login_path: String,
    pub logout_path: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            bootstrap: BootstrapPolicy::default(),
            trust_backend_instances: false,
            users_file: None,
            login_redirect_url: None,
            login_path: "/_ah/login".to_string(),
            logout_path: "/_ah/logout".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub image_width: u32,
    pub dst_content_type: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_seconds: 60,
            image_width: 1000,
            dst_content_type: "image/png".to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${GCS_ACCESS_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var regex is valid");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Environment variables win over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Ok(bucket) = std::env::var("GCS_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Ok(token) = std::env::var("GCS_ACCESS_TOKEN") {
            self.storage.access_token = Some(token);
        }
        if let Ok(endpoint) = std::env::var("CONVERSION_ENDPOINT") {
            self.conversion.endpoint = Some(endpoint);
        }
        Ok(())
    }

    /// Loads the file when given (defaults otherwise), then applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }
}

impl StorageConfig {
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .ok_or_else(|| ShimError::MissingConfigError {
                field: "storage.bucket".to_string(),
            })
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        match self.backend {
            StorageBackendKind::Gcs | StorageBackendKind::Blob => {
                validate_bucket_name("storage.bucket", self.require_bucket()?)?;
                validate_url("storage.endpoint", &self.endpoint)?;
            }
            StorageBackendKind::S3 => {
                validate_bucket_name("storage.bucket", self.require_bucket()?)?;
            }
            StorageBackendKind::Local => {
                validate_path("storage.local_root", &self.local_root)?;
            }
            StorageBackendKind::Memory => {}
        }

        if let Some(base) = &self.public_base_url {
            validate_url("storage.public_base_url", base)?;
        }
        validate_range("storage.timeout_seconds", self.timeout_seconds, 1, 600)?;
        Ok(())
    }
}

impl Validate for IdentityConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("identity.login_path", &self.login_path)?;
        validate_non_empty_string("identity.logout_path", &self.logout_path)?;
        if let Some(users_file) = &self.users_file {
            validate_path("identity.users_file", users_file)?;
        }
        Ok(())
    }
}

impl Validate for ConversionConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            validate_url("conversion.endpoint", endpoint)?;
        }
        validate_range("conversion.timeout_seconds", self.timeout_seconds, 1, 600)?;
        validate_range("conversion.image_width", self.image_width, 1, 10_000)?;
        validate_non_empty_string("conversion.dst_content_type", &self.dst_content_type)?;
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.identity.validate()?;
        self.conversion.validate()?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.storage.backend, StorageBackendKind::Gcs);
        assert_eq!(config.storage.acl.as_deref(), Some("public-read"));
        assert_eq!(config.identity.bootstrap, BootstrapPolicy::CreateAll);
        assert!(!config.identity.trust_backend_instances);
        assert_eq!(config.conversion.image_width, 1000);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[storage]
backend = "blob"
bucket = "geocam-media"
blob_prefix = "uploads"

[identity]
bootstrap = "admins_only"
trust_backend_instances = true

[conversion]
endpoint = "https://convert.example.com/v1/convert"
image_width = 640
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.storage.backend, StorageBackendKind::Blob);
        assert_eq!(config.storage.bucket.as_deref(), Some("geocam-media"));
        assert_eq!(config.identity.bootstrap, BootstrapPolicy::AdminsOnly);
        assert_eq!(config.conversion.image_width, 640);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CLOUD_SHIMS_TEST_TOKEN", "secret-token");

        let config = AppConfig::from_toml_str(
            r#"
[storage]
bucket = "geocam"
access_token = "${CLOUD_SHIMS_TEST_TOKEN}"
"#,
        )
        .unwrap();
        assert_eq!(config.storage.access_token.as_deref(), Some("secret-token"));

        std::env::remove_var("CLOUD_SHIMS_TEST_TOKEN");
    }

    #[test]
    fn test_gcs_requires_bucket() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ShimError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AppConfig::from_toml_str(
            r#"
[storage]
backend = "memory"

[conversion]
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        assert!(AppConfig::from_toml_str("[storage]\nbackend = \"ftp\"\n").is_err());
        assert!("ftp".parse::<StorageBackendKind>().is_err());
        assert_eq!("S3".parse::<StorageBackendKind>().unwrap(), StorageBackendKind::S3);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\nbackend = \"local\"\nlocal_root = \"/tmp/shims\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackendKind::Local);
        assert_eq!(config.storage.local_root, "/tmp/shims");
        assert!(config.validate().is_ok());
    }
}

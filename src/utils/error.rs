use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Operation not implemented: {operation}")]
    NotImplemented { operation: String },

    #[error("Unsupported open mode: {mode:?}")]
    UnsupportedMode { mode: String },

    #[error("Object does not exist at {name}")]
    NotFound { name: String },

    #[error("{text} [code {code}]")]
    PdfConversion { code: i32, text: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Storage backend error: {message}")]
    BackendError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl ShimError {
    pub fn not_implemented(operation: &str) -> Self {
        ShimError::NotImplemented {
            operation: operation.to_string(),
        }
    }

    pub fn not_found(name: &str) -> Self {
        ShimError::NotFound {
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ShimError::NotFound { .. })
    }

    /// 給 CLI 使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ShimError::NotImplemented { operation } => {
                format!("'{}' is not supported by the configured storage backend", operation)
            }
            ShimError::NotFound { name } => format!("Nothing stored under '{}'", name),
            ShimError::PdfConversion { .. } => format!("PDF conversion failed: {}", self),
            ShimError::ApiError(_) | ShimError::BackendError { .. } => {
                format!("Remote service call failed: {}", self)
            }
            ShimError::ConfigError { .. }
            | ShimError::MissingConfigError { .. }
            | ShimError::InvalidConfigValueError { .. }
            | ShimError::TomlError(_) => format!("Configuration problem: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ShimError::NotFound { .. } => 4,
            ShimError::ConfigError { .. }
            | ShimError::MissingConfigError { .. }
            | ShimError::InvalidConfigValueError { .. }
            | ShimError::TomlError(_) => 2,
            ShimError::ApiError(_) | ShimError::BackendError { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShimError>;

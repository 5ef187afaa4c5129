use crate::config::ConversionConfig;
use crate::conversion::{Conversion, ConversionOutcome, ConversionService};
use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Conversion API over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpConversionService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ShimError::MissingConfigError {
                field: "conversion.endpoint".to_string(),
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn convert(&self, conversion: &Conversion) -> Result<ConversionOutcome> {
        tracing::debug!(
            "POST {} ({} -> {}, {} bytes)",
            self.endpoint,
            conversion.input.mime_type,
            conversion.output_mime_type,
            conversion.input.data.len()
        );

        let mut request = self.client.post(&self.endpoint).json(conversion);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // 服務端錯誤也可能帶 error_code / error_text，先嘗試解析
        match serde_json::from_slice::<ConversionOutcome>(&body) {
            Ok(outcome) => {
                if !status.is_success() {
                    tracing::warn!("conversion service returned {}", status);
                }
                Ok(outcome)
            }
            Err(_) if !status.is_success() => Err(ShimError::BackendError {
                message: format!(
                    "conversion service returned {}: {}",
                    status,
                    String::from_utf8_lossy(&body).trim()
                ),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

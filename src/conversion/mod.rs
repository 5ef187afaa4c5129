//! PDF rasterization through the platform conversion API.

pub mod http;

pub use http::HttpConversionService;

use crate::utils::error::{Result, ShimError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A named, typed byte payload; both input and output of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Asset {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>, name: Option<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
            name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub input: Asset,
    pub output_mime_type: String,
    pub options: ConversionOptions,
}

impl Conversion {
    pub fn new(input: Asset, output_mime_type: impl Into<String>) -> Self {
        Self {
            input,
            output_mime_type: output_mime_type.into(),
            options: ConversionOptions::default(),
        }
    }

    pub fn with_image_width(mut self, width: u32) -> Self {
        self.options.image_width = Some(width);
        self
    }

    pub fn with_page_range(mut self, first_page: u32, last_page: u32) -> Self {
        self.options.first_page = Some(first_page);
        self.options.last_page = Some(last_page);
        self
    }
}

/// Service reply: result assets, or an error code and text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn convert(&self, conversion: &Conversion) -> Result<ConversionOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfOptions {
    pub image_width: u32,
    pub dst_content_type: String,
    pub file_name: String,
    pub page_number: Option<u32>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            image_width: 1000,
            dst_content_type: "image/png".to_string(),
            file_name: "dummyFileName".to_string(),
            page_number: None,
        }
    }
}

/// Rasterizes raw PDF bytes and returns the first result asset's bytes.
/// A reply without assets becomes [`ShimError::PdfConversion`].
pub async fn convert_pdf<S: ConversionService + ?Sized>(
    service: &S,
    data: &[u8],
    options: &PdfOptions,
) -> Result<Vec<u8>> {
    let asset = Asset::new(PDF_MIME_TYPE, data.to_vec(), Some(options.file_name.clone()));
    let mut conversion =
        Conversion::new(asset, &options.dst_content_type).with_image_width(options.image_width);
    if let Some(page) = options.page_number {
        conversion = conversion.with_page_range(page, page);
    }

    let outcome = service.convert(&conversion).await?;
    match outcome.assets.into_iter().next() {
        Some(asset) => {
            tracing::debug!(
                "converted {} bytes of PDF into {} bytes of {}",
                data.len(),
                asset.data.len(),
                asset.mime_type
            );
            Ok(asset.data)
        }
        None => Err(ShimError::PdfConversion {
            code: outcome.error_code.unwrap_or_default(),
            text: outcome.error_text.unwrap_or_default(),
        }),
    }
}

/// Replies with a fixed outcome and remembers the requests it saw.
#[derive(Debug, Default)]
pub struct StaticConversionService {
    outcome: ConversionOutcome,
    requests: Mutex<Vec<Conversion>>,
}

impl StaticConversionService {
    pub fn new(outcome: ConversionOutcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Conversion> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConversionService for StaticConversionService {
    async fn convert(&self, conversion: &Conversion) -> Result<ConversionOutcome> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(conversion.clone());
        }
        Ok(self.outcome.clone())
    }
}

pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cloud_shims::config::ConversionConfig;
use cloud_shims::{convert_pdf, HttpConversionService, PdfOptions, ShimError};
use httpmock::prelude::*;

#[tokio::test]
async fn test_single_asset_bytes_returned_unchanged() -> Result<()> {
    let server = MockServer::start();
    let image = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    let convert_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/convert")
            .header("content-type", "application/json")
            .json_body_partial(
                r#"{
                    "input": {"mime_type": "application/pdf", "name": "plan.pdf"},
                    "output_mime_type": "image/png",
                    "options": {"image_width": 640, "first_page": 2, "last_page": 2}
                }"#,
            );
        then.status(200).json_body(serde_json::json!({
            "assets": [{"mime_type": "image/png", "data": STANDARD.encode(&image)}]
        }));
    });

    let service = HttpConversionService::new(server.url("/convert"));
    let options = PdfOptions {
        image_width: 640,
        file_name: "plan.pdf".to_string(),
        page_number: Some(2),
        ..PdfOptions::default()
    };

    let result = convert_pdf(&service, b"%PDF-1.4 ...", &options).await?;
    convert_mock.assert();
    assert_eq!(result, image);
    Ok(())
}

#[tokio::test]
async fn test_zero_assets_raise_conversion_error() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/convert");
        then.status(200).json_body(serde_json::json!({
            "assets": [],
            "error_code": 4,
            "error_text": "CONVERSION_TOO_LARGE"
        }));
    });

    let service = HttpConversionService::new(server.url("/convert"));
    let err = convert_pdf(&service, b"%PDF", &PdfOptions::default())
        .await
        .unwrap_err();

    match err {
        ShimError::PdfConversion { code, ref text } => {
            assert_eq!(code, 4);
            assert_eq!(text, "CONVERSION_TOO_LARGE");
        }
        other => panic!("expected conversion error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_non_json_failure_is_backend_error() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/convert");
        then.status(503).body("service unavailable");
    });

    let service = HttpConversionService::new(server.url("/convert"));
    let err = convert_pdf(&service, b"%PDF", &PdfOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ShimError::BackendError { .. }));
    assert!(err.to_string().contains("503"));
    Ok(())
}

#[tokio::test]
async fn test_from_config_sends_api_key() -> Result<()> {
    let server = MockServer::start();
    let convert_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/convert")
            .header("authorization", "Bearer conv-key");
        then.status(200).json_body(serde_json::json!({
            "assets": [{"mime_type": "image/jpeg", "data": STANDARD.encode(b"JPEG")}]
        }));
    });

    let config = ConversionConfig {
        endpoint: Some(server.url("/v1/convert")),
        api_key: Some("conv-key".to_string()),
        ..ConversionConfig::default()
    };
    let service = HttpConversionService::from_config(&config)?;
    let options = PdfOptions {
        dst_content_type: "image/jpeg".to_string(),
        ..PdfOptions::default()
    };
    assert_eq!(convert_pdf(&service, b"%PDF", &options).await?, b"JPEG");
    convert_mock.assert();

    let missing = ConversionConfig::default();
    assert!(matches!(
        HttpConversionService::from_config(&missing),
        Err(ShimError::MissingConfigError { .. })
    ));
    Ok(())
}

use crate::utils::error::{ShimError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> ShimError {
    ShimError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Bucket names: 3-63 chars of lowercase letters, digits, `-`, `_` and `.`,
/// starting and ending with a letter or digit.
pub fn validate_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    static BUCKET_RE: OnceLock<Regex> = OnceLock::new();
    let re = BUCKET_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9._-]{1,61}[a-z0-9]$").expect("bucket name regex is valid")
    });

    if bucket_name.is_empty() {
        return Err(invalid(field_name, bucket_name, "Bucket name cannot be empty"));
    }

    if !re.is_match(bucket_name) {
        return Err(invalid(
            field_name,
            bucket_name,
            "Bucket name must be 3-63 lowercase letters, digits, '-', '_' or '.', \
             and start and end with a letter or digit",
        ));
    }

    if bucket_name.contains("..") {
        return Err(invalid(
            field_name,
            bucket_name,
            "Bucket name cannot contain consecutive dots",
        ));
    }

    Ok(())
}

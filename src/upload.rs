//! Checks applied to a document before any bytes leave the process.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use mime_guess::MimeGuess;
use thiserror::Error;
use uuid::Uuid;

use crate::config::UploadConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please select a file to upload")]
    MissingFile,

    #[error("File is empty")]
    EmptyFile,

    #[error("File size must be less than {}", size_limit_label(*.limit))]
    TooLarge { size: u64, limit: u64 },

    #[error("Unsupported file type '{extension}'. Allowed: {allowed}")]
    UnsupportedType { extension: String, allowed: String },
}

/// A file that passed validation, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    pub file_name: String,
    pub extension: String,
    pub mime_type: String,
    pub size: u64,
}

/// Whole-unit rendering of a size limit: `10MB`, `512KB`, else plain bytes
pub fn size_limit_label(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    match bytes {
        0 => "0 bytes".to_string(),
        b if b % MB == 0 => format!("{}MB", b / MB),
        b if b % KB == 0 => format!("{}KB", b / KB),
        b => format!("{} bytes", b),
    }
}

/// Size check alone, usable while the body is still streaming in
pub fn check_size(size: u64, config: &UploadConfig) -> Result<(), UploadError> {
    if size > config.max_file_size_bytes {
        return Err(UploadError::TooLarge { size, limit: config.max_file_size_bytes });
    }
    Ok(())
}

/// Text after the last `.`; a name without one is its own extension
pub fn extension_of(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}

pub fn validate(
    file_name: &str,
    size: u64,
    declared_type: Option<&str>,
    config: &UploadConfig,
) -> Result<ValidatedFile, UploadError> {
    let file_name = file_name.trim();
    if file_name.is_empty() {
        return Err(UploadError::MissingFile);
    }
    check_size(size, config)?;
    if size == 0 {
        return Err(UploadError::EmptyFile);
    }

    let extension = extension_of(file_name).to_string();
    if !config
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    {
        return Err(UploadError::UnsupportedType {
            extension,
            allowed: config.allowed_extensions.join(", "),
        });
    }

    let mime_type = declared_type
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "application/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| guess_mime(file_name));

    Ok(ValidatedFile {
        file_name: file_name.to_string(),
        extension,
        mime_type,
        size,
    })
}

pub fn guess_mime(file_name: &str) -> String {
    MimeGuess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Current unix time in milliseconds, strictly increasing within this process
fn next_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// `{owner_id}/{unix_millis}.{extension}`
pub fn storage_path(owner_id: Uuid, extension: &str) -> String {
    format!("{}/{}.{}", owner_id, next_millis(), extension)
}

//! Input resolution: turn a user-supplied path or URL into bytes in memory.
//!
//! Every backend works from a byte buffer (pdfium included, via
//! `load_pdf_from_byte_vec`), so a downloaded document never touches the
//! filesystem. The name kept alongside the bytes is what format detection
//! and error messages use.

use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A source document loaded into memory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// The source string exactly as the user gave it.
    pub origin: String,
    /// File name used for extension-based detection: the local file name,
    /// or the last path segment of a URL.
    pub name: String,
    /// `Content-Type` reported by the server, for URL sources.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Build a source from bytes already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            origin: name.clone(),
            name,
            content_type: None,
            bytes,
        }
    }

    /// Decode the payload as UTF-8 text, replacing invalid sequences and
    /// dropping a leading byte-order mark.
    pub fn text(&self) -> String {
        let s = String::from_utf8_lossy(&self.bytes);
        s.strip_prefix('\u{FEFF}').unwrap_or(&s).to_string()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
///
/// If the input is a URL, download it. Otherwise read the local file.
pub async fn resolve_input(
    input: &str,
    config: &ConversionConfig,
) -> Result<SourceDocument, Doc2MdError> {
    if input.trim().is_empty() {
        return Err(Doc2MdError::InvalidInput {
            input: input.to_string(),
            reason: "source is empty".into(),
        });
    }

    if is_url(input) {
        download_url(input, config).await
    } else {
        read_local(input).await
    }
}

/// Read a local file, mapping the common I/O failures to specific errors.
async fn read_local(path_str: &str) -> Result<SourceDocument, Doc2MdError> {
    let path = PathBuf::from(path_str);

    let meta = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Doc2MdError::PermissionDenied { path: path.clone() },
        _ => Doc2MdError::FileNotFound { path: path.clone() },
    })?;
    if meta.is_dir() {
        return Err(Doc2MdError::InvalidInput {
            input: path_str.to_string(),
            reason: "is a directory, not a document".into(),
        });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Doc2MdError::PermissionDenied { path: path.clone() },
        std::io::ErrorKind::NotFound => Doc2MdError::FileNotFound { path: path.clone() },
        _ => Doc2MdError::InvalidInput {
            input: path_str.to_string(),
            reason: e.to_string(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local source {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceDocument {
        origin: path_str.to_string(),
        name,
        content_type: None,
        bytes,
    })
}

/// Download a URL into memory. One attempt, bounded by the configured timeout.
async fn download_url(url: &str, config: &ConversionConfig) -> Result<SourceDocument, Doc2MdError> {
    info!("Downloading document from: {}", url);
    let timeout_secs = config.download_timeout_secs;

    let parsed = reqwest::Url::parse(url).map_err(|e| Doc2MdError::InvalidInput {
        input: url.to_string(),
        reason: format!("not a valid URL: {e}"),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Doc2MdError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Doc2MdError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Doc2MdError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(parsed.clone()).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Doc2MdError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(map_send_err)?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(SourceDocument {
        origin: url.to_string(),
        name: url_file_name(&parsed).unwrap_or_default(),
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// The last non-empty path segment of a URL, ignoring query and fragment.
pub fn url_file_name(url: &reqwest::Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_string)
}

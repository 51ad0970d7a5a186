//! Error type for the doc2md library.
//!
//! Every failure is fatal for the run: a single source produces a single
//! Markdown file, so there is no partial result worth keeping. Variants are
//! grouped the way a user would troubleshoot them: can the source be read,
//! can it be converted, can the result be written.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'. Check the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'. Try: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a readable file path or a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'. Increase --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// No backend recognises the source format.
    #[error("Unsupported document format for '{source_name}'{}", detail_suffix(.detail))]
    UnsupportedFormat {
        source_name: String,
        detail: Option<String>,
    },

    /// A backend accepted the source but could not read it.
    #[error("{backend} backend could not convert '{source_name}': {detail}")]
    ConversionFailed {
        backend: &'static str,
        source_name: String,
        detail: String,
    },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error(
        "PDF '{source_name}' is encrypted and requires a password. Provide it with --password <PASSWORD>."
    )]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}. PDFium is downloaded automatically on first use; \
check your internet connection, or set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or resolve the output directory.
    #[error("Failed to prepare output directory '{path}'")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}'")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl Doc2MdError {
    /// True when the failure happened while reading or converting the source,
    /// as opposed to writing the result.
    pub fn is_conversion_failure(&self) -> bool {
        !matches!(
            self,
            Doc2MdError::OutputDirFailed { .. } | Doc2MdError::OutputWriteFailed { .. }
        )
    }
}

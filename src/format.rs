//! Input format detection.
//!
//! A source is classified once, before any backend sees it. The sources of
//! evidence are consulted from most to least explicit: a caller override,
//! the file extension, the HTTP `Content-Type`, and finally the leading bytes
//! of the payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The document formats doc2md knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Html,
    Markdown,
    Text,
    Docx,
    Pdf,
}

impl InputFormat {
    pub const ALL: [InputFormat; 5] = [
        InputFormat::Html,
        InputFormat::Markdown,
        InputFormat::Text,
        InputFormat::Docx,
        InputFormat::Pdf,
    ];

    /// Short lowercase name, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Html => "html",
            InputFormat::Markdown => "markdown",
            InputFormat::Text => "text",
            InputFormat::Docx => "docx",
            InputFormat::Pdf => "pdf",
        }
    }

    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" | "xhtml" => Some(InputFormat::Html),
            "md" | "markdown" => Some(InputFormat::Markdown),
            "txt" | "text" => Some(InputFormat::Text),
            "docx" => Some(InputFormat::Docx),
            "pdf" => Some(InputFormat::Pdf),
            _ => None,
        }
    }

    /// Map an HTTP `Content-Type` header value to a format.
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => Some(InputFormat::Html),
            "text/markdown" | "text/x-markdown" => Some(InputFormat::Markdown),
            "text/plain" => Some(InputFormat::Text),
            "application/pdf" => Some(InputFormat::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(InputFormat::Docx)
            }
            _ => None,
        }
    }

    /// Guess a format from the payload itself.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(InputFormat::Pdf);
        }
        if bytes.starts_with(b"PK\x03\x04") {
            // A ZIP local header; only Word archives carry a `word/` part.
            return contains_subslice(bytes, b"word/").then_some(InputFormat::Docx);
        }

        let text = std::str::from_utf8(bytes).ok()?;
        let head: String = text
            .trim_start_matches('\u{FEFF}')
            .trim_start()
            .chars()
            .take(64)
            .collect::<String>()
            .to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            Some(InputFormat::Html)
        } else {
            Some(InputFormat::Text)
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(InputFormat::Html),
            "markdown" | "md" => Ok(InputFormat::Markdown),
            "text" | "txt" => Ok(InputFormat::Text),
            "docx" => Ok(InputFormat::Docx),
            "pdf" => Ok(InputFormat::Pdf),
            other => Err(format!(
                "unknown format '{other}' (expected one of: html, markdown, text, docx, pdf)"
            )),
        }
    }
}

/// Decide the format of a source.
///
/// `name` is the file name (or last URL path segment) used for the extension
/// check. Returns `None` when no rule matches.
pub fn detect(
    override_format: Option<InputFormat>,
    name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Option<InputFormat> {
    override_format
        .or_else(|| {
            Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(InputFormat::from_extension)
        })
        .or_else(|| content_type.and_then(InputFormat::from_content_type))
        .or_else(|| InputFormat::sniff(bytes))
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

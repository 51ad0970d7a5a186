//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The CLI maps its flags onto the
//! builder; library callers set only the knobs they care about.

use crate::error::Doc2MdError;
use crate::format::InputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default HTTP download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Configuration for a single conversion.
///
/// # Example
/// ```rust
/// use doc2md::{ConversionConfig, InputFormat, PageSeparator};
///
/// let config = ConversionConfig::builder()
///     .format(InputFormat::Html)
///     .page_separator(PageSeparator::HorizontalRule)
///     .download_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.download_timeout_secs, 30);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Force a specific input format instead of detecting it. Default: None.
    pub format: Option<InputFormat>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// `User-Agent` sent when downloading URL inputs.
    pub user_agent: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Separator between PDF pages in the rendered Markdown. Default: None.
    pub page_separator: PageSeparator,

    /// Prepend YAML front-matter with document metadata. Default: false.
    pub include_metadata: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: None,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            user_agent: concat!("doc2md/", env!("CARGO_PKG_VERSION")).to_string(),
            password: None,
            page_separator: PageSeparator::default(),
            include_metadata: false,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("format", &self.format)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("page_separator", &self.page_separator)
            .field("include_metadata", &self.include_metadata)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn format(mut self, format: InputFormat) -> Self {
        self.config.format = Some(format);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2MdError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "User agent must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How to separate pages in the rendered Markdown (paged formats only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with a blank line. (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }

    /// Parse the CLI spelling: `none`, `hr`/`---`, `comment`, or anything
    /// else as a custom separator.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" | "" => PageSeparator::None,
            "hr" | "---" => PageSeparator::HorizontalRule,
            "comment" => PageSeparator::Comment,
            _ => PageSeparator::Custom(s.to_string()),
        }
    }
}

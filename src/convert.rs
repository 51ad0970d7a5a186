//! Conversion entry points.
//!
//! [`DocumentConverter`] owns the configuration and the backend registry.
//! The free functions [`convert`], [`convert_sync`] and [`convert_to_dir`]
//! build a default converter for one-off calls.
//!
//! Nothing is written to disk until conversion has fully succeeded, so a
//! failed run never creates or truncates an output file.

use crate::backend::{default_backends, Backend};
use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use crate::format::{detect, InputFormat};
use crate::output::{
    format_yaml_front_matter, resolve_output_dir, write_markdown, ConversionOutput,
    ConversionStats, SavedOutput,
};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::postprocess;
use crate::request::ConversionRequest;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts documents to Markdown using a set of format backends.
///
/// # Example
/// ```rust,no_run
/// use doc2md::{ConversionConfig, DocumentConverter};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = DocumentConverter::new(ConversionConfig::default());
/// let output = converter.convert("report.html").await?;
/// println!("{}", output.markdown);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentConverter {
    config: ConversionConfig,
    backends: Vec<Arc<dyn Backend>>,
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl std::fmt::Debug for DocumentConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentConverter")
            .field("config", &self.config)
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DocumentConverter {
    /// A converter with the built-in backends.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            backends: default_backends(),
        }
    }

    /// Register an extra backend. It takes precedence over every backend
    /// registered before it for the formats it accepts.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(0, backend);
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert a local file or `http(s)://` URL.
    pub async fn convert(&self, source: impl AsRef<str>) -> Result<ConversionOutput, Doc2MdError> {
        let start = Instant::now();
        let source = source.as_ref();
        info!("Starting conversion: {}", source);

        let doc = input::resolve_input(source, &self.config).await?;
        self.convert_source(doc, start).await
    }

    /// Convert a document already in memory. `name` is used for format
    /// detection and messages.
    pub async fn convert_bytes(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<ConversionOutput, Doc2MdError> {
        let start = Instant::now();
        let source = SourceDocument::from_bytes(name, bytes);
        info!("Starting conversion: {} (in memory)", source.origin);
        self.convert_source(source, start).await
    }

    /// Convert `request.source` and write `<stem>.md` into `request.out_dir`.
    ///
    /// The output directory is created first; the file is written only after
    /// conversion succeeds.
    pub async fn convert_request(
        &self,
        request: &ConversionRequest,
    ) -> Result<SavedOutput, Doc2MdError> {
        let dir = resolve_output_dir(&request.out_dir)?;
        let path = request.output_path(&dir);
        debug!("output path: {}", path.display());

        let output = self.convert(&request.source).await?;
        write_markdown(&path, &output.markdown)?;
        info!("Wrote {} bytes to {}", output.markdown.len(), path.display());

        Ok(SavedOutput {
            path,
            stats: output.stats,
        })
    }

    async fn convert_source(
        &self,
        source: SourceDocument,
        start: Instant,
    ) -> Result<ConversionOutput, Doc2MdError> {
        let format = detect(
            self.config.format,
            &source.name,
            source.content_type.as_deref(),
            &source.bytes,
        )
        .ok_or_else(|| Doc2MdError::UnsupportedFormat {
            source_name: source.origin.clone(),
            detail: Some("unrecognised extension and binary content".into()),
        })?;
        debug!("{} detected as {}", source.origin, format);

        let backend = self.backend_for(format).ok_or_else(|| Doc2MdError::UnsupportedFormat {
            source_name: source.origin.clone(),
            detail: Some(format!("no backend registered for {format}")),
        })?;
        debug!("using {} backend", backend.name());

        let origin = source.origin.clone();
        let input_bytes = source.bytes.len();
        let config = self.config.clone();
        let backend_name = backend.name();

        // Backends are synchronous and may be CPU-heavy (pdfium).
        let document = tokio::task::spawn_blocking(move || backend.convert(&source, &config))
            .await
            .map_err(|e| {
                Doc2MdError::Internal(format!("{backend_name} backend task panicked: {e}"))
            })??;

        if document.is_empty() {
            warn!("{} produced no content", origin);
        }

        let mut markdown = String::new();
        if self.config.include_metadata {
            markdown.push_str(&format_yaml_front_matter(&document.metadata, &origin, format));
        }
        markdown.push_str(&document.export_to_markdown_with(&self.config.page_separator));
        let markdown = postprocess::clean_markdown(&markdown);

        let stats = ConversionStats {
            source: origin,
            format: Some(format),
            input_bytes,
            output_bytes: markdown.len(),
            block_count: document.blocks.len(),
            page_count: document.metadata.page_count,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Conversion complete: {} → {} bytes of Markdown in {}ms",
            stats.source, stats.output_bytes, stats.duration_ms
        );

        Ok(ConversionOutput {
            markdown,
            document,
            format,
            stats,
        })
    }

    fn backend_for(&self, format: InputFormat) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.accepts(format)).cloned()
    }
}

/// Convert a document file or URL to Markdown with the built-in backends.
pub async fn convert(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    DocumentConverter::new(config.clone()).convert(source).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, config))
}

/// Convert `source` and write the Markdown into `out_dir`.
///
/// See [`DocumentConverter::convert_request`].
pub async fn convert_to_dir(
    source: impl Into<String>,
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<SavedOutput, Doc2MdError> {
    let request = ConversionRequest::new(source, out_dir.as_ref());
    DocumentConverter::new(config.clone())
        .convert_request(&request)
        .await
}

//! # doc2md
//!
//! Convert a single document (HTML, Markdown, plain text, Word or PDF, from
//! a local path or an HTTP/HTTPS URL) to Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source
//!  │
//!  ├─ 1. Input    read local file or download from URL
//!  ├─ 2. Detect   override > extension > content type > magic bytes
//!  ├─ 3. Backend  html | markdown | text | docx | pdf  (spawn_blocking)
//!  ├─ 4. Render   Document → Markdown
//!  ├─ 5. Polish   7-rule post-processing (line endings, tables, whitespace)
//!  └─ 6. Output   atomic write of <stem>.md into the output directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{convert_to_dir, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let saved = convert_to_dir("report.html", "converted", &config).await?;
//!     println!("saved {}", saved.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Custom Backends
//!
//! Implement [`Backend`] and register it with
//! [`DocumentConverter::with_backend`]; it then takes precedence over the
//! built-in backend for the formats it accepts.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::Backend;
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSeparator};
pub use convert::{convert, convert_sync, convert_to_dir, DocumentConverter};
pub use document::{Block, Document, DocumentMetadata, Inline, ListItem, Table};
pub use error::Doc2MdError;
pub use format::InputFormat;
pub use output::{ConversionOutput, ConversionStats, SavedOutput};
pub use pipeline::input::SourceDocument;
pub use request::ConversionRequest;

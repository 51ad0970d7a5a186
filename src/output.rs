//! Conversion results and writing them to disk.

use crate::document::{Document, DocumentMetadata};
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of converting one document.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Final Markdown, post-processed and ending with a single newline.
    pub markdown: String,
    /// Structured form the Markdown was rendered from.
    pub document: Document,
    /// Format the source was detected (or forced) as.
    pub format: InputFormat,
    pub stats: ConversionStats,
}

/// Summary numbers for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub source: String,
    pub format: Option<InputFormat>,
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub block_count: usize,
    /// Only set for paged formats.
    pub page_count: Option<usize>,
    pub duration_ms: u64,
}

/// Where a conversion was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOutput {
    pub path: PathBuf,
    pub stats: ConversionStats,
}

/// Turn a user-supplied output directory into an existing absolute path.
///
/// A leading `~` expands to the home directory. Missing parents are created;
/// an existing directory is fine.
pub fn resolve_output_dir(dir: &Path) -> Result<PathBuf, Doc2MdError> {
    let fail = |source: std::io::Error| Doc2MdError::OutputDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let expanded = expand_home(dir);
    let absolute = std::path::absolute(&expanded).map_err(fail)?;
    std::fs::create_dir_all(&absolute).map_err(fail)?;
    let resolved = absolute.canonicalize().map_err(fail)?;
    debug!("output directory: {}", resolved.display());
    Ok(resolved)
}

fn expand_home(dir: &Path) -> PathBuf {
    let Ok(rest) = dir.strip_prefix("~") else {
        return dir.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => dir.to_path_buf(),
    }
}

/// Write `markdown` to `path` atomically, replacing any existing file.
///
/// The text goes to a temp file in the same directory which is then renamed
/// over `path`, so readers never see a half-written file.
pub fn write_markdown(path: &Path, markdown: &str) -> Result<(), Doc2MdError> {
    let fail = |source: std::io::Error| Doc2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(markdown.as_bytes()).map_err(fail)?;
    tmp.flush().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

/// Format document metadata as YAML front matter.
pub fn format_yaml_front_matter(
    meta: &DocumentMetadata,
    source: &str,
    format: InputFormat,
) -> String {
    let mut yaml = String::from("---\n");

    let fields = [
        ("title", &meta.title),
        ("author", &meta.author),
        ("subject", &meta.subject),
        ("creator", &meta.creator),
        ("producer", &meta.producer),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            yaml.push_str(&format!("{key}: \"{}\"\n", yaml_escape(v)));
        }
    }
    if let Some(pages) = meta.page_count {
        yaml.push_str(&format!("pages: {pages}\n"));
    }
    yaml.push_str(&format!("source: \"{}\"\n", yaml_escape(source)));
    yaml.push_str(&format!("format: {format}\n"));

    yaml.push_str("---\n\n");
    yaml
}

fn yaml_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', " ")
}

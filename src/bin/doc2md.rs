//! CLI binary for doc2md.
//!
//! A thin shim over the library crate: maps flags to `ConversionConfig`,
//! converts one document into the output directory and reports the result.

use anyhow::{Context, Result};
use clap::Parser;
use doc2md::request::{DEFAULT_OUT_DIR, DEFAULT_SOURCE};
use doc2md::{
    ConversionConfig, ConversionRequest, DocumentConverter, InputFormat, PageSeparator,
    SavedOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert the default source (input.html) into ./converted/
  doc2md

  # Convert a local file
  doc2md report.html --out-dir ./converted

  # Convert from URL (saved as output.md when the URL has no extension)
  doc2md https://example.com/doc --out-dir ./out

  # Word document with YAML front-matter
  doc2md --metadata minutes.docx

  # PDF with page markers and a password
  doc2md --separator comment --password s3cret paper.pdf

  # Machine-readable summary
  doc2md --json report.html

SUPPORTED FORMATS:
  html      .html .htm .xhtml
  markdown  .md .markdown
  text      .txt .text
  docx      .docx
  pdf       .pdf

ENVIRONMENT VARIABLES:
  DOC2MD_SOURCE           Default source when none is given
  DOC2MD_OUT_DIR          Default output directory
  DOC2MD_FORMAT           Force an input format
  RUST_LOG                Log filter, e.g. doc2md=debug
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

  PDFium (~30 MB) is downloaded on the first PDF conversion and cached.
"#;

/// Convert a document file or URL to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert a document file or URL to Markdown",
    long_about = "Convert one document (HTML, Markdown, plain text, Word or PDF; local file \
or HTTP/HTTPS URL) to Markdown and save it as <stem>.md inside the output directory.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    #[arg(env = "DOC2MD_SOURCE", default_value = DEFAULT_SOURCE)]
    source: String,

    /// Directory the Markdown file is written to. Created if missing.
    #[arg(long, env = "DOC2MD_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Force the input format instead of detecting it.
    #[arg(long, env = "DOC2MD_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Prepend YAML front-matter with document metadata.
    #[arg(long, env = "DOC2MD_METADATA")]
    metadata: bool,

    /// Page separator for PDFs: none, hr, comment, or custom string.
    #[arg(long, env = "DOC2MD_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2MD_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2MD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON summary (path and stats) instead of the confirmation line.
    #[arg(long, env = "DOC2MD_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Html,
    Markdown,
    Text,
    Docx,
    Pdf,
}

impl From<FormatArg> for InputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Html => InputFormat::Html,
            FormatArg::Markdown => InputFormat::Markdown,
            FormatArg::Text => InputFormat::Text,
            FormatArg::Docx => InputFormat::Docx,
            FormatArg::Pdf => InputFormat::Pdf,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(saved) => {
            if let Err(e) = report(&cli, &saved) {
                eprintln!("{}", failure_line(&e));
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", failure_line(&e));
            ExitCode::FAILURE
        }
    }
}

/// The whole error chain on one line; backend details may carry newlines.
fn failure_line(e: &anyhow::Error) -> String {
    let chain = format!("{e:#}");
    let reason = chain
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("❌  Conversion failed: {reason}")
}

async fn run(cli: &Cli) -> Result<SavedOutput> {
    let config = build_config(cli)?;
    let request = ConversionRequest::new(&cli.source, &cli.out_dir);
    let interactive = !cli.quiet && !cli.json && io::stderr().is_terminal();

    if expects_pdf(&request.source, config.format) {
        ensure_pdf_engine(interactive).await?;
    }

    let spinner = interactive.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.set_message(request.source.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = DocumentConverter::new(config)
        .convert_request(&request)
        .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    Ok(result?)
}

/// Print the success line, or the JSON summary.
fn report(cli: &Cli, saved: &SavedOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(saved).context("Failed to serialise summary")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    let path = saved.path.display().to_string();
    if io::stdout().is_terminal() {
        println!("{} saved → {}", green("✓"), path);
        eprintln!(
            "   {}",
            dim(&format!(
                "{} → {} bytes in {}ms",
                saved.stats.input_bytes, saved.stats.output_bytes, saved.stats.duration_ms
            ))
        );
    } else {
        println!("✓ saved → {path}");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .page_separator(PageSeparator::parse(&cli.separator))
        .include_metadata(cli.metadata);

    if let Some(format) = cli.format {
        builder = builder.format(format.into());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }

    builder.build().context("Invalid configuration")
}

fn expects_pdf(source: &str, forced: Option<InputFormat>) -> bool {
    match forced {
        Some(format) => format == InputFormat::Pdf,
        None => Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(InputFormat::from_extension)
            == Some(InputFormat::Pdf),
    }
}

/// Make sure the pdfium library is available before a PDF conversion,
/// showing a download bar on the first run.
async fn ensure_pdf_engine(interactive: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    let bar = interactive.then(|| {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("PDF engine");
        bar.set_message("Connecting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let progress = bar.clone();
    tokio::task::spawn_blocking(move || match progress {
        Some(bar) => pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        })),
        None => pdfium_auto::ensure_pdfium_library(None),
    })
    .await
    .context("PDF engine download task panicked")?
    .context("Failed to download PDFium engine")?;

    if let Some(bar) = bar {
        bar.finish_with_message("ready ✓");
    }
    Ok(())
}

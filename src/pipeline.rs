//! Conversion driver: localize images, render, clean up.
//!
//! The renderer that turns the rewritten markdown into a PDF lives outside
//! this crate and plugs in through the [`Renderer`] trait.
//! [`convert_document`] sequences one conversion around an
//! [`ImageProcessor`]:
//!
//! 1. fetch every remote image and rewrite the document
//! 2. log the failure summary
//! 3. hand the rewritten document to the renderer
//! 4. remove the fetched images, whether rendering succeeded or not

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::download::{CleanupReport, ImageProcessor, ProcessError};

/// Errors raised by a [`Renderer`].
#[derive(Debug, Error)]
pub enum RenderError {
    /// Output could not be written.
    #[error("cannot write rendered output to {target}: {source}")]
    Io {
        /// Output file path, or `stdout`.
        target: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The rendering backend rejected the document.
    #[error("rendering failed: {message}")]
    Backend {
        /// Backend-provided reason.
        message: String,
    },
}

impl RenderError {
    /// Creates a backend failure.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Errors that stop a conversion.
///
/// Individual image failures are not errors; they are reported in
/// [`ConversionReport::failures`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Image processing could not start.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Consumer of the rewritten markdown document.
///
/// Uses `async_trait` so renderers can be held as `Box<dyn Renderer>`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders the document. Local image paths in it stay valid until this
    /// call returns.
    async fn render(&self, document: &str) -> Result<(), RenderError>;
}

/// Renderer that writes the markdown itself to a file or stdout.
#[derive(Debug, Clone, Default)]
pub struct MarkdownWriter {
    output: Option<PathBuf>,
}

impl MarkdownWriter {
    /// Writes to `path`.
    #[must_use]
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            output: Some(path.into()),
        }
    }

    /// Writes to standard output.
    #[must_use]
    pub fn to_stdout() -> Self {
        Self { output: None }
    }

    /// Output file, `None` for stdout.
    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

#[async_trait]
impl Renderer for MarkdownWriter {
    async fn render(&self, document: &str) -> Result<(), RenderError> {
        match &self.output {
            Some(path) => tokio::fs::write(path, document)
                .await
                .map_err(|source| RenderError::Io {
                    target: path.display().to_string(),
                    source,
                }),
            None => {
                let mut stdout = tokio::io::stdout();
                let io_err = |source: std::io::Error| RenderError::Io {
                    target: "stdout".to_string(),
                    source,
                };
                stdout.write_all(document.as_bytes()).await.map_err(io_err)?;
                stdout.flush().await.map_err(io_err)
            }
        }
    }
}

/// Outcome of one [`convert_document`] call.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    /// Images fetched during the conversion, by URL.
    pub downloaded: HashMap<String, PathBuf>,
    /// Images that could not be fetched, by URL, with the reason.
    pub failures: HashMap<String, String>,
    /// Result of removing the fetched images.
    pub cleanup: CleanupReport,
}

/// Converts one markdown document.
///
/// Cleanup runs after rendering even when rendering fails; its warnings are
/// logged but never turn into an error.
///
/// # Errors
///
/// Returns [`ConvertError::Process`] when the working directory cannot be
/// prepared and [`ConvertError::Render`] when the renderer fails.
#[instrument(skip(processor, renderer, text), fields(work_dir = %processor.work_dir().display()))]
pub async fn convert_document<R>(
    processor: &ImageProcessor,
    renderer: &R,
    text: &str,
) -> Result<ConversionReport, ConvertError>
where
    R: Renderer + ?Sized,
{
    let outcome = match processor.process_document(text).await {
        Ok(document) => {
            let failures = processor.failures();
            if let Some(summary) = format_failure_summary(&failures) {
                warn!("{summary}");
            }
            renderer
                .render(&document)
                .await
                .map_err(ConvertError::from)
        }
        Err(error) => Err(ConvertError::from(error)),
    };

    let downloaded = processor.downloaded();
    let failures = processor.failures();
    let cleanup = processor.cleanup().await;
    info!(
        downloaded = downloaded.len(),
        failed = failures.len(),
        removed = cleanup.removed_files,
        "conversion finished"
    );

    outcome?;
    Ok(ConversionReport {
        downloaded,
        failures,
        cleanup,
    })
}

/// Formats failures for the user, one line per URL, sorted by URL.
///
/// Returns `None` when there is nothing to report.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use mdpdf_core::pipeline::format_failure_summary;
///
/// let mut failures = HashMap::new();
/// failures.insert("https://x.org/a.png".to_string(), "HTTP 404".to_string());
///
/// let summary = format_failure_summary(&failures).unwrap();
/// assert_eq!(
///     summary,
///     "1 remote image(s) could not be fetched:\n  - https://x.org/a.png: HTTP 404"
/// );
/// ```
#[must_use]
pub fn format_failure_summary<S: std::hash::BuildHasher>(
    failures: &HashMap<String, String, S>,
) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let mut entries: Vec<_> = failures.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut summary = format!("{} remote image(s) could not be fetched:", entries.len());
    for (url, reason) in entries {
        let _ = write!(summary, "\n  - {url}: {reason}");
    }
    Some(summary)
}

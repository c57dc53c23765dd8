//! Output for finished rulings. Each sink keys its files by the case number.
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ruling_core::StructuredDocument;
use ruling_logging::crawl_debug;
use thiserror::Error;

use crate::fetch::Fetcher;
use crate::filename::file_stem;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{FetchError, ProgressSink};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("export download failed: {0}")]
    Fetch(#[from] FetchError),
}

/// A reformatted ruling ready for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRuling {
    pub case_number: String,
    pub export_link: String,
    pub document: StructuredDocument,
}

impl RenderedRuling {
    fn stem(&self) -> Option<String> {
        if self.case_number.trim().is_empty() || self.document.sections().is_empty() {
            return None;
        }
        Some(file_stem(&self.case_number))
    }
}

#[async_trait]
pub trait DocumentSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes the ruling; `Ok(None)` when there was nothing to write.
    async fn write(&self, ruling: &RenderedRuling) -> Result<Option<PathBuf>, ExportError>;
}

/// Writes the structured text to `<stem>.txt`.
#[derive(Debug, Clone)]
pub struct TextSink {
    writer: AtomicFileWriter,
}

impl TextSink {
    pub fn new(writer: AtomicFileWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl DocumentSink for TextSink {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn write(&self, ruling: &RenderedRuling) -> Result<Option<PathBuf>, ExportError> {
        let Some(stem) = ruling.stem() else {
            return Ok(None);
        };
        let path = self
            .writer
            .write(&format!("{stem}.txt"), &ruling.document.to_text())?;
        crawl_debug!("wrote {}", path.display());
        Ok(Some(path))
    }
}

/// Downloads the portal's own export of the ruling to `<stem>.pdf`.
pub struct ExportDownloadSink {
    writer: AtomicFileWriter,
    fetcher: Arc<dyn Fetcher>,
    progress: Arc<dyn ProgressSink>,
}

impl ExportDownloadSink {
    pub fn new(
        writer: AtomicFileWriter,
        fetcher: Arc<dyn Fetcher>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            writer,
            fetcher,
            progress,
        }
    }
}

#[async_trait]
impl DocumentSink for ExportDownloadSink {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn write(&self, ruling: &RenderedRuling) -> Result<Option<PathBuf>, ExportError> {
        let Some(stem) = ruling.stem() else {
            return Ok(None);
        };
        if ruling.export_link.is_empty() {
            return Ok(None);
        }
        let output = self
            .fetcher
            .fetch(&ruling.case_number, &ruling.export_link, self.progress.as_ref())
            .await?;
        let path = self
            .writer
            .write_bytes(&format!("{stem}.pdf"), &output.bytes)?;
        crawl_debug!(
            "saved export of {} ({} bytes) to {}",
            ruling.case_number,
            output.metadata.byte_len,
            path.display()
        );
        Ok(Some(path))
    }
}

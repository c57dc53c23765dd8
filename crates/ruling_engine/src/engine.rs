//! Runs one date window end to end: search, then extract, reformat and
//! write every resolved ruling concurrently, bounded by the session pool.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use ruling_core::{DateWindow, Reformatter, RulingMetadata, RulingReformatter};
use ruling_logging::{crawl_debug, crawl_info, crawl_warn};
use thiserror::Error;

use crate::config::CrawlConfig;
use crate::extract::{ContentExtractor, ExtractError};
use crate::fetch::ReqwestFetcher;
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::pool::{PoolError, SessionPool};
use crate::search::{SearchError, SearchPipeline};
use crate::session::SessionFactory;
use crate::sinks::{DocumentSink, ExportDownloadSink, RenderedRuling, TextSink};
use crate::{CrawlEvent, NullProgressSink, ProgressSink, RunSummary};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error(transparent)]
    Output(#[from] PersistError),
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Saved,
    Skipped,
    Rejected,
    Failed,
}

pub struct Crawler {
    config: CrawlConfig,
    factory: Arc<dyn SessionFactory>,
    reformatter: Arc<dyn Reformatter>,
    sinks: Vec<Arc<dyn DocumentSink>>,
    progress: Arc<dyn ProgressSink>,
}

impl Crawler {
    /// A crawler with the standard reformatter, no sinks and no progress reporting.
    pub fn new(config: CrawlConfig, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            factory,
            reformatter: Arc::new(RulingReformatter),
            sinks: Vec::new(),
            progress: Arc::new(NullProgressSink),
        }
    }

    pub fn with_reformatter(mut self, reformatter: Arc<dyn Reformatter>) -> Self {
        self.reformatter = reformatter;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DocumentSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls `window`. The pool is drained before this returns, whether the
    /// run succeeded or not.
    pub async fn run_window(&self, window: &DateWindow) -> Result<RunSummary, RunError> {
        let pool = SessionPool::new(Arc::clone(&self.factory), self.config.pool.clone());
        let outcome = self.crawl(&pool, window).await;
        pool.drain().await;
        if let Ok(summary) = &outcome {
            crawl_info!("window {}..{} done: {summary}", window.start(), window.end());
        }
        outcome
    }

    async fn crawl(&self, pool: &SessionPool, window: &DateWindow) -> Result<RunSummary, RunError> {
        let search = SearchPipeline::new(
            pool.clone(),
            self.config.portal.clone(),
            Arc::clone(&self.progress),
        );
        let report = search.run(window).await?;

        let extractor = ContentExtractor::new(self.config.portal.document_fragment.clone());
        let outcomes = join_all(
            report
                .rulings
                .iter()
                .map(|ruling| self.process(pool, &extractor, ruling)),
        )
        .await;

        let mut summary = RunSummary {
            pages: report.pages,
            collected: report.collected,
            resolved: report.rulings.len(),
            ..RunSummary::default()
        };
        for (outcome, sink_failures) in outcomes {
            summary.sink_failures += sink_failures;
            match outcome {
                Outcome::Saved => summary.saved += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Rejected => summary.rejected += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    /// Returns the outcome and how many sinks failed for this ruling.
    async fn process(
        &self,
        pool: &SessionPool,
        extractor: &ContentExtractor,
        ruling: &RulingMetadata,
    ) -> (Outcome, usize) {
        let case_number = ruling.case_number.clone();
        let extracted = pool
            .with_session(|session| async move {
                extractor
                    .extract(session.as_ref(), ruling)
                    .await
                    .map_err(ProcessError::from)
            })
            .await;
        let content = match extracted {
            Ok(content) => content,
            Err(err) => {
                crawl_warn!("extraction failed for {case_number}: {err}");
                return (Outcome::Failed, 0);
            }
        };
        if !content.is_valid() {
            self.progress.emit(CrawlEvent::RulingSkipped { case_number });
            return (Outcome::Skipped, 0);
        }

        let document = match self.reformatter.reformat(content.raw_text()) {
            Ok(document) => document,
            Err(err) => {
                crawl_warn!("rejecting {case_number}: {err}");
                self.progress.emit(CrawlEvent::RulingRejected {
                    case_number,
                    reason: err.to_string(),
                });
                return (Outcome::Rejected, 0);
            }
        };

        let rendered = RenderedRuling {
            case_number: content.case_number().to_string(),
            export_link: content.export_link().to_string(),
            document,
        };
        let mut files = Vec::new();
        let mut failures = 0;
        for sink in &self.sinks {
            match sink.write(&rendered).await {
                Ok(Some(path)) => files.push(path),
                Ok(None) => crawl_debug!("{} sink had nothing to write for {case_number}", sink.name()),
                Err(err) => {
                    failures += 1;
                    crawl_warn!("{} sink failed for {case_number}: {err}", sink.name());
                }
            }
        }
        crawl_info!("saved {case_number} ({} files)", files.len());
        self.progress.emit(CrawlEvent::RulingSaved { case_number, files });
        (Outcome::Saved, failures)
    }
}

/// The sinks enabled in `config.output`, all writing under `destination`.
pub fn standard_sinks(
    config: &CrawlConfig,
    destination: &Path,
    progress: Arc<dyn ProgressSink>,
) -> Vec<Arc<dyn DocumentSink>> {
    let writer = AtomicFileWriter::new(destination.to_path_buf());
    let mut sinks: Vec<Arc<dyn DocumentSink>> = Vec::new();
    if config.output.write_text {
        sinks.push(Arc::new(TextSink::new(writer.clone())));
    }
    if config.output.download_export {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
        sinks.push(Arc::new(ExportDownloadSink::new(writer, fetcher, progress)));
    }
    sinks
}

/// Prepares `destination` and crawls `window` with the standard sinks.
pub async fn run_window(
    config: CrawlConfig,
    factory: Arc<dyn SessionFactory>,
    destination: PathBuf,
    window: &DateWindow,
    progress: Arc<dyn ProgressSink>,
) -> Result<RunSummary, RunError> {
    ensure_output_dir(&destination)?;
    let sinks = standard_sinks(&config, &destination, Arc::clone(&progress));
    let crawler = sinks
        .into_iter()
        .fold(Crawler::new(config, factory), Crawler::with_sink)
        .with_progress(progress);
    crawler.run_window(window).await
}

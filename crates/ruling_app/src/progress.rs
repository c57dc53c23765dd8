use ruling_engine::{CrawlEvent, ProgressSink};
use ruling_logging::{crawl_debug, crawl_info, crawl_trace};

/// Reports crawl progress through the logger.
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::PagesDiscovered { count } => crawl_info!("{count} result pages to collect"),
            CrawlEvent::PageCollected { page, entries } => {
                crawl_debug!("result page {page}: {entries} entries")
            }
            CrawlEvent::LinksResolved { resolved, dropped } => {
                crawl_info!("{resolved} rulings to fetch, {dropped} dropped")
            }
            CrawlEvent::Downloading { case_number, bytes } => {
                crawl_trace!("{case_number}: {bytes} bytes downloaded")
            }
            CrawlEvent::RulingSaved { case_number, files } => {
                crawl_debug!("{case_number} written to {} files", files.len())
            }
            CrawlEvent::RulingSkipped { case_number } => crawl_info!("skipped {case_number}"),
            CrawlEvent::RulingRejected { case_number, reason } => {
                crawl_info!("rejected {case_number}: {reason}")
            }
        }
    }
}

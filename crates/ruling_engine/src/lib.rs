//! Ruling engine: browser sessions, the session pool, the portal search
//! pipeline, content extraction and output.
mod browser;
mod config;
mod engine;
mod extract;
mod fetch;
mod filename;
pub mod fixture;
mod persist;
mod pool;
mod search;
mod session;
mod sinks;
mod types;

pub use browser::{ChromiumFactory, ChromiumSession};
pub use config::{BrowserSettings, CrawlConfig, OutputOptions, PoolConfig, PortalConfig};
pub use engine::{run_window, standard_sinks, Crawler, RunError};
pub use extract::{ContentExtractor, ExtractError};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::file_stem;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pool::{PoolError, PoolStatus, PooledSession, SessionPool};
pub use search::{SearchError, SearchPipeline, SearchReport};
pub use session::{SessionError, SessionFactory, SharedSession, WebSession};
pub use sinks::{DocumentSink, ExportDownloadSink, ExportError, RenderedRuling, TextSink};
pub use types::{
    ChannelProgressSink, CrawlEvent, FailureKind, FetchError, FetchMetadata, FetchOutput,
    NullProgressSink, ProgressSink, RunSummary,
};

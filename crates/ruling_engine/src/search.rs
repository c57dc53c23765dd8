//! The portal's search workflow for one date window: submit the query,
//! discover the result pages, collect listing entries page by page, then
//! resolve every entry's permanent link concurrently.
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use ruling_core::{
    expand_page_urls, parse_result_rows, DateWindow, DateWindowError, EraDate, ListingError,
    PaginationError, RulingMetadata,
};
use ruling_logging::{crawl_debug, crawl_info, crawl_warn};
use thiserror::Error;
use url::Url;

use crate::config::PortalConfig;
use crate::pool::{PoolError, SessionPool};
use crate::session::{SessionError, WebSession};
use crate::{CrawlEvent, ProgressSink};

pub(crate) const COURT_SELECT: &str = "#jud_court";
pub(crate) const CATEGORY_CHECKBOX: &str = "#vtype_V > input[type=checkbox]";
pub(crate) const SUBMIT_BUTTON: &str = "#btnQry";
pub(crate) const START_FIELDS: [&str; 3] = ["#dy1", "#dm1", "#dd1"];
pub(crate) const END_FIELDS: [&str; 3] = ["#dy2", "#dm2", "#dd2"];
pub(crate) const LAST_PAGE_LINK: &str = "#hlLast";
pub(crate) const COPY_LINK_ACTION: &str = "#hlCopyWeb";
pub(crate) const PERMALINK_FIELD: &str = "#txtUrl";

const VALUE_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Window(#[from] DateWindowError),
    #[error("no frame with `{0}` in its URL after submitting the query")]
    FrameNotFound(String),
    #[error("results frame has no last-page link")]
    LastPageMissing,
    #[error("unusable URL {url:?}: {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("listing link {0} is not a ruling page")]
    Unresolvable(Url),
    #[error("permanent link for {0} did not appear in time")]
    LinkTimeout(String),
}

fn parse_url(url: &str) -> Result<Url, SearchError> {
    Url::parse(url).map_err(|source| SearchError::BadUrl {
        url: url.to_string(),
        source,
    })
}

/// Court option inside the court dropdown, e.g. `#jud_court > option[value=TPS]`.
fn court_option(court: &str) -> String {
    format!("{COURT_SELECT} > option[value={court}]")
}

fn date_values(date: EraDate) -> [String; 3] {
    [
        date.year.to_string(),
        date.month.to_string(),
        date.day.to_string(),
    ]
}

/// Entries that made it through one window's search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub pages: usize,
    pub collected: usize,
    pub rulings: Vec<RulingMetadata>,
}

#[derive(Clone)]
pub struct SearchPipeline {
    pool: SessionPool,
    portal: PortalConfig,
    progress: Arc<dyn ProgressSink>,
}

impl SearchPipeline {
    pub fn new(pool: SessionPool, portal: PortalConfig, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            pool,
            portal,
            progress,
        }
    }

    /// Runs the whole search. Fails only when the result pages cannot be
    /// discovered or the pool gives out; single pages and entries degrade.
    pub async fn run(&self, window: &DateWindow) -> Result<SearchReport, SearchError> {
        let pages = self
            .pool
            .with_session(|session| async move { self.initiate(session.as_ref(), window).await })
            .await?;
        crawl_info!("query for {}..{} spans {} result pages", window.start(), window.end(), pages.len());
        self.progress.emit(CrawlEvent::PagesDiscovered { count: pages.len() });

        let mut collected = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let entries = self
                .pool
                .with_session(|session| async move {
                    Ok::<_, PoolError>(self.collect_or_skip(session.as_ref(), page).await)
                })
                .await?;
            crawl_info!("page {} of {} listed {} rulings", index + 1, pages.len(), entries.len());
            self.progress.emit(CrawlEvent::PageCollected {
                page: index + 1,
                entries: entries.len(),
            });
            collected.extend(entries);
        }

        let total = collected.len();
        let rulings: Vec<RulingMetadata> =
            join_all(collected.into_iter().map(|entry| self.resolve_or_drop(entry)))
                .await
                .into_iter()
                .flatten()
                .collect();
        crawl_info!("resolved {} of {} ruling links", rulings.len(), total);
        self.progress.emit(CrawlEvent::LinksResolved {
            resolved: rulings.len(),
            dropped: total - rulings.len(),
        });

        Ok(SearchReport {
            pages: pages.len(),
            collected: total,
            rulings,
        })
    }

    /// Submits the date-window query and expands the result pagination.
    pub async fn initiate(
        &self,
        session: &dyn WebSession,
        window: &DateWindow,
    ) -> Result<Vec<Url>, SearchError> {
        let (from, to) = window.to_era(self.portal.era_offset)?;

        session.navigate(&self.portal.entry_url).await?;
        let option = court_option(&self.portal.court);
        for selector in [COURT_SELECT, option.as_str(), CATEGORY_CHECKBOX] {
            session.wait_for(selector).await?;
        }
        session.select_option(COURT_SELECT, &self.portal.court).await?;
        session.click(CATEGORY_CHECKBOX).await?;
        let fields = START_FIELDS.iter().zip(date_values(from));
        let fields = fields.chain(END_FIELDS.iter().zip(date_values(to)));
        for (selector, value) in fields {
            session.fill_field(selector, &value).await?;
        }
        session.submit(SUBMIT_BUTTON).await?;

        let fragment = &self.portal.results_frame_fragment;
        let frame = session
            .frame_urls()
            .await?
            .into_iter()
            .find(|url| url.contains(fragment.as_str()))
            .ok_or_else(|| SearchError::FrameNotFound(fragment.clone()))?;
        crawl_debug!("results frame at {frame}");
        session.navigate(&frame).await?;

        let href = match session.read_attribute(LAST_PAGE_LINK, "href").await {
            Ok(href) => href,
            Err(SessionError::ElementNotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };
        let href = href
            .filter(|href| !href.trim().is_empty())
            .ok_or(SearchError::LastPageMissing)?;
        let base = parse_url(&session.current_url().await?)?;
        let last = base.join(href.trim()).map_err(|source| SearchError::BadUrl {
            url: href.clone(),
            source,
        })?;
        Ok(expand_page_urls(&last)?)
    }

    /// Reads every listing entry on one result page.
    pub async fn collect_page(
        &self,
        session: &dyn WebSession,
        page: &Url,
    ) -> Result<Vec<RulingMetadata>, SearchError> {
        session.navigate(page.as_str()).await?;
        let base = parse_url(&session.current_url().await?)?;
        let html = session.read_html().await?;
        Ok(parse_result_rows(&html, &base, self.portal.era_offset)?)
    }

    async fn collect_or_skip(&self, session: &dyn WebSession, page: &Url) -> Vec<RulingMetadata> {
        self.collect_page(session, page).await.unwrap_or_else(|err| {
            crawl_warn!("skipping result page {page}: {err}");
            Vec::new()
        })
    }

    /// Swaps an entry's listing link for its permanent link.
    pub async fn resolve_link(
        &self,
        session: &dyn WebSession,
        entry: RulingMetadata,
    ) -> Result<RulingMetadata, SearchError> {
        let listing = entry.link.url().clone();
        if !listing.as_str().contains(self.portal.resolvable_link_fragment.as_str()) {
            return Err(SearchError::Unresolvable(listing));
        }
        session.navigate(listing.as_str()).await?;
        session.click(COPY_LINK_ACTION).await?;

        let permanent = tokio::time::timeout(self.portal.link_read_timeout, read_permalink(session))
            .await
            .map_err(|_| SearchError::LinkTimeout(entry.case_number.clone()))??;
        Ok(entry.resolve(permanent))
    }

    async fn resolve_or_drop(&self, entry: RulingMetadata) -> Option<RulingMetadata> {
        let case_number = entry.case_number.clone();
        let resolved = self
            .pool
            .with_session(|session| async move { self.resolve_link(session.as_ref(), entry).await })
            .await;
        match resolved {
            Ok(entry) => Some(entry),
            Err(err) => {
                crawl_warn!("dropping {case_number}: {err}");
                None
            }
        }
    }
}

/// Polls the copy-link field until the portal fills it in.
async fn read_permalink(session: &dyn WebSession) -> Result<Url, SearchError> {
    loop {
        let value = session.read_value(PERMALINK_FIELD).await?;
        let value = value.trim();
        if !value.is_empty() {
            return parse_url(value);
        }
        tokio::time::sleep(VALUE_POLL).await;
    }
}

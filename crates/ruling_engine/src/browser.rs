//! Headless Chromium backend for [`WebSession`], driven over CDP.
//!
//! Each session owns one browser process with a single tab. Request
//! interception is installed when the tab opens: requests to foreign hosts
//! and heavy resource types are failed before they leave the browser.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures_util::StreamExt;
use ruling_logging::{crawl_debug, crawl_trace, crawl_warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::BrowserSettings;
use crate::session::{SessionError, SessionFactory, SharedSession, WebSession};

const ELEMENT_POLL: Duration = Duration::from_millis(100);
const FRAME_SOURCES: &str =
    "Array.from(document.querySelectorAll('iframe, frame')).map(f => f.src).filter(src => src)";

fn browser_error(err: impl std::fmt::Display) -> SessionError {
    SessionError::Browser(err.to_string())
}

/// Decides which intercepted requests may proceed.
#[derive(Debug, Clone)]
struct RequestFilter {
    allowed_host: String,
    blocked_types: Vec<String>,
}

impl RequestFilter {
    fn new(settings: &BrowserSettings) -> Self {
        Self {
            allowed_host: settings.allowed_host.clone(),
            blocked_types: settings.blocked_resource_types.clone(),
        }
    }

    fn allows(&self, url: &str, resource_type: &str) -> bool {
        let on_host = Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.eq_ignore_ascii_case(&self.allowed_host)))
            .unwrap_or(false);
        on_host
            && !self
                .blocked_types
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(resource_type))
    }
}

pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    tasks: Vec<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder().request_timeout(settings.navigation_timeout);
        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.ignore_certificate_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(SessionError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let closed = Arc::new(AtomicBool::new(false));
        let handler_closed = Arc::clone(&closed);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    crawl_debug!("browser connection ended: {err}");
                    break;
                }
            }
            handler_closed.store(true, Ordering::SeqCst);
        });

        match open_tab(&browser, settings).await {
            Ok((page, interceptor)) => {
                crawl_debug!("browser session launched");
                Ok(Self {
                    browser: Mutex::new(browser),
                    page,
                    tasks: vec![handler_task, interceptor],
                    closed,
                    navigation_timeout: settings.navigation_timeout,
                })
            }
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    crawl_warn!("failed to close half-initialized browser: {close_err}");
                }
                handler_task.abort();
                Err(err)
            }
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    async fn element(&self, selector: &str) -> Result<Element, SessionError> {
        self.ensure_open()?;
        self.page.find_element(selector).await.map_err(|err| match err {
            CdpError::NotFound => SessionError::ElementNotFound(selector.to_string()),
            other => browser_error(other),
        })
    }

    async fn assign_value(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let script = format!(
            "(() => {{ const el = document.querySelector({selector}); if (!el) return false; \
             el.value = {value}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            selector = serde_json::to_string(selector).map_err(browser_error)?,
            value = serde_json::to_string(value).map_err(browser_error)?,
        );
        let found: bool = self
            .page
            .evaluate(script)
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(browser_error)?;
        if found {
            Ok(())
        } else {
            Err(SessionError::ElementNotFound(selector.to_string()))
        }
    }
}

/// Opens the single tab and installs request interception on it.
async fn open_tab(
    browser: &Browser,
    settings: &BrowserSettings,
) -> Result<(Page, JoinHandle<()>), SessionError> {
    let page = browser.new_page("about:blank").await.map_err(browser_error)?;
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(browser_error)?;
    page.execute(EnableParams::default())
        .await
        .map_err(browser_error)?;

    let filter = RequestFilter::new(settings);
    let tab = page.clone();
    let interceptor = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let url = &event.request.url;
            let resource_type = format!("{:?}", event.resource_type);
            let verdict = if filter.allows(url, &resource_type) {
                tab.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(drop)
            } else {
                crawl_trace!("blocking {resource_type} request to {url}");
                tab.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(drop)
            };
            if let Err(err) = verdict {
                crawl_debug!("request interception failed for {url}: {err}");
            }
        }
    });
    Ok((page, interceptor))
}

#[async_trait]
impl WebSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url.to_string())).await {
            Err(_) | Ok(Err(CdpError::Timeout)) => Err(SessionError::NavigationTimeout {
                url: url.to_string(),
            }),
            Ok(Err(err)) => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            }),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn wait_for(&self, selector: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let poll = async {
            while self.page.find_element(selector).await.is_err() {
                tokio::time::sleep(ELEMENT_POLL).await;
            }
        };
        tokio::time::timeout(self.navigation_timeout, poll)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))
    }

    async fn read_text(&self, selector: &str) -> Result<String, SessionError> {
        let element = self.element(selector).await?;
        let text = element.inner_text().await.map_err(browser_error)?;
        Ok(text.unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let element = self.element(selector).await?;
        element.attribute(name).await.map_err(browser_error)
    }

    async fn read_value(&self, selector: &str) -> Result<String, SessionError> {
        let element = self.element(selector).await?;
        let value = element.property("value").await.map_err(browser_error)?;
        Ok(value
            .as_ref()
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn read_html(&self) -> Result<String, SessionError> {
        self.ensure_open()?;
        self.page.content().await.map_err(browser_error)
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let element = self.element(selector).await?;
        element.click().await.map_err(browser_error)?;
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.assign_value(selector, value).await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.assign_value(selector, value).await
    }

    async fn submit(&self, selector: &str) -> Result<(), SessionError> {
        self.click(selector).await?;
        match tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation()).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(browser_error(err)),
            Err(_) => Err(SessionError::NavigationTimeout {
                url: self.current_url().await?,
            }),
        }
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.ensure_open()?;
        let url = self.page.url().await.map_err(browser_error)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn frame_urls(&self) -> Result<Vec<String>, SessionError> {
        self.ensure_open()?;
        self.page
            .evaluate(FRAME_SOURCES)
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(browser_error)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.page.clone().close().await {
            crawl_debug!("closing tab failed: {err}");
        }
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            crawl_debug!("closing browser failed: {err}");
        }
        if let Err(err) = browser.wait().await {
            crawl_debug!("waiting for browser exit failed: {err}");
        }
        for task in &self.tasks {
            task.abort();
        }
        crawl_debug!("browser session closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Launches one headless browser per pooled session.
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    settings: BrowserSettings,
}

impl ChromiumFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn create(&self) -> Result<SharedSession, SessionError> {
        let session = ChromiumSession::launch(&self.settings).await?;
        Ok(Arc::new(session))
    }
}

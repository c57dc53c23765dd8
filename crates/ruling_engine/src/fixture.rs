//! In-memory stand-in for the portal, used to exercise the pipeline without a browser.
//!
//! A [`FixtureSite`] maps URLs to static HTML and scripts what clicks do.
//! Every [`FixtureSession`] browses the same site with its own current page,
//! form values and action log.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::session::{SessionError, SessionFactory, SharedSession, WebSession};

const BLANK: &str = "about:blank";

/// What clicking an element does on a given page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Loads another page, as a submit button or link would.
    Navigate(String),
    /// Sets the value of a form control on the current page.
    SetValue { selector: String, value: String },
}

#[derive(Debug, Default, Clone)]
pub struct FixtureSite {
    pages: HashMap<String, String>,
    timeouts: HashSet<String>,
    clicks: HashMap<(String, String), Vec<ClickEffect>>,
    close_delay: Duration,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(canonical(url), html.into());
        self
    }

    /// Navigation to `url` times out.
    pub fn timeout(mut self, url: &str) -> Self {
        self.timeouts.insert(canonical(url));
        self
    }

    pub fn on_click(mut self, url: &str, selector: &str, effect: ClickEffect) -> Self {
        self.clicks
            .entry((canonical(url), selector.to_string()))
            .or_default()
            .push(effect);
        self
    }

    /// Closing a session takes `delay`, like a browser tearing down a tab.
    pub fn slow_close(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

fn canonical(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), String::from)
}

fn parse_selector(selector: &str) -> Result<Selector, SessionError> {
    Selector::parse(selector).map_err(|_| SessionError::InvalidSelector(selector.to_string()))
}

#[derive(Debug, Default)]
struct FixtureState {
    current: Option<String>,
    values: HashMap<String, String>,
    actions: Vec<String>,
}

#[derive(Debug)]
pub struct FixtureSession {
    id: usize,
    site: Arc<FixtureSite>,
    state: Mutex<FixtureState>,
    closed: AtomicBool,
}

impl FixtureSession {
    pub fn new(id: usize, site: Arc<FixtureSite>) -> Self {
        Self {
            id,
            site,
            state: Mutex::new(FixtureState::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Everything this session did, e.g. `goto <url>`, `click #btnQry`, `fill #dy1=109`.
    pub fn actions(&self) -> Vec<String> {
        self.state().actions.clone()
    }

    /// Simulates the tab crashing or being closed from outside.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn load(&self, state: &mut FixtureState, url: &str) -> Result<(), SessionError> {
        let url = canonical(url);
        state.actions.push(format!("goto {url}"));
        if self.site.timeouts.contains(&url) {
            return Err(SessionError::NavigationTimeout { url });
        }
        if !self.site.pages.contains_key(&url) {
            return Err(SessionError::Navigation {
                url,
                reason: "no such page".to_string(),
            });
        }
        state.current = Some(url);
        state.values.clear();
        Ok(())
    }

    /// Runs `read` against the first element matching `selector` on the current page.
    fn with_element<T>(
        &self,
        selector: &str,
        read: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T, SessionError> {
        self.ensure_open()?;
        let parsed = parse_selector(selector)?;
        let state = self.state();
        let html = state
            .current
            .as_ref()
            .and_then(|url| self.site.pages.get(url))
            .map(String::as_str)
            .unwrap_or_default();
        let document = Html::parse_document(html);
        let element = document
            .select(&parsed)
            .next()
            .ok_or_else(|| SessionError::ElementNotFound(selector.to_string()))?;
        Ok(read(element))
    }

    fn assign(&self, verb: &str, selector: &str, value: &str) -> Result<(), SessionError> {
        self.with_element(selector, |_| ())?;
        let mut state = self.state();
        state.actions.push(format!("{verb} {selector}={value}"));
        state.values.insert(selector.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl WebSession for FixtureSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let mut state = self.state();
        self.load(&mut state, url)
    }

    async fn wait_for(&self, selector: &str) -> Result<(), SessionError> {
        self.with_element(selector, |_| ())
    }

    async fn read_text(&self, selector: &str) -> Result<String, SessionError> {
        self.with_element(selector, |element| {
            element.text().collect::<String>().trim().to_string()
        })
    }

    async fn read_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.with_element(selector, |element| {
            element.value().attr(name).map(str::to_string)
        })
    }

    async fn read_value(&self, selector: &str) -> Result<String, SessionError> {
        let initial = self.with_element(selector, |element| {
            element.value().attr("value").unwrap_or_default().to_string()
        })?;
        Ok(self.state().values.get(selector).cloned().unwrap_or(initial))
    }

    async fn read_html(&self) -> Result<String, SessionError> {
        self.ensure_open()?;
        let state = self.state();
        Ok(state
            .current
            .as_ref()
            .and_then(|url| self.site.pages.get(url))
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        self.with_element(selector, |_| ())?;
        let mut state = self.state();
        state.actions.push(format!("click {selector}"));
        let Some(current) = state.current.clone() else {
            return Ok(());
        };
        let effects = self
            .site
            .clicks
            .get(&(current, selector.to_string()))
            .cloned()
            .unwrap_or_default();
        for effect in effects {
            match effect {
                ClickEffect::Navigate(url) => self.load(&mut state, &url)?,
                ClickEffect::SetValue { selector, value } => {
                    state.values.insert(selector, value);
                }
            }
        }
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.assign("fill", selector, value)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.assign("select", selector, value)
    }

    async fn submit(&self, selector: &str) -> Result<(), SessionError> {
        let before = self.state().current.clone();
        self.click(selector).await?;
        let state = self.state();
        if state.current == before {
            return Err(SessionError::NavigationTimeout {
                url: before.unwrap_or_else(|| BLANK.to_string()),
            });
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.ensure_open()?;
        Ok(self
            .state()
            .current
            .clone()
            .unwrap_or_else(|| BLANK.to_string()))
    }

    async fn frame_urls(&self) -> Result<Vec<String>, SessionError> {
        self.ensure_open()?;
        let frames = parse_selector("iframe[src], frame[src]")?;
        let state = self.state();
        let Some(current) = state.current.as_ref() else {
            return Ok(Vec::new());
        };
        let Ok(base) = Url::parse(current) else {
            return Ok(Vec::new());
        };
        let html = self.site.pages.get(current).map(String::as_str).unwrap_or_default();
        let document = Html::parse_document(html);
        Ok(document
            .select(&frames)
            .filter_map(|frame| frame.value().attr("src"))
            .filter_map(|src| base.join(src).ok())
            .map(String::from)
            .collect())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if !self.site.close_delay.is_zero() {
            tokio::time::sleep(self.site.close_delay).await;
        }
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out [`FixtureSession`]s over one shared site and remembers them.
#[derive(Debug)]
pub struct FixtureFactory {
    site: Arc<FixtureSite>,
    created: Mutex<Vec<Arc<FixtureSession>>>,
    failures_left: AtomicUsize,
}

impl FixtureFactory {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            created: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
        }
    }

    /// The next `count` creations fail as if the browser would not launch.
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn created(&self) -> Vec<Arc<FixtureSession>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionFactory for FixtureFactory {
    async fn create(&self) -> Result<SharedSession, SessionError> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SessionError::Browser("browser failed to launch".to_string()));
        }
        let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
        let session = Arc::new(FixtureSession::new(created.len(), Arc::clone(&self.site)));
        created.push(Arc::clone(&session));
        Ok(session)
    }
}

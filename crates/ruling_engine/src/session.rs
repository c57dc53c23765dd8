//! The browser capability surface the crawl pipeline is written against.
//!
//! Pipeline stages only talk to a [`WebSession`]; the chromium backend and
//! the in-memory fixture both implement it.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("no element matches `{0}`")]
    ElementNotFound(String),
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("session is closed")]
    Closed,
    #[error("browser error: {0}")]
    Browser(String),
}

impl SessionError {
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            SessionError::NavigationTimeout { .. } | SessionError::Navigation { .. }
        )
    }
}

/// One automated browser tab.
///
/// All methods operate on the document currently loaded in the tab. Frames
/// are not entered in place: callers read [`WebSession::frame_urls`] and
/// navigate to the frame document directly.
#[async_trait]
pub trait WebSession: Send + Sync {
    /// Loads `url` and waits for the document to be ready.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Waits until an element matching `selector` exists.
    async fn wait_for(&self, selector: &str) -> Result<(), SessionError>;

    /// Rendered text of the first element matching `selector`.
    async fn read_text(&self, selector: &str) -> Result<String, SessionError>;

    /// Raw attribute value, `None` when the element lacks the attribute.
    async fn read_attribute(&self, selector: &str, name: &str)
        -> Result<Option<String>, SessionError>;

    /// Current `value` of a form control.
    async fn read_value(&self, selector: &str) -> Result<String, SessionError>;

    /// Serialized markup of the whole document.
    async fn read_html(&self) -> Result<String, SessionError>;

    async fn click(&self, selector: &str) -> Result<(), SessionError>;

    async fn fill_field(&self, selector: &str, value: &str) -> Result<(), SessionError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError>;

    /// Clicks `selector` and waits for the resulting navigation.
    async fn submit(&self, selector: &str) -> Result<(), SessionError>;

    async fn current_url(&self) -> Result<String, SessionError>;

    /// Absolute URLs of every frame embedded in the current document.
    async fn frame_urls(&self) -> Result<Vec<String>, SessionError>;

    fn is_closed(&self) -> bool;

    /// Releases the tab and its browser. Idempotent.
    async fn close(&self);
}

pub type SharedSession = Arc<dyn WebSession>;

/// Creates ready-to-use sessions for the pool.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> Result<SharedSession, SessionError>;
}

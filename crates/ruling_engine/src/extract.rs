use ruling_core::{RulingContent, RulingMetadata};
use ruling_logging::crawl_warn;
use thiserror::Error;
use url::Url;

use crate::session::{SessionError, WebSession};

pub(crate) const EXPORT_ANCHOR: &str = "#hlExportPDF";
pub(crate) const RULING_TEXT: &str = "#jud";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("expected a ruling page, landed on {0}")]
    UnexpectedPage(String),
    #[error("export link missing on {0}")]
    MissingExportLink(String),
}

/// Pulls the raw text and export link from a resolved ruling's page.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    document_fragment: String,
}

impl ContentExtractor {
    /// `document_fragment` is the path piece every ruling page URL carries.
    pub fn new(document_fragment: impl Into<String>) -> Self {
        Self {
            document_fragment: document_fragment.into(),
        }
    }

    /// A page that fails to load yields [`RulingContent::empty`] so the caller
    /// can skip the ruling; a page that loads but lacks the expected elements
    /// is an error.
    pub async fn extract(
        &self,
        session: &dyn WebSession,
        ruling: &RulingMetadata,
    ) -> Result<RulingContent, ExtractError> {
        let link = ruling.link.url().as_str();
        match session.navigate(link).await {
            Ok(()) => {}
            Err(err) if err.is_navigation() => {
                crawl_warn!("skipping {}: {err}", ruling.case_number);
                return Ok(RulingContent::empty());
            }
            Err(err) => return Err(err.into()),
        }

        let current = session.current_url().await?;
        if !current.contains(self.document_fragment.as_str()) {
            return Err(ExtractError::UnexpectedPage(current));
        }

        let href = match session.read_attribute(EXPORT_ANCHOR, "href").await {
            Ok(href) => href,
            Err(SessionError::ElementNotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };
        let href = href
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ExtractError::MissingExportLink(current.clone()))?;
        let export_link = Url::parse(&current)
            .and_then(|base| base.join(&href))
            .map(String::from)
            .unwrap_or(href);

        let text = session.read_text(RULING_TEXT).await?;
        Ok(RulingContent::new(
            ruling.case_number.clone(),
            text,
            export_link,
        ))
    }
}

use chrono::NaiveDate;
use url::Url;

use crate::era::{to_era, EraDate, EraDateError};

/// Inclusive calendar range submitted to the portal search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateWindowError {
    #[error("window start {start} is after end {end}")]
    Reversed { start: NaiveDate, end: NaiveDate },
    #[error(transparent)]
    Era(#[from] EraDateError),
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if start > end {
            return Err(DateWindowError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Both bounds in the portal's local era. Only used when filling the form.
    pub fn to_era(&self, offset: i32) -> Result<(EraDate, EraDate), DateWindowError> {
        Ok((to_era(self.start, offset)?, to_era(self.end, offset)?))
    }
}

/// Where a ruling's link currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulingLink {
    /// Temporary link scraped from a results page.
    Listing(Url),
    /// Permanent document link obtained through the portal's copy action.
    Resolved(Url),
}

impl RulingLink {
    pub fn url(&self) -> &Url {
        match self {
            RulingLink::Listing(url) | RulingLink::Resolved(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulingMetadata {
    pub case_number: String,
    pub ruling_date: NaiveDate,
    pub document_size_bytes: u64,
    pub subject_reason: String,
    pub link: RulingLink,
}

impl RulingMetadata {
    pub fn is_resolved(&self) -> bool {
        matches!(self.link, RulingLink::Resolved(_))
    }

    /// Replaces the listing link with the permanent one.
    pub fn resolve(self, permanent: Url) -> Self {
        Self {
            link: RulingLink::Resolved(permanent),
            ..self
        }
    }
}

/// Raw text scraped from one ruling page.
///
/// An empty case number or empty text is the "skip" sentinel; downstream
/// consumers ignore such records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RulingContent {
    case_number: String,
    raw_text: String,
    export_link: String,
}

impl RulingContent {
    pub fn new(
        case_number: impl Into<String>,
        raw_text: impl Into<String>,
        export_link: impl Into<String>,
    ) -> Self {
        Self {
            case_number: case_number.into(),
            raw_text: raw_text.into(),
            export_link: export_link.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        !self.case_number.is_empty() && !self.raw_text.is_empty()
    }

    pub fn case_number(&self) -> &str {
        &self.case_number
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn export_link(&self) -> &str {
        &self.export_link
    }
}

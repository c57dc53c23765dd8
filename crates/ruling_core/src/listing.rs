//! Parsing of the portal's search-results table.
//!
//! The table interleaves a hidden summary row after every visible entry and
//! starts with a header row, so entries sit at the odd positional indices.
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::era::{parse_era_date, EraDateError};
use crate::model::{RulingLink, RulingMetadata};

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#jud > tbody > tr").expect("static selector"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("results table not found")]
    MissingTable,
    #[error("row {row}: expected at least 4 cells, found {found}")]
    MissingCells { row: usize, found: usize },
    #[error("row {row}: case-number anchor missing")]
    MissingAnchor { row: usize },
    #[error("row {row}: anchor has no href")]
    MissingHref { row: usize },
    #[error("row {row}: unresolvable link {href:?}")]
    BadLink { row: usize, href: String },
    #[error("row {row}: size text {text:?} has no parenthesized figure")]
    BadSize { row: usize, text: String },
    #[error("row {row}: {source}")]
    BadDate { row: usize, source: EraDateError },
}

/// Keeps only the items at odd positional index (1, 3, 5, ...).
pub fn odd_rows<T>(rows: impl IntoIterator<Item = T>) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter(|(index, _)| index % 2 == 1)
        .map(|(_, row)| row)
        .collect()
}

/// Parses a size cell such as `108台抗487（12K）` into bytes (kilobytes * 1024).
pub fn parse_size_bytes(text: &str) -> Option<u64> {
    let open = text.rfind('（')?;
    let close = text.rfind('）')?;
    let inner = text.get(open + '（'.len_utf8()..close)?;
    let digits: String = inner
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<u64>().ok()?.checked_mul(1024)
}

/// Parses every visible entry of the results table found in `html`.
///
/// `base` is the results page URL; relative links resolve against it. A
/// single malformed row fails the whole page.
pub fn parse_result_rows(
    html: &str,
    base: &Url,
    era_offset: i32,
) -> Result<Vec<RulingMetadata>, ListingError> {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef> = document.select(&ROW_SELECTOR).collect();
    if rows.is_empty() {
        return Err(ListingError::MissingTable);
    }

    odd_rows(rows.into_iter().enumerate())
        .into_iter()
        .map(|(index, row)| parse_row(index, row, base, era_offset))
        .collect()
}

fn parse_row(
    index: usize,
    row: ElementRef,
    base: &Url,
    era_offset: i32,
) -> Result<RulingMetadata, ListingError> {
    let cells: Vec<ElementRef> = row.children().filter_map(ElementRef::wrap).collect();
    if cells.len() < 4 {
        return Err(ListingError::MissingCells {
            row: index,
            found: cells.len(),
        });
    }

    let anchor = cells[1]
        .children()
        .filter_map(ElementRef::wrap)
        .next()
        .ok_or(ListingError::MissingAnchor { row: index })?;
    let case_number = collapse_text(anchor);
    let href = anchor
        .value()
        .attr("href")
        .ok_or(ListingError::MissingHref { row: index })?;
    let link = base.join(href).map_err(|_| ListingError::BadLink {
        row: index,
        href: href.to_string(),
    })?;

    let size_text = collapse_text(cells[1]);
    let document_size_bytes =
        parse_size_bytes(&size_text).ok_or_else(|| ListingError::BadSize {
            row: index,
            text: size_text.clone(),
        })?;

    let ruling_date = parse_era_date(&collapse_text(cells[2]), era_offset)
        .map_err(|source| ListingError::BadDate { row: index, source })?;

    Ok(RulingMetadata {
        case_number,
        ruling_date,
        document_size_bytes,
        subject_reason: collapse_text(cells[3]),
        link: RulingLink::Listing(link),
    })
}

fn collapse_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

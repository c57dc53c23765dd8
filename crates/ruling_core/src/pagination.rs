use url::Url;

const PAGE_PARAM: &str = "page";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("last-page link has no `page` parameter: {0}")]
    MissingPageCount(String),
    #[error("last-page link has an invalid page count {value:?}: {url}")]
    InvalidPageCount { url: String, value: String },
}

/// Reads the page count from the "last page" link and builds one URL per page.
///
/// Every other query parameter keeps its position and value; only `page` is
/// rewritten to 1..=N.
pub fn expand_page_urls(last_page: &Url) -> Result<Vec<Url>, PaginationError> {
    let pairs: Vec<(String, String)> = last_page.query_pairs().into_owned().collect();
    let value = pairs
        .iter()
        .find(|(key, _)| key == PAGE_PARAM)
        .map(|(_, value)| value.clone())
        .ok_or_else(|| PaginationError::MissingPageCount(last_page.to_string()))?;
    let count: usize = match value.trim().parse() {
        Ok(count) if count >= 1 => count,
        _ => {
            return Err(PaginationError::InvalidPageCount {
                url: last_page.to_string(),
                value,
            })
        }
    };

    let urls = (1..=count)
        .map(|index| {
            let mut url = last_page.clone();
            let page = index.to_string();
            url.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(key, value)| {
                if key == PAGE_PARAM {
                    (key.as_str(), page.as_str())
                } else {
                    (key.as_str(), value.as_str())
                }
            }));
            url
        })
        .collect();
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_page_parameter_fails_whole_expansion() {
        let url = Url::parse("https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc").unwrap();
        assert!(matches!(
            expand_page_urls(&url),
            Err(PaginationError::MissingPageCount(_))
        ));
    }

    #[test]
    fn zero_or_garbage_page_count_is_invalid() {
        for raw in ["page=0", "page=abc", "page="] {
            let url = Url::parse(&format!("https://portal.test/list.aspx?{raw}")).unwrap();
            assert!(matches!(
                expand_page_urls(&url),
                Err(PaginationError::InvalidPageCount { .. })
            ));
        }
    }
}

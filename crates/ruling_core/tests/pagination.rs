use pretty_assertions::assert_eq;
use ruling_core::{expand_page_urls, PaginationError};
use url::Url;

fn page_of(url: &Url) -> String {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

#[test]
fn three_pages_from_last_page_link() {
    let last =
        Url::parse("https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc&page=3&sort=DS")
            .unwrap();
    let urls: Vec<String> = expand_page_urls(&last)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc&page=1&sort=DS",
            "https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc&page=2&sort=DS",
            "https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc&page=3&sort=DS",
        ]
    );
}

#[test]
fn every_page_count_yields_that_many_urls_with_other_params_intact() {
    for count in 1..=25usize {
        let last = Url::parse(&format!(
            "https://portal.test/FJUD/qryresultlst.aspx?q=%E6%B0%91%E4%BA%8B&page={count}&gy=jcourt"
        ))
        .unwrap();
        let urls = expand_page_urls(&last).unwrap();
        assert_eq!(urls.len(), count);
        for (index, url) in urls.iter().enumerate() {
            assert_eq!(page_of(url), (index + 1).to_string());
            assert_eq!(url.path(), last.path());
            let others: Vec<(String, String)> = url
                .query_pairs()
                .into_owned()
                .filter(|(key, _)| key != "page")
                .collect();
            assert_eq!(
                others,
                vec![
                    ("q".to_string(), "民事".to_string()),
                    ("gy".to_string(), "jcourt".to_string()),
                ]
            );
        }
    }
}

#[test]
fn missing_page_count_is_an_error() {
    let last = Url::parse("https://portal.test/FJUD/qryresultlst.aspx?q=abc").unwrap();
    assert_eq!(
        expand_page_urls(&last),
        Err(PaginationError::MissingPageCount(last.to_string()))
    );
}

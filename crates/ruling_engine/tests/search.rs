mod common;

use std::sync::Arc;

use common::*;
use pretty_assertions::assert_eq;
use ruling_core::{PaginationError, RulingLink};
use ruling_engine::fixture::{ClickEffect, FixtureFactory, FixtureSession, FixtureSite};
use ruling_engine::{
    ChannelProgressSink, CrawlEvent, NullProgressSink, PoolConfig, PortalConfig, SearchError,
    SearchPipeline, SessionPool,
};
use url::Url;

fn pipeline(site: FixtureSite) -> (SearchPipeline, Arc<FixtureFactory>) {
    let factory = Arc::new(FixtureFactory::new(site));
    let pool = SessionPool::new(factory.clone(), PoolConfig::default());
    let search = SearchPipeline::new(pool, PortalConfig::default(), Arc::new(NullProgressSink));
    (search, factory)
}

/// The search form and results shell, with `frame` served as the results frame.
fn search_only(frame: Option<String>) -> FixtureSite {
    let site = FixtureSite::new()
        .page(ENTRY, SEARCH_FORM)
        .on_click(ENTRY, "#btnQry", ClickEffect::Navigate(RESULTS.to_string()));
    match frame {
        Some(html) => site.page(RESULTS, RESULTS_SHELL).page(FRAME, html),
        None => site.page(RESULTS, "<html><body><p>查詢結果</p></body></html>"),
    }
}

#[tokio::test]
async fn january_2020_expands_to_three_result_pages() {
    init_logging();
    let (search, _factory) = pipeline(portal(""));
    let session = FixtureSession::new(0, Arc::new(portal("")));

    let pages = search.initiate(&session, &january_2020()).await.unwrap();
    let pages: Vec<String> = pages.into_iter().map(String::from).collect();
    assert_eq!(pages, vec![page_url(1), page_url(2), page_url(3)]);
    assert!(pages[0].ends_with("page=1"));
    assert!(pages[2].ends_with("page=3"));

    let actions = session.actions();
    let form: Vec<&str> = actions
        .iter()
        .map(String::as_str)
        .filter(|action| !action.starts_with("goto"))
        .collect();
    assert_eq!(
        form,
        vec![
            "select #jud_court=TPS",
            "click #vtype_V > input[type=checkbox]",
            "fill #dy1=109",
            "fill #dm1=1",
            "fill #dd1=1",
            "fill #dy2=109",
            "fill #dm2=1",
            "fill #dd2=31",
            "click #btnQry",
        ]
    );
}

#[tokio::test]
async fn search_degrades_per_page_and_per_entry() {
    init_logging();
    let factory = Arc::new(FixtureFactory::new(portal("")));
    let pool = SessionPool::new(factory.clone(), PoolConfig::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let search = SearchPipeline::new(
        pool.clone(),
        PortalConfig::default(),
        Arc::new(ChannelProgressSink::new(tx)),
    );

    let report = search.run(&january_2020()).await.unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(report.collected, 3);
    assert_eq!(report.rulings.len(), 1);

    let ruling = &report.rulings[0];
    assert_eq!(ruling.case_number, CASE_A1);
    assert_eq!(
        ruling.link,
        RulingLink::Resolved(Url::parse(PERMALINK_A1).unwrap())
    );

    assert_eq!(
        drain_events(&mut rx),
        vec![
            CrawlEvent::PagesDiscovered { count: 3 },
            CrawlEvent::PageCollected { page: 1, entries: 2 },
            CrawlEvent::PageCollected { page: 2, entries: 0 },
            CrawlEvent::PageCollected { page: 3, entries: 1 },
            CrawlEvent::LinksResolved {
                resolved: 1,
                dropped: 2
            },
        ]
    );
    assert_eq!(pool.status().borrowed, 0);
}

#[tokio::test]
async fn listing_links_outside_the_document_path_are_unresolvable() {
    let (search, _factory) = pipeline(portal(""));
    let session = FixtureSession::new(0, Arc::new(portal("")));
    let listed = ruling_core::parse_result_rows(
        &results_page(&[entry_row(2, "printData.aspx?id=A2", "A2", "109.01.16")]),
        &Url::parse(FRAME).unwrap(),
        ruling_core::DEFAULT_ERA_OFFSET,
    )
    .unwrap();

    let err = search
        .resolve_link(&session, listed[0].clone())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Unresolvable(_)));
    assert!(session.actions().is_empty());
}

#[tokio::test]
async fn permanent_link_that_never_appears_times_out() {
    let (search, _factory) = pipeline(portal(""));
    let session = FixtureSession::new(0, Arc::new(portal("")));
    let listed = ruling_core::parse_result_rows(
        &results_page(&[entry_row(3, "data.aspx?ty=JD&id=A3", "A3", "109.01.20")]),
        &Url::parse(FRAME).unwrap(),
        ruling_core::DEFAULT_ERA_OFFSET,
    )
    .unwrap();

    let err = search
        .resolve_link(&session, listed[0].clone())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::LinkTimeout(case) if case == "A3"));
}

#[tokio::test]
async fn missing_last_page_link_fails_the_window() {
    let (search, _factory) = pipeline(search_only(Some(
        "<html><body><p>共 0 筆</p></body></html>".to_string(),
    )));
    let err = search.run(&january_2020()).await.unwrap_err();
    assert!(matches!(err, SearchError::LastPageMissing));
}

#[tokio::test]
async fn last_page_link_without_a_page_count_fails_the_window() {
    let (search, _factory) = pipeline(search_only(Some(frame_with_last_page(
        "qryresultlst.aspx?ty=JUDBOOK&q=abc",
    ))));
    let err = search.run(&january_2020()).await.unwrap_err();
    assert!(matches!(
        err,
        SearchError::Pagination(PaginationError::MissingPageCount(_))
    ));
}

#[tokio::test]
async fn results_without_the_listing_frame_fail_the_window() {
    let (search, _factory) = pipeline(search_only(None));
    let err = search.run(&january_2020()).await.unwrap_err();
    assert!(matches!(err, SearchError::FrameNotFound(fragment) if fragment == "qryresultlst.aspx"));
}

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use ruling_core::{parse_result_rows, ListingError, RulingLink, DEFAULT_ERA_OFFSET};
use url::Url;

fn base() -> Url {
    Url::parse("https://portal.test/FJUD/qryresultlst.aspx?ty=JUDBOOK&page=1").unwrap()
}

fn entry(number: usize, href: &str, date: &str, reason: &str) -> String {
    format!(
        r#"<tr><td>{number}.</td><td><a href="{href}">最高法院 108 年度台抗字第 {number} 號民事裁定</a>（{number}K）</td><td>{date}</td><td>{reason}</td></tr>
<tr class="summary"><td colspan="4">摘要</td></tr>"#
    )
}

fn table(rows: &[String]) -> String {
    format!(
        r#"<html><body><table id="jud"><tbody>
<tr><th>序號</th><th>裁判字號</th><th>裁判日期</th><th>裁判案由</th></tr>
{}
</tbody></table></body></html>"#,
        rows.join("\n")
    )
}

#[test]
fn visible_entries_are_parsed_and_summaries_skipped() {
    let html = table(&[
        entry(1, "data.aspx?ty=JD&id=A1", "108.07.10", "聲請拍賣抵押物強制執行"),
        entry(2, "/FJUD/data.aspx?ty=JD&id=A2", "108.7.22", "確認債權不存在"),
    ]);
    let rows = parse_result_rows(&html, &base(), DEFAULT_ERA_OFFSET).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].case_number, "最高法院 108 年度台抗字第 1 號民事裁定");
    assert_eq!(rows[0].ruling_date, NaiveDate::from_ymd_opt(2019, 7, 10).unwrap());
    assert_eq!(rows[0].document_size_bytes, 1024);
    assert_eq!(rows[0].subject_reason, "聲請拍賣抵押物強制執行");
    assert_eq!(
        rows[0].link,
        RulingLink::Listing(Url::parse("https://portal.test/FJUD/data.aspx?ty=JD&id=A1").unwrap())
    );
    assert!(!rows[0].is_resolved());

    assert_eq!(rows[1].document_size_bytes, 2 * 1024);
    assert_eq!(rows[1].ruling_date, NaiveDate::from_ymd_opt(2019, 7, 22).unwrap());
}

#[test]
fn header_only_table_has_no_entries() {
    let rows = parse_result_rows(&table(&[]), &base(), DEFAULT_ERA_OFFSET).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn page_without_table_is_rejected() {
    assert_eq!(
        parse_result_rows("<html><body><p>查無資料</p></body></html>", &base(), DEFAULT_ERA_OFFSET),
        Err(ListingError::MissingTable)
    );
}

#[test]
fn malformed_date_fails_the_page() {
    let html = table(&[entry(1, "data.aspx?id=1", "not-a-date", "x")]);
    assert!(matches!(
        parse_result_rows(&html, &base(), DEFAULT_ERA_OFFSET),
        Err(ListingError::BadDate { row: 1, .. })
    ));
}

#[test]
fn oversized_size_figure_fails_the_page() {
    let html = table(&[
        entry(1, "data.aspx?id=1", "108.07.10", "x"),
        entry(18014398509481984, "data.aspx?id=2", "108.07.11", "y"),
    ]);
    assert!(matches!(
        parse_result_rows(&html, &base(), DEFAULT_ERA_OFFSET),
        Err(ListingError::BadSize { row: 3, .. })
    ));
}

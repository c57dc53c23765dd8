//! A scripted copy of the portal for the search and crawl tests.
#![allow(dead_code)]

use std::sync::Once;

use chrono::NaiveDate;
use ruling_core::DateWindow;
use ruling_engine::fixture::{ClickEffect, FixtureSite};
use ruling_engine::CrawlEvent;
use tokio::sync::mpsc::UnboundedReceiver;

pub const ENTRY: &str = "https://law.judicial.gov.tw/FJUD/Default_AD.aspx";
pub const RESULTS: &str = "https://law.judicial.gov.tw/FJUD/qryresult.aspx?kw=all";
pub const FRAME: &str = "https://law.judicial.gov.tw/FJUD/qryresultlst.aspx?ty=JUDBOOK&q=abc";

pub const LISTING_A1: &str = "https://law.judicial.gov.tw/FJUD/data.aspx?ty=JD&id=A1";
pub const LISTING_A3: &str = "https://law.judicial.gov.tw/FJUD/data.aspx?ty=JD&id=A3";
pub const PERMALINK_A1: &str = "https://law.judicial.gov.tw/FJUD/data.aspx?ty=JD&id=TPSV-109-1";

pub const CASE_A1: &str = "最高法院 109 年度台抗字第 1 號民事裁定";

pub const SHORT_RULING: &str = "裁判字號：
最高法院109年度台抗字第1號民事裁定
裁判日期：
民國109年01月15日
裁判案由：
確認債權不存在
最高法院民事裁定　　　109年度台抗字第1號
抗告人　王大明
相對人　李小華
上列當事人間確認債權不存在事件，抗告人對於中華民國108年12月
2日臺灣高等法院裁定，提起抗告，本院裁定如下：
    主  文
抗告駁回。
抗告訴訟費用由抗告人負擔。
    理  由
本件抗告人主張原裁定違背法令，
惟查原法院認事用法並無違誤（見原審卷第3
頁）。
據上論結，本件抗告為無理由，裁定如主文。
中    華    民    國   109    年    1     月    15    日
最高法院民事第一庭
審判長法官  張  三
法官  李  四
";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(ruling_logging::initialize_for_tests);
}

pub fn january_2020() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
    )
    .unwrap()
}

pub fn page_url(page: usize) -> String {
    format!("{FRAME}&page={page}")
}

pub fn drain_events(rx: &mut UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub const SEARCH_FORM: &str = r#"<html><body><form>
<select id="jud_court"><option value="">全部</option><option value="TPS">最高法院</option></select>
<div id="vtype_V"><input type="checkbox" value="V"><label>民事</label></div>
<input id="dy1"><input id="dm1"><input id="dd1">
<input id="dy2"><input id="dm2"><input id="dd2">
<input id="btnQry" type="submit" value="送出查詢">
</form></body></html>"#;

pub const RESULTS_SHELL: &str = r#"<html><body>
<iframe id="iframe-nav" src="about:blank"></iframe>
<iframe id="iframe-data" src="qryresultlst.aspx?ty=JUDBOOK&amp;q=abc"></iframe>
</body></html>"#;

pub fn frame_with_last_page(href: &str) -> String {
    format!(r#"<html><body><a id="hlLast" href="{href}">最末頁</a></body></html>"#)
}

pub fn entry_row(number: usize, href: &str, case: &str, date: &str) -> String {
    format!(
        r#"<tr><td>{number}.</td><td><a href="{href}">{case}</a>（{number}K）</td><td>{date}</td><td>確認債權不存在</td></tr>
<tr class="summary"><td colspan="4">摘要</td></tr>"#
    )
}

pub fn results_page(rows: &[String]) -> String {
    format!(
        r#"<html><body><table id="jud"><tbody>
<tr><th>序號</th><th>裁判字號</th><th>裁判日期</th><th>裁判案由</th></tr>
{}
</tbody></table></body></html>"#,
        rows.join("\n")
    )
}

/// A listing page as the portal serves it before the permanent link is copied.
pub fn listing_page() -> String {
    r##"<html><body><a id="hlCopyWeb" href="#">複製網址</a><input id="txtUrl" value=""></body></html>"##
        .to_string()
}

pub fn document_page(text: &str, export_href: &str) -> String {
    format!(
        r#"<html><body><a id="hlExportPDF" href="{export_href}">轉存PDF</a><div id="jud"><pre>{text}</pre></div></body></html>"#
    )
}

/// The portal for January 2020: three result pages.
///
/// Page 1 lists a resolvable ruling (A1) and a print-view link that is not a
/// ruling page. Page 2 times out. Page 3 lists a ruling (A3) whose permanent
/// link never appears.
pub fn portal(export_href: &str) -> FixtureSite {
    let page_one = results_page(&[
        entry_row(1, "data.aspx?ty=JD&id=A1", CASE_A1, "109.01.15"),
        entry_row(2, "printData.aspx?id=A2", "最高法院 109 年度台抗字第 2 號民事裁定", "109.01.16"),
    ]);
    let page_three = results_page(&[entry_row(
        3,
        "data.aspx?ty=JD&id=A3",
        "最高法院 109 年度台抗字第 3 號民事裁定",
        "109.01.20",
    )]);

    FixtureSite::new()
        .page(ENTRY, SEARCH_FORM)
        .on_click(ENTRY, "#btnQry", ClickEffect::Navigate(RESULTS.to_string()))
        .page(RESULTS, RESULTS_SHELL)
        .page(FRAME, frame_with_last_page("qryresultlst.aspx?ty=JUDBOOK&q=abc&page=3"))
        .page(&page_url(1), page_one)
        .timeout(&page_url(2))
        .page(&page_url(3), page_three)
        .page(LISTING_A1, listing_page())
        .on_click(
            LISTING_A1,
            "#hlCopyWeb",
            ClickEffect::SetValue {
                selector: "#txtUrl".to_string(),
                value: PERMALINK_A1.to_string(),
            },
        )
        .page(LISTING_A3, listing_page())
        .page(PERMALINK_A1, document_page(SHORT_RULING, export_href))
}

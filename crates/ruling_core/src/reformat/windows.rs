//! The six reformatting windows.
//!
//! Each window consumes lines from the cursor up to its landmark and feeds
//! them through a rule table: rules are tried in order and the first whose
//! predicate holds owns the line. A line no rule claims is dropped.
use std::sync::LazyLock;

use regex::Regex;
use ruling_logging::crawl_trace;

use super::cursor::ScanCursor;
use super::rules::{
    cjk_latin_spacing, end_of_line_cleanup, merge_closure_marks, paragraph_breaks,
};
use super::{Landmark, ReformatError};
use crate::document::{Section, SectionKind};

pub(crate) const PETITIONER_MARKERS: [&str; 3] = ["再抗告人", "抗告人", "聲請人"];
pub(crate) const FOREGOING_MARKER: &str = "上列";
pub(crate) const HOLDING_MARKER: &str = "主文";
pub(crate) const REASONING_MARKER: &str = "理由";
pub(crate) const RULING_PHRASES: [&str; 2] = ["裁定如主文。", "判決如主文。"];
/// Longest line still read as a heading such as `事實及理由`.
const HEADING_MAX_CHARS: usize = 6;
const JOINT_PREFIX: &str = "共同";
const LIST_ITEM: &str = "- ";

static COURT_RULING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("本院.+：").expect("static regex"));
static INLINE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(.{1,10})：(.+)$").expect("static regex"));
static ROLE_DETAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(.{2,8}人)(.{2,50})$").expect("static regex"));
static JUDGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(.*)法官(.+)$").expect("static regex"));

struct Rule<A> {
    name: &'static str,
    matches: fn(&A, &str) -> bool,
    apply: fn(&mut A, &str),
}

fn classify<A>(acc: &mut A, rules: &[Rule<A>], line: &str) {
    match rules.iter().find(|rule| (rule.matches)(acc, line)) {
        Some(rule) => {
            crawl_trace!("reformat rule {} claims {:?}", rule.name, line);
            (rule.apply)(acc, line);
        }
        None => crawl_trace!("reformat drops {:?}", line),
    }
}

fn bracket(label: &str, value: &str) -> String {
    format!("【{label}】 {value}")
}

fn always<A>(_: &A, _: &str) -> bool {
    true
}

// --- 1. header ---------------------------------------------------------

#[derive(Default)]
struct HeaderAcc {
    pending_label: Option<String>,
    lines: Vec<String>,
}

static HEADER_RULES: [Rule<HeaderAcc>; 4] = [
    Rule {
        name: "label value",
        matches: |acc, _| acc.pending_label.is_some(),
        apply: |acc, line| {
            if let Some(label) = acc.pending_label.take() {
                acc.lines.push(bracket(&label, line));
            }
        },
    },
    Rule {
        name: "already bracketed",
        matches: |_, line| line.contains('【'),
        apply: |acc, line| acc.lines.push(line.to_owned()),
    },
    Rule {
        name: "inline label",
        matches: |_, line| INLINE_LABEL.is_match(line),
        apply: |acc, line| {
            if let Some(caps) = INLINE_LABEL.captures(line) {
                acc.lines.push(bracket(&caps[1], &caps[2]));
            }
        },
    },
    Rule {
        name: "label",
        matches: |_, line| line.ends_with('：') && line.chars().count() > 1,
        apply: |acc, line| acc.pending_label = Some(line.trim_end_matches('：').to_owned()),
    },
];

fn starts_with_petitioner(line: &str) -> bool {
    PETITIONER_MARKERS.iter().any(|marker| line.starts_with(marker))
}

/// Case metadata up to the first petitioner line, reshaped to `【label】 value`.
pub(super) fn header(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    let mut acc = HeaderAcc::default();
    loop {
        let Some(line) = cursor.peek() else {
            return Err(ReformatError::MissingMarker(Landmark::Petitioner));
        };
        // A label's value line is never a terminator, even if it names a party role.
        if acc.pending_label.is_none() && starts_with_petitioner(line) {
            break;
        }
        if let Some(line) = cursor.advance() {
            classify(&mut acc, &HEADER_RULES, &line);
        }
    }
    Ok(Section::new(SectionKind::Header, acc.lines))
}

// --- 2. parties --------------------------------------------------------

#[derive(Default)]
struct PartiesAcc {
    carry: Option<String>,
    lines: Vec<String>,
}

impl PartiesAcc {
    fn joined(&self, line: &str) -> String {
        match &self.carry {
            Some(prefix) => format!("{prefix}{line}"),
            None => line.to_owned(),
        }
    }

    fn last_is_bracketed(&self) -> bool {
        self.lines.last().is_some_and(|last| last.contains('【'))
    }
}

static PARTIES_RULES: [Rule<PartiesAcc>; 4] = [
    Rule {
        name: "joint prefix",
        matches: |_, line| line.ends_with(JOINT_PREFIX) && line.chars().count() <= 4,
        apply: |acc, line| acc.carry = Some(acc.joined(line)),
    },
    Rule {
        name: "role detail",
        matches: |acc, line| ROLE_DETAIL.is_match(&acc.joined(line)),
        apply: |acc, line| {
            let joined = acc.joined(line);
            acc.carry = None;
            if let Some(caps) = ROLE_DETAIL.captures(&joined) {
                acc.lines.push(bracket(&caps[1], &caps[2]));
            }
        },
    },
    Rule {
        name: "continuation",
        matches: |acc, _| acc.last_is_bracketed(),
        apply: |acc, line| {
            let joined = acc.joined(line);
            acc.carry = None;
            if let Some(last) = acc.lines.last_mut() {
                last.push(' ');
                last.push_str(&joined);
            }
        },
    },
    Rule {
        name: "orphan",
        matches: always,
        apply: |acc, line| {
            let joined = acc.joined(line);
            acc.carry = None;
            acc.lines.push(joined);
        },
    },
];

/// Party lines up to the `上列` sentence, one bracketed role per line.
pub(super) fn parties(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    let end = cursor
        .find(|line| line.contains(FOREGOING_MARKER))
        .ok_or(ReformatError::MissingMarker(Landmark::Foregoing))?;
    let mut acc = PartiesAcc::default();
    for line in cursor.take_until(end) {
        classify(&mut acc, &PARTIES_RULES, &line);
    }
    if let Some(carry) = acc.carry.take() {
        acc.lines.push(carry);
    }
    Ok(Section::new(SectionKind::Parties, acc.lines))
}

// --- 3. synopsis -------------------------------------------------------

/// The introductory paragraph through the `本院...：` line.
pub(super) fn synopsis(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    let end = cursor
        .find(|line| COURT_RULING_LINE.is_match(line))
        .ok_or(ReformatError::MissingMarker(Landmark::CourtRuling))?;
    let text = cursor.take_until(end + 1).join("\n");
    let text = paragraph_breaks(&text);
    let text = merge_closure_marks(&text);
    let text = end_of_line_cleanup(&text);
    let text = cjk_latin_spacing(&text);
    Ok(Section::new(SectionKind::Synopsis, split_lines(&text)))
}

// --- 4. holding --------------------------------------------------------

#[derive(Default)]
struct HoldingAcc {
    lines: Vec<String>,
}

static HOLDING_RULES: [Rule<HoldingAcc>; 2] = [
    Rule {
        name: "holding heading",
        matches: |acc, _| acc.lines.is_empty(),
        apply: |acc, line| {
            acc.lines
                .push(line.replacen(HOLDING_MARKER, &format!("【{HOLDING_MARKER}】"), 1))
        },
    },
    Rule {
        name: "holding item",
        matches: always,
        apply: |acc, line| acc.lines.push(format!("{LIST_ITEM}{line}")),
    },
];

fn is_reasoning_heading(line: &str) -> bool {
    line.contains(REASONING_MARKER) && line.chars().count() <= HEADING_MAX_CHARS
}

/// `主文` and its items, up to the reasoning heading.
pub(super) fn holding(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    if cursor.peek() != Some(HOLDING_MARKER) {
        return Err(ReformatError::MissingMarker(Landmark::Holding));
    }
    let end = cursor
        .find(is_reasoning_heading)
        .ok_or(ReformatError::MissingMarker(Landmark::Reasoning))?;
    let mut acc = HoldingAcc::default();
    for line in cursor.take_until(end) {
        classify(&mut acc, &HOLDING_RULES, &line);
    }
    Ok(Section::new(SectionKind::Holding, acc.lines))
}

// --- 5. reasoning ------------------------------------------------------

#[derive(Default)]
struct ReasoningAcc {
    heading_seen: bool,
    lines: Vec<String>,
}

static REASONING_RULES: [Rule<ReasoningAcc>; 2] = [
    Rule {
        name: "reasoning heading",
        matches: |acc, line| !acc.heading_seen && line.contains(REASONING_MARKER),
        apply: |acc, line| {
            acc.heading_seen = true;
            if is_reasoning_heading(line) {
                acc.lines.push(format!("【{line}】"));
                return;
            }
            let (before, after) = line.split_once(REASONING_MARKER).unwrap_or((line, ""));
            if !before.is_empty() {
                acc.lines.push(before.to_owned());
            }
            acc.lines.push(format!("【{REASONING_MARKER}】"));
            if !after.is_empty() {
                acc.lines.push(after.to_owned());
            }
        },
    },
    Rule {
        name: "reasoning text",
        matches: always,
        apply: |acc, line| acc.lines.push(line.to_owned()),
    },
];

/// Byte offset just past the earliest ruling phrase in `line`.
fn ruling_phrase_end(line: &str) -> Option<usize> {
    RULING_PHRASES
        .iter()
        .filter_map(|phrase| line.find(phrase).map(|at| at + phrase.len()))
        .min()
}

/// The reasoning through `裁定如主文。`; anything after the phrase on the same
/// line is left for the signatures window.
pub(super) fn reasoning(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    let end = cursor
        .find(|line| ruling_phrase_end(line).is_some())
        .ok_or(ReformatError::MissingMarker(Landmark::RulingPhrase))?;
    let split_at = cursor.line(end).and_then(ruling_phrase_end);
    if let Some(at) = split_at {
        cursor.split_line(end, at);
    }
    let mut acc = ReasoningAcc::default();
    for line in cursor.take_until(end + 1) {
        classify(&mut acc, &REASONING_RULES, &line);
    }
    let text = acc.lines.join("\n");
    let text = merge_closure_marks(&text);
    let text = end_of_line_cleanup(&text);
    let text = cjk_latin_spacing(&text);
    let text = paragraph_breaks(&text);
    Ok(Section::new(SectionKind::Reasoning, split_lines(&text)))
}

// --- 6. signatures -----------------------------------------------------

#[derive(Default)]
struct SignaturesAcc {
    date_dropped: bool,
    lines: Vec<String>,
}

static SIGNATURE_RULES: [Rule<SignaturesAcc>; 4] = [
    Rule {
        name: "separator",
        matches: |acc, line| !acc.date_dropped && line.trim().is_empty(),
        apply: |_, _| {},
    },
    Rule {
        name: "ruling date",
        matches: |acc, _| !acc.date_dropped,
        apply: |acc, _| acc.date_dropped = true,
    },
    Rule {
        name: "judge",
        matches: |_, line| JUDGE_LINE.is_match(line),
        apply: |acc, line| {
            if let Some(caps) = JUDGE_LINE.captures(line) {
                acc.lines
                    .push(cjk_latin_spacing(&bracket(&format!("{}法官", &caps[1]), &caps[2])));
            }
        },
    },
    Rule {
        name: "signature text",
        matches: always,
        apply: |acc, line| acc.lines.push(cjk_latin_spacing(line)),
    },
];

/// Everything after the ruling phrase, minus the ruling-date line.
pub(super) fn signatures(cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    let mut acc = SignaturesAcc::default();
    for line in cursor.take_rest() {
        classify(&mut acc, &SIGNATURE_RULES, &line);
    }
    Ok(Section::new(SectionKind::Signatures, acc.lines))
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cursor(lines: &[&str]) -> ScanCursor {
        ScanCursor::new(&lines.join("\n"))
    }

    #[test]
    fn header_reshapes_label_lines_and_drops_the_rest() {
        let mut c = cursor(&[
            "裁判字號：",
            "最高法院108年台抗字第487號民事裁定",
            "裁判案由：",
            "聲請人選任特別代理人",
            "最高法院民事裁定108年度台抗字第487號",
            "聲請人王大明",
        ]);
        let section = header(&mut c).unwrap();
        assert_eq!(
            section.lines,
            vec![
                "【裁判字號】 最高法院108年台抗字第487號民事裁定",
                "【裁判案由】 聲請人選任特別代理人",
            ]
        );
        assert_eq!(c.peek(), Some("聲請人王大明"));
    }

    #[test]
    fn parties_merge_joint_prefix_and_continuations() {
        let mut c = cursor(&[
            "再抗告人鄭鴻滄",
            "鄭鴻忠",
            "共同",
            "代理人李秉哲律師",
            "上列再抗告人因與高秀英間",
        ]);
        let section = parties(&mut c).unwrap();
        assert_eq!(
            section.lines,
            vec!["【再抗告人】 鄭鴻滄 鄭鴻忠", "【共同代理人】 李秉哲律師"]
        );
    }

    #[test]
    fn holding_brackets_heading_and_lists_items() {
        let mut c = cursor(&["主文", "再抗告駁回。", "再抗告程序費用由再抗告人負擔。", "理由"]);
        let section = holding(&mut c).unwrap();
        assert_eq!(
            section.lines,
            vec!["【主文】", "- 再抗告駁回。", "- 再抗告程序費用由再抗告人負擔。"]
        );
        assert_eq!(c.peek(), Some("理由"));
    }

    #[test]
    fn combined_facts_and_reasoning_heading_ends_the_holding() {
        let mut c = cursor(&["主文", "原告之訴駁回。", "事實及理由", "原告主張無據，判決如主文。"]);
        let section = holding(&mut c).unwrap();
        assert_eq!(section.lines, vec!["【主文】", "- 原告之訴駁回。"]);
        assert_eq!(c.peek(), Some("事實及理由"));

        let section = reasoning(&mut c).unwrap();
        assert_eq!(section.lines, vec!["【事實及理由】", "原告主張無據，判決如主文。"]);
    }

    #[test]
    fn prose_mentioning_reasoning_does_not_end_the_holding() {
        let mut c = cursor(&["主文", "本件抗告為無理由應予駁回。", "理由"]);
        let section = holding(&mut c).unwrap();
        assert_eq!(section.lines, vec!["【主文】", "- 本件抗告為無理由應予駁回。"]);
    }

    #[test]
    fn reasoning_stops_right_after_the_ruling_phrase() {
        let mut c = cursor(&["理由", "本件再抗告為無理由，裁定如主文。", "中華民國108年7月10日"]);
        let section = reasoning(&mut c).unwrap();
        assert_eq!(section.lines, vec!["【理由】", "本件再抗告為無理由，裁定如主文。"]);
        assert_eq!(c.peek(), Some(""));
    }

    #[test]
    fn signatures_drop_date_and_bracket_judges() {
        let mut c = cursor(&["", "中華民國108年7月10日", "最高法院民事第二庭", "審判長法官陳重瑜", "法官吳謀焰"]);
        let section = signatures(&mut c).unwrap();
        assert_eq!(
            section.lines,
            vec!["最高法院民事第二庭", "【審判長法官】 陳重瑜", "【法官】 吳謀焰"]
        );
    }

    #[test]
    fn ruling_phrase_end_picks_earliest_phrase() {
        let line = "判決如主文。裁定如主文。";
        assert_eq!(ruling_phrase_end(line), Some("判決如主文。".len()));
        assert_eq!(ruling_phrase_end("無"), None);
    }
}

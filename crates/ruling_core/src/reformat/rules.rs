//! Text-level sub-rules shared by several reformatting windows.
//!
//! Each rule is a pure `&str -> String` transform.
use std::sync::LazyLock;

use regex::Regex;

/// Stands in for a protected sentence-final break during end-of-line cleanup.
const PROTECTED_BREAK: char = '\u{E000}';

/// Ideographs plus the CJK punctuation that takes part in spacing.
const CJK_CLASS: &str = r"[\p{Han}\x{3001}\x{3003}-\x{303F}()（）]";
/// ASCII word characters, dots and the placeholder glyph used for redacted digits.
const LATIN_CLASS: &str = r"[.0-9A-Za-z_○]+";

static CJK_THEN_LATIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("({CJK_CLASS})({LATIN_CLASS})")).expect("static regex")
});
static LATIN_THEN_CJK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("({LATIN_CLASS})({CJK_CLASS})")).expect("static regex")
});
static SOFT_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{Han}0-9A-Za-z_（）：、，○])\n").expect("static regex")
});
static CLOSER_ON_NEW_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+([）)」』】〕，,])").expect("static regex"));

/// Unifies line endings, comma variants and horizontal whitespace, and drops
/// blank lines.
///
/// The portal pads text with spaces for justification, so all horizontal
/// whitespace is removed; spacing is reintroduced later where it carries meaning.
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .filter(|c| !matches!(c, ' ' | '\t' | '\u{3000}' | '\u{00A0}'))
            .map(|c| match c {
                '\u{FF0C}' | '\u{FE10}' | '\u{FE50}' => '，',
                other => other,
            })
            .collect();
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&cleaned);
    }
    out
}

/// Rejoins lines the portal wrapped mid-sentence.
///
/// Breaks after a sentence-final `。` survive; a break preceded by an
/// ideograph, ASCII word character or one of `（）：、，○` is removed.
pub fn end_of_line_cleanup(text: &str) -> String {
    let protected = text.replace("。\n", &format!("。{PROTECTED_BREAK}"));
    let joined = SOFT_BREAK.replace_all(&protected, "$1");
    joined.replace(PROTECTED_BREAK, "\n")
}

/// Puts one space between ideographs and adjacent runs of Latin letters,
/// digits, dots or `○`, in both directions.
pub fn cjk_latin_spacing(text: &str) -> String {
    let first = CJK_THEN_LATIN.replace_all(text, "$1 $2");
    LATIN_THEN_CJK.replace_all(&first, "$1 $2").into_owned()
}

/// Pulls a closing bracket or comma that starts a line back onto the previous line.
pub fn merge_closure_marks(text: &str) -> String {
    CLOSER_ON_NEW_LINE.replace_all(text, "$1").into_owned()
}

/// Inserts a blank line after every line ending in `。`.
pub fn paragraph_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();
    let mut previous = None;
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\n' && previous == Some('。') && chars.peek() != Some(&'\n') {
            out.push('\n');
        }
        previous = Some(c);
    }
    out
}

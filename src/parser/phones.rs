use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use tracing::debug;

use super::text::clean;

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/|,;]").unwrap());
// ex: 07 69 35 39 09, 27.22.44.10.11, 0769353909
static PHONE_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}(?:[\s./-]?\d{2}){3,}").unwrap());
static TRAILING_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/|;,]\s*$").unwrap());
static LEADING_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[/|;,]").unwrap());
static TEL_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bTEL\s*[.:]\s*").unwrap());

const LONG_NUMBER: usize = 10;
const SHORT_NUMBER: usize = 8;

/// Phone numbers found in a text plus the digit fragments that could not be
/// read as a number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneScan {
    pub phones: Vec<String>,
    pub dropped: Vec<String>,
}

/// Split on `/ | , ;`, keep the digits of each fragment, accept 8 or 10 digit
/// fragments as-is and cut longer runs into 10-digit blocks (plus one final
/// 8-digit block). Deduplicated in first-seen order.
pub fn scan_phones(text: &str) -> PhoneScan {
    let mut found = Vec::new();
    let mut dropped = Vec::new();

    for fragment in SEPARATOR_RE.split(text) {
        let digits: String = fragment.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            0 => {}
            SHORT_NUMBER | LONG_NUMBER => found.push(digits),
            n if n > LONG_NUMBER => split_long_run(&digits, &mut found, &mut dropped),
            _ => dropped.push(digits),
        }
    }

    PhoneScan {
        phones: found.into_iter().unique().collect(),
        dropped,
    }
}

pub fn extract_phones(text: &str) -> Vec<String> {
    scan_phones(text).phones
}

/// Unseparated concatenations like `07693539090509098877`. Greedy on purpose:
/// 10-digit blocks first, then a single 8-digit tail.
fn split_long_run(digits: &str, found: &mut Vec<String>, dropped: &mut Vec<String>) {
    let mut rest = digits;
    while rest.len() >= LONG_NUMBER {
        let (head, tail) = rest.split_at(LONG_NUMBER);
        found.push(head.to_string());
        rest = tail;
    }
    match rest.len() {
        0 => {}
        SHORT_NUMBER => found.push(rest.to_string()),
        n => {
            debug!("Ignored {n}-digit number fragment: {rest}");
            dropped.push(rest.to_string());
        }
    }
}

pub fn looks_like_phone(text: &str) -> bool {
    PHONE_LIKE_RE.is_match(text)
}

/// What remains of a line once phone-like runs, dangling separators and
/// `TEL.` labels are removed.
pub fn strip_phones(line: &str) -> String {
    let cleaned = PHONE_LIKE_RE.replace_all(line, " ");
    let cleaned = TEL_LABEL_RE.replace_all(&cleaned, " ");
    let cleaned = TRAILING_SEP_RE.replace(&cleaned, "");
    let cleaned = LEADING_SEP_RE.replace(&cleaned, "");
    clean(&cleaned)
}

use std::sync::LazyLock;

use regex::Regex;

// PDF text extraction glues the last token of a page to the next page's header.
static PAGE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d)(SEMAINE)").unwrap());
static PURE_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d\s./-]+$").unwrap());

/// Collapse all whitespace (non-breaking spaces included) to single spaces and
/// split page-break concatenations like `BUS 04SEMAINE` back apart.
pub fn clean(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return collapsed;
    }
    PAGE_BREAK_RE.replace_all(&collapsed, "$1 $2").into_owned()
}

/// Strip French diacritics so `FÉVRIER` and `FEVRIER` compare equal.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'À' | 'Â' | 'Ä' => 'A',
            'à' | 'â' | 'ä' => 'a',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'Î' | 'Ï' => 'I',
            'î' | 'ï' => 'i',
            'Ô' | 'Ö' => 'O',
            'ô' | 'ö' => 'o',
            'Û' | 'Ü' | 'Ù' => 'U',
            'û' | 'ü' | 'ù' => 'u',
            'Ç' => 'C',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Registry key for an area label: case and whitespace folded.
pub fn fold_label(label: &str) -> String {
    clean(label).to_uppercase()
}

/// Upper-cased, accent-free form used for keyword lookups.
pub fn keyword_form(s: &str) -> String {
    fold_accents(&s.to_uppercase())
}

pub fn is_pure_digits(line: &str) -> bool {
    PURE_DIGITS_RE.is_match(line)
}

pub fn is_upper_case(line: &str) -> bool {
    line == line.to_uppercase()
}

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::text::keyword_form;
use crate::error::ParseError;

// Every layout allows an optional day-of-week word before each day number and
// the ordinal "1ER": "SEMAINE DU SAMEDI 07 AU VENDREDI 13 FEVRIER 2026".

/// (c) "DU 02 MARS 2019 AU 08 MARS 2019": two independent dates.
static FULL_DATES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)SEMAINE\s+DU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+(\p{L}+)\s+(\d{4})\s+AU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+(\p{L}+)\s+(\d{4})",
    )
    .unwrap()
});

/// (b) "DU 28 FEVRIER AU 06 MARS 2026": shared year.
static SHARED_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)SEMAINE\s+DU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+(\p{L}+)\s+AU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+(\p{L}+)\s+(\d{4})",
    )
    .unwrap()
});

/// (a) "DU 07 AU 13 FEVRIER 2026": shared month and year.
static SHARED_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)SEMAINE\s+DU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+AU\s+(?:\p{L}+\s+)?(\d{1,2})(?:ER)?\s+(\p{L}+)\s+(\d{4})",
    )
    .unwrap()
});

/// Web page phrasing: "Semaine du 07/02/2026 au 13/02/2026".
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Semaine\s+du\s+(\d{2}/\d{2}/\d{4})\s+au\s+(\d{2}/\d{2}/\d{4})").unwrap()
});

/// One duty week, start <= end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Month names of the document's language, keyed by their accent-free
/// upper-case spelling.
#[derive(Debug, Clone)]
pub struct MonthTable {
    names: HashMap<String, u32>,
}

impl MonthTable {
    pub fn french() -> Self {
        let names = [
            ("JANVIER", 1),
            ("FEVRIER", 2),
            ("MARS", 3),
            ("AVRIL", 4),
            ("MAI", 5),
            ("JUIN", 6),
            ("JUILLET", 7),
            ("AOUT", 8),
            ("SEPTEMBRE", 9),
            ("OCTOBRE", 10),
            ("NOVEMBRE", 11),
            ("DECEMBRE", 12),
        ]
        .into_iter()
        .map(|(name, month)| (name.to_string(), month))
        .collect();
        MonthTable { names }
    }

    /// Extra spellings (abbreviations, typos seen in the wild). Out-of-range
    /// month numbers are ignored.
    pub fn with_aliases(mut self, aliases: &HashMap<String, u32>) -> Self {
        for (name, &month) in aliases {
            if (1..=12).contains(&month) {
                self.names.insert(keyword_form(name.trim()), month);
            }
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.names.get(&keyword_form(name)).copied()
    }

    fn month(&self, name: &str) -> Result<u32, ParseError> {
        self.lookup(name)
            .ok_or_else(|| ParseError::UnknownMonth(name.to_string()))
    }
}

impl Default for MonthTable {
    fn default() -> Self {
        MonthTable::french()
    }
}

/// Try the three named layouts, most specific first. `Ok(None)` means the line
/// is not a week header; a header naming an unknown month or an impossible day
/// is an error.
pub fn parse_week_range(line: &str, months: &MonthTable) -> Result<Option<WeekRange>, ParseError> {
    if let Some(caps) = FULL_DATES_RE.captures(line) {
        return full_dates(&caps, months).map(Some);
    }
    if let Some(caps) = SHARED_YEAR_RE.captures(line) {
        return shared_year(&caps, months).map(Some);
    }
    if let Some(caps) = SHARED_MONTH_RE.captures(line) {
        return shared_month(&caps, months).map(Some);
    }
    Ok(None)
}

/// Web headings: the numeric phrasing first, then the named layouts.
pub fn parse_any_week_range(text: &str, months: &MonthTable) -> Result<Option<WeekRange>, ParseError> {
    if let Some(caps) = NUMERIC_RE.captures(text) {
        let start = numeric_date(&caps[1])?;
        let end = numeric_date(&caps[2])?;
        return ordered(start, end).map(Some);
    }
    parse_week_range(text, months)
}

/// Cheap presence check for structure monitoring; never resolves months.
pub fn looks_like_week_header(text: &str) -> bool {
    NUMERIC_RE.is_match(text)
        || FULL_DATES_RE.is_match(text)
        || SHARED_YEAR_RE.is_match(text)
        || SHARED_MONTH_RE.is_match(text)
}

fn full_dates(caps: &Captures, months: &MonthTable) -> Result<WeekRange, ParseError> {
    let start = date(number(&caps[3])?, months.month(&caps[2])?, number(&caps[1])?)?;
    let end = date(number(&caps[6])?, months.month(&caps[5])?, number(&caps[4])?)?;
    ordered(start, end)
}

fn shared_year(caps: &Captures, months: &MonthTable) -> Result<WeekRange, ParseError> {
    let year = number(&caps[5])?;
    let start_month = months.month(&caps[2])?;
    let start_day = number(&caps[1])?;
    let end = date(year, months.month(&caps[4])?, number(&caps[3])?)?;
    let mut start = date(year, start_month, start_day)?;
    if start > end {
        // "DU 29 DECEMBRE AU 04 JANVIER 2026": the year belongs to the end date.
        start = date(year - 1, start_month, start_day)?;
    }
    Ok(WeekRange { start, end })
}

fn shared_month(caps: &Captures, months: &MonthTable) -> Result<WeekRange, ParseError> {
    let year = number(&caps[4])?;
    let month = months.month(&caps[3])?;
    let start_day: u32 = number(&caps[1])?;
    let end_day: u32 = number(&caps[2])?;
    let end = date(year, month, end_day)?;
    let start = if start_day > end_day {
        // "DU 28 AU 06 MARS 2026": the month belongs to the end date.
        let (prev_year, prev_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
        date(prev_year, prev_month, start_day)?
    } else {
        date(year, month, start_day)?
    };
    Ok(WeekRange { start, end })
}

fn ordered(start: NaiveDate, end: NaiveDate) -> Result<WeekRange, ParseError> {
    if start > end {
        return Err(ParseError::InvalidDate(format!("week starts after it ends: {start} > {end}")));
    }
    Ok(WeekRange { start, end })
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, ParseError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ParseError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
}

fn numeric_date(raw: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").map_err(|_| ParseError::InvalidDate(raw.to_string()))
}

fn number<T: std::str::FromStr>(digits: &str) -> Result<T, ParseError> {
    digits
        .parse()
        .map_err(|_| ParseError::InvalidDate(digits.to_string()))
}

impl WeekRange {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

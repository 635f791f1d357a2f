use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::dates::{parse_week_range, MonthTable, WeekRange};
use super::phones::{looks_like_phone, scan_phones, strip_phones, PhoneScan};
use super::text::{clean, is_pure_digits, is_upper_case, keyword_form};
use crate::error::ParseError;
use crate::metrics::ParseReport;
use crate::record::{phones_display, Area, AreaIndex, Period, PharmacyEntry};

static PHARMACY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:PHCIE|PHARMACIE)\s+\S").unwrap());
// "ABENGOUROU PHCIE DU MARCHE / MME ..." (bulletins for the interior)
static CITY_PHARMACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\p{L}[\p{L}\s-]{2,}?)\s+(PHCIE|PHARMACIE)\s+\S").unwrap()
});
static NAME_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*–\s*|\s+-\s*|\s*/\s*|\bTEL\b").unwrap());
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{L}+").unwrap());

const PHARMACY_KEYWORDS: [&str; 2] = ["PHCIE", "PHARMACIE"];
const BOILERPLATE_PREFIXES: [&str; 3] = ["SECTION", "PERMANENCE", "TOUR DE GARDE"];
const RESERVED_PREFIXES: [&str; 8] = [
    "UNION", "GARDE", "SEMAINE", "PERMANENCE", "SECTION", "TOUR", "TEL", "N°",
];
// Accent-free; tokens are folded before lookup.
const ADDRESS_KEYWORDS: &[&str] = &[
    "ROUTE", "CARREFOUR", "AVENUE", "BD", "BOULEVARD", "FACE", "PRES", "DERRIERE", "ARRET",
    "RUE", "LOT", "IMMEUBLE", "VILLA", "CITE", "CAMP", "MARCHE", "STATION", "QUARTIER", "PLACE",
    "ROND", "ENTRE", "APRES", "DEVANT",
];
const MAX_AREA_LEN: usize = 50;
const MIN_CITY_LEN: usize = 3;

/// What a bulletin line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRole {
    Date(WeekRange),
    Noise(Noise),
    Area(String),
    PharmacyHeader {
        city: Option<String>,
        name: String,
        phones: PhoneScan,
    },
    Continuation(Continuation),
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noise {
    BeforeFirstWeek,
    Boilerplate,
}

/// Detail line for the last pharmacy of the current area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    Phone {
        phones: PhoneScan,
        address: Option<String>,
    },
    Address(String),
}

/// The parts of the parse state the rules are allowed to look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub week_open: bool,
    pub area_open: bool,
    pub has_pharmacy: bool,
}

type RuleFn = fn(&str, Cursor, &MonthTable) -> Result<Option<LineRole>, ParseError>;

struct Rule {
    name: &'static str,
    apply: RuleFn,
}

/// Evaluated top to bottom; the first rule that returns a role consumes the line.
const RULES: &[Rule] = &[
    Rule { name: "week", apply: week_header },
    Rule { name: "pre_week", apply: before_first_week },
    Rule { name: "boilerplate", apply: boilerplate },
    Rule { name: "area", apply: area_header },
    Rule { name: "city_pharmacy", apply: city_pharmacy },
    Rule { name: "pharmacy", apply: plain_pharmacy },
    Rule { name: "continuation", apply: continuation },
];

pub fn classify_line(line: &str, cursor: Cursor, months: &MonthTable) -> Result<LineRole, ParseError> {
    for rule in RULES {
        if let Some(role) = (rule.apply)(line, cursor, months)? {
            trace!(rule = rule.name, "{line}");
            return Ok(role);
        }
    }
    Ok(LineRole::Unclassified)
}

fn week_header(line: &str, _: Cursor, months: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    Ok(parse_week_range(line, months)?.map(LineRole::Date))
}

fn before_first_week(_: &str, cursor: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    Ok((!cursor.week_open).then_some(LineRole::Noise(Noise::BeforeFirstWeek)))
}

fn boilerplate(line: &str, _: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    let upper = line.to_uppercase();
    let is_boilerplate = BOILERPLATE_PREFIXES.iter().any(|p| upper.starts_with(p));
    Ok(is_boilerplate.then_some(LineRole::Noise(Noise::Boilerplate)))
}

fn area_header(line: &str, _: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    Ok(looks_like_area(line).then(|| LineRole::Area(line.to_string())))
}

fn city_pharmacy(line: &str, _: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    let Some(caps) = CITY_PHARMACY_RE.captures(line) else {
        return Ok(None);
    };
    let Some(keyword) = caps.get(2) else {
        return Ok(None);
    };
    let city = clean(&caps[1]).to_uppercase();
    if city.chars().count() < MIN_CITY_LEN || has_address_keyword(&city) {
        return Ok(None);
    }
    Ok(Some(pharmacy_header(Some(city), &line[keyword.start()..], line)))
}

fn plain_pharmacy(line: &str, cursor: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    if !cursor.area_open || !PHARMACY_RE.is_match(line) {
        return Ok(None);
    }
    Ok(Some(pharmacy_header(None, line, line)))
}

fn continuation(line: &str, cursor: Cursor, _: &MonthTable) -> Result<Option<LineRole>, ParseError> {
    if !cursor.has_pharmacy {
        return Ok(None);
    }
    let detail = if looks_like_phone(line) {
        let residual = strip_phones(line);
        let address = (!residual.is_empty() && !is_pure_digits(&residual)).then_some(residual);
        Continuation::Phone {
            phones: scan_phones(line),
            address,
        }
    } else {
        Continuation::Address(line.to_string())
    };
    Ok(Some(LineRole::Continuation(detail)))
}

fn pharmacy_header(city: Option<String>, from_keyword: &str, line: &str) -> LineRole {
    LineRole::PharmacyHeader {
        city,
        name: pharmacy_name(from_keyword),
        phones: scan_phones(line),
    }
}

/// Name up to the first ` - `, `–`, `/` or `TEL` token.
pub fn pharmacy_name(text: &str) -> String {
    let head = NAME_END_RE.split(text).next().unwrap_or(text);
    clean(head)
}

/// Area headers are short upper-case lines that are neither a header, a
/// pharmacy, an address nor a run of digits and separators. A label needs at
/// least one letter.
pub fn looks_like_area(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }
    let upper = line.to_uppercase();
    if RESERVED_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return false;
    }
    if PHARMACY_KEYWORDS.iter().any(|k| upper.contains(k)) {
        return false;
    }
    if has_address_keyword(&upper) {
        return false;
    }
    if line.chars().count() > MAX_AREA_LEN {
        return false;
    }
    if is_pure_digits(line) || !line.chars().any(char::is_alphabetic) {
        return false;
    }
    is_upper_case(line)
}

fn has_address_keyword(text: &str) -> bool {
    WORD_RE
        .find_iter(text)
        .any(|word| ADDRESS_KEYWORDS.contains(&keyword_form(word.as_str()).as_str()))
}

/// Per-call state: the weeks built so far, the open area of the last week and
/// the label index of that week.
#[derive(Debug, Default)]
struct BulletinState {
    weeks: Vec<Period>,
    current_area: Option<usize>,
    areas: AreaIndex,
}

impl BulletinState {
    fn cursor(&self) -> Cursor {
        let area = self.current_area();
        Cursor {
            week_open: !self.weeks.is_empty(),
            area_open: area.is_some(),
            has_pharmacy: area.is_some_and(|a| !a.pharmacies.is_empty()),
        }
    }

    fn current_area(&self) -> Option<&Area> {
        let idx = self.current_area?;
        self.weeks.last()?.areas.get(idx)
    }

    fn current_area_mut(&mut self) -> Option<&mut Area> {
        let idx = self.current_area?;
        self.weeks.last_mut()?.areas.get_mut(idx)
    }

    fn apply(&mut self, role: LineRole, line: &str, report: &mut ParseReport) {
        match role {
            LineRole::Date(range) => self.enter_week(range, report),
            LineRole::Noise(Noise::BeforeFirstWeek) => report.ignored_pre_week += 1,
            LineRole::Noise(Noise::Boilerplate) => report.skipped += 1,
            LineRole::Area(label) => {
                self.open_area(&label);
                report.area += 1;
                debug!("    [AREA] {label}");
            }
            LineRole::PharmacyHeader { city, name, phones } => {
                self.add_pharmacy(city, name, phones, line, report)
            }
            LineRole::Continuation(detail) => self.continue_pharmacy(detail, line, report),
            LineRole::Unclassified => {
                debug!("    [???] {line}");
                report.record_unclassified(line);
            }
        }
    }

    /// Same dates as the last week means the header was repeated on a new
    /// page: keep filling the current week.
    fn enter_week(&mut self, range: WeekRange, report: &mut ParseReport) {
        if self.weeks.last().is_some_and(|w| w.range() == range) {
            debug!("    [WEEK-REPEAT] {} -> {}", range.start, range.end);
            return;
        }
        self.weeks.push(Period::new(range));
        self.current_area = None;
        self.areas.clear();
        report.week += 1;
        debug!("    [WEEK] {} -> {} ({} days)", range.start, range.end, range.days());
    }

    /// Returns true when the area did not exist yet in this week.
    fn open_area(&mut self, label: &str) -> bool {
        let Some(week) = self.weeks.last_mut() else {
            return false;
        };
        let (idx, created) = self.areas.open(&mut week.areas, label);
        self.current_area = Some(idx);
        created
    }

    fn add_pharmacy(
        &mut self,
        city: Option<String>,
        name: String,
        phones: PhoneScan,
        line: &str,
        report: &mut ParseReport,
    ) {
        if let Some(city) = &city {
            if self.open_area(city) {
                debug!("    [AREA-AUTO] {city}");
            }
        }
        report.record_dropped(&phones.dropped);
        let Some(area) = self.current_area_mut() else {
            report.record_unclassified(line);
            return;
        };
        match &city {
            Some(city) => debug!("    [PHARMACY-CITY] {city} > {name} (tel: {})", phones_display(&phones.phones)),
            None => debug!("    [PHARMACY] {name} (tel: {})", phones_display(&phones.phones)),
        }
        area.pharmacies.push(PharmacyEntry::new(name, phones.phones));
        report.pharmacy += 1;
    }

    fn continue_pharmacy(&mut self, detail: Continuation, line: &str, report: &mut ParseReport) {
        let Some(last) = self
            .current_area_mut()
            .and_then(|area| area.pharmacies.last_mut())
        else {
            report.record_unclassified(line);
            return;
        };
        match detail {
            Continuation::Phone { phones, address } => {
                last.merge_phones(&phones.phones);
                report.record_dropped(&phones.dropped);
                report.phone += 1;
                match address {
                    Some(address) => {
                        debug!("    [ADDR+TEL] addr='{address}' tel={}", phones_display(&phones.phones));
                        last.append_address(&address);
                    }
                    None => debug!("    [TEL] {}", phones_display(&phones.phones)),
                }
            }
            Continuation::Address(text) => {
                debug!("    [ADDRESS] {text}");
                last.append_address(&text);
                report.address += 1;
            }
        }
    }
}

/// Run the line stream through the rules and build the weeks. Lines are
/// normalized first; blank lines are skipped. Page boundaries do not matter.
pub fn classify_lines<I, S>(lines: I, months: &MonthTable) -> Result<(Vec<Period>, ParseReport), ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut state = BulletinState::default();
    let mut report = ParseReport::default();

    for raw in lines {
        let line = clean(raw.as_ref());
        if line.is_empty() {
            continue;
        }
        report.lines += 1;
        let role = classify_line(&line, state.cursor(), months)?;
        state.apply(role, &line, &mut report);
    }

    Ok((state.weeks, report))
}

use std::collections::HashSet;
use std::sync::LazyLock;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::dates::{parse_any_week_range, MonthTable, WeekRange};
use super::phones::{looks_like_phone, scan_phones};
use super::text::clean;
use crate::error::ParseError;
use crate::metrics::ParseReport;
use crate::record::{phones_display, Area, AreaIndex, PharmacyEntry};

pub const HEADING_TAGS: [&str; 3] = ["h2", "h3", "h4"];
pub const CONTENT_TAGS: [&str; 10] = [
    "p", "div", "span", "li", "ul", "ol", "address", "strong", "em", "a",
];

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3").unwrap());
static WALK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    let tags = HEADING_TAGS.iter().chain(CONTENT_TAGS.iter()).join(", ");
    Selector::parse(&tags).unwrap()
});

/// Text of an element with its pieces trimmed and space-joined.
pub fn element_text(el: ElementRef) -> String {
    clean(&el.text().map(str::trim).filter(|s| !s.is_empty()).join(" "))
}

fn is_heading(el: ElementRef) -> bool {
    HEADING_TAGS.contains(&el.value().name())
}

/// Week range of the page, taken from the first `h2`/`h3` that carries one.
pub fn find_week_range(document: &Html, months: &MonthTable) -> Result<WeekRange, ParseError> {
    for heading in document.select(&TITLE_SEL) {
        if let Some(range) = parse_any_week_range(&element_text(heading), months)? {
            debug!("Week found: {} -> {}", range.start, range.end);
            return Ok(range);
        }
    }
    Err(ParseError::MissingWeekHeader)
}

/// Case-insensitive phrase test shared by the extractor and the structure
/// monitor.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.to_lowercase().contains(&clean(phrase).to_lowercase())
}

pub fn find_anchor<'a>(document: &'a Html, phrase: &str) -> Option<ElementRef<'a>> {
    document
        .select(&TITLE_SEL)
        .find(|heading| contains_phrase(&element_text(*heading), phrase))
}

/// Address blocks and phone-bearing text gathered for one pharmacy heading.
#[derive(Debug, Default)]
struct Details {
    address: Vec<String>,
    phone_text: Vec<String>,
}

impl Details {
    fn push(&mut self, text: String) {
        if looks_like_phone(&text) {
            self.phone_text.push(text);
        } else {
            self.address.push(text);
        }
    }

    fn is_empty(&self) -> bool {
        self.address.is_empty() && self.phone_text.is_empty()
    }
}

/// Element siblings following the heading, up to the next heading.
fn sibling_details(heading: ElementRef) -> Details {
    let mut details = Details::default();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        if is_heading(sibling) {
            break;
        }
        let text = element_text(sibling);
        if !text.is_empty() {
            details.push(text);
        }
    }
    details
}

/// Document-order scan from the heading to the next heading, for pages where
/// the heading is wrapped and has no useful siblings. Nodes inside the heading
/// and repeated blocks (a wrapper and its only child) are skipped.
fn forward_scan_details(nodes: &[ElementRef], pos: usize, heading: ElementRef) -> Details {
    let mut details = Details::default();
    let mut seen = HashSet::new();
    for &node in &nodes[pos + 1..] {
        if is_heading(node) {
            break;
        }
        if node.ancestors().any(|a| a.id() == heading.id()) {
            continue;
        }
        let text = element_text(node);
        if !text.is_empty() && seen.insert(text.clone()) {
            details.push(text);
        }
    }
    details
}

/// Walk the headings after the anchor: `h3` opens an area (reused when the
/// same label comes back), `h4` adds a pharmacy to it. Stops at the first
/// `h2`/`h3` whose title is a stop title.
pub fn extract_areas(
    document: &Html,
    anchor: ElementRef,
    stop_titles: &[String],
    report: &mut ParseReport,
) -> Vec<Area> {
    let nodes: Vec<ElementRef> = document.select(&WALK_SEL).collect();
    let start = nodes
        .iter()
        .position(|n| n.id() == anchor.id())
        .map_or(nodes.len(), |p| p + 1);

    let mut areas: Vec<Area> = Vec::new();
    let mut index = AreaIndex::default();
    let mut current: Option<usize> = None;

    for (pos, &node) in nodes.iter().enumerate().skip(start) {
        let tag = node.value().name();
        if !is_heading(node) {
            continue;
        }
        let title = element_text(node);

        if tag != "h4" && stop_titles.iter().any(|t| *t == title) {
            debug!("Stop: reached '{title}'");
            break;
        }

        match tag {
            "h3" => {
                if title.is_empty() {
                    continue;
                }
                let (idx, created) = index.open(&mut areas, &title);
                debug!("    [AREA{}] {title}", if created { "" } else { "-REUSE" });
                current = Some(idx);
                report.area += 1;
            }
            "h4" => {
                let Some(area) = current.and_then(|idx| areas.get_mut(idx)) else {
                    continue;
                };
                if title.is_empty() {
                    report.record_unclassified("<h4> without text");
                    continue;
                }
                let mut details = sibling_details(node);
                if details.is_empty() {
                    debug!("Falling back to forward scan for '{title}'");
                    details = forward_scan_details(&nodes, pos, node);
                }

                // Each block on its own: gluing blocks would fuse numbers.
                let mut entry = PharmacyEntry::new(title, Vec::new());
                for block in &details.phone_text {
                    let scan = scan_phones(block);
                    report.record_dropped(&scan.dropped);
                    entry.merge_phones(&scan.phones);
                }
                entry.append_address(&details.address.join(" "));
                debug!(
                    "    [PHARMACY] {} | {} | {}",
                    entry.raw_name,
                    entry.raw_address,
                    phones_display(&entry.phone_numbers)
                );
                area.pharmacies.push(entry);
                report.pharmacy += 1;
            }
            _ => {}
        }
    }

    areas
}

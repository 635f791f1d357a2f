use std::fmt;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;

use super::dates::looks_like_week_header;
use super::dom::{contains_phrase, element_text};
use crate::config::WebSettings;

static AREA_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static PHARMACY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h4").unwrap());

/// Something the web extractor depends on is missing from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureAlert {
    MissingWeekRange,
    MissingAnchor(String),
    NoAreaHeadings,
    NoPharmacyHeadings,
}

impl fmt::Display for StructureAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureAlert::MissingWeekRange => {
                write!(f, "[STRUCTURE] week_range: 'Semaine du ... au ...' not found")
            }
            StructureAlert::MissingAnchor(phrase) => {
                write!(f, "[STRUCTURE] anchor: '{phrase}' not found")
            }
            StructureAlert::NoAreaHeadings => write!(f, "[STRUCTURE] no <h3> found (areas)"),
            StructureAlert::NoPharmacyHeadings => {
                write!(f, "[STRUCTURE] no <h4> found (pharmacy names)")
            }
        }
    }
}

/// Check a page for the markers the extractor relies on. An empty list means
/// the page looks as expected.
pub fn validate_structure(html: &str, settings: &WebSettings) -> Vec<StructureAlert> {
    let document = Html::parse_document(html);
    let text = element_text(document.root_element());
    let mut alerts = Vec::new();

    if !looks_like_week_header(&text) {
        alerts.push(StructureAlert::MissingWeekRange);
    }
    if !contains_phrase(&text, &settings.anchor_phrase) {
        alerts.push(StructureAlert::MissingAnchor(settings.anchor_phrase.clone()));
    }
    if document.select(&AREA_SEL).next().is_none() {
        alerts.push(StructureAlert::NoAreaHeadings);
    }
    if document.select(&PHARMACY_SEL).next().is_none() {
        alerts.push(StructureAlert::NoPharmacyHeadings);
    }

    for alert in &alerts {
        warn!("{alert}");
    }
    alerts
}

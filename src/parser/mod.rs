pub mod dates;
pub mod dom;
pub mod lines;
pub mod phones;
pub mod structure;
pub mod text;

use scraper::Html;
use tracing::info;

use crate::config::WebSettings;
use crate::error::ParseError;
use crate::metrics::ParseReport;
use crate::record::{Document, Parsed, Period, Schedule, SourceInfo};
use dates::MonthTable;

/// Web page: week range, then anchor, then the heading walk. The page is
/// rejected whole when either marker is missing.
pub fn parse_web_page(
    html: &str,
    settings: &WebSettings,
    months: &MonthTable,
    source: SourceInfo,
) -> Result<Parsed, ParseError> {
    let document = Html::parse_document(html);
    let range = dom::find_week_range(&document, months)?;
    let anchor = dom::find_anchor(&document, &settings.anchor_phrase)
        .ok_or_else(|| ParseError::MissingAnchor(settings.anchor_phrase.clone()))?;

    let mut report = ParseReport {
        week: 1,
        ..ParseReport::default()
    };
    let mut period = Period::new(range);
    period.areas = dom::extract_areas(&document, anchor, &settings.stop_titles, &mut report);
    info!(
        "Period {} -> {}: {} areas",
        period.start_date,
        period.end_date,
        period.areas.len()
    );

    let document = Document::new(source, Schedule::Period(period));
    report.finish(&document);
    Ok(Parsed { document, report })
}

/// Bulletin lines, all pages concatenated. A bulletin without any week header
/// yields an empty week list rather than an error.
pub fn parse_bulletin<I, S>(lines: I, months: &MonthTable, source: SourceInfo) -> Result<Parsed, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (weeks, mut report) = lines::classify_lines(lines, months)?;
    let document = Document::new(source, Schedule::Weeks(weeks));
    report.finish(&document);
    Ok(Parsed { document, report })
}

pub fn parse_bulletin_text(text: &str, months: &MonthTable, source: SourceInfo) -> Result<Parsed, ParseError> {
    parse_bulletin(text.lines(), months, source)
}

/// One extracted text per page; page boundaries carry no meaning.
pub fn parse_bulletin_pages(pages: &[String], months: &MonthTable, source: SourceInfo) -> Result<Parsed, ParseError> {
    parse_bulletin(pages.iter().flat_map(|page| page.lines()), months, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn web_fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
    }

    fn parse_web(html: &str) -> Result<Parsed, ParseError> {
        let settings = Settings::default();
        parse_web_page(html, &settings.web, &settings.month_table(), settings.web_source())
    }

    fn parse_bulletin_fixture() -> Parsed {
        let settings = Settings::default();
        let text = web_fixture("unppci_bulletin.txt");
        let source = settings.bulletin_source(Some("unppci_bulletin.pdf".into()), None);
        parse_bulletin_text(&text, &settings.month_table(), source).unwrap()
    }

    #[test]
    fn annuaireci_week_page() {
        let parsed = parse_web(&web_fixture("annuaireci_week.html")).unwrap();
        let Schedule::Period(period) = &parsed.document.schedule else {
            panic!("web page must produce a single period");
        };
        assert_eq!(period.start_date.to_string(), "2026-02-07");
        assert_eq!(period.end_date.to_string(), "2026-02-13");

        let labels: Vec<&str> = period.areas.iter().map(|a| a.raw_label.as_str()).collect();
        assert_eq!(labels, vec!["ABOBO", "COCODY", "YOPOUGON"]);

        let abobo = &period.areas[0].pharmacies;
        assert_eq!(abobo.len(), 2);
        assert_eq!(abobo[0].raw_name, "PHARMACIE DE LA GARE D'ABOBO");
        assert_eq!(abobo[0].raw_address, "Abobo, face à la gare routière");
        assert_eq!(abobo[0].phone_numbers, vec!["0769353909", "2724390120"]);

        let cocody = &period.areas[1].pharmacies;
        assert_eq!(cocody[1].raw_name, "PHARMACIE ANGRE CHATEAU");
        assert_eq!(cocody[1].phone_numbers, vec!["0707070707", "22441011"]);

        // nothing after the stop title
        assert_eq!(parsed.document.pharmacy_count(), 5);
        assert_eq!(parsed.report.pharmacy, 5);
        assert_eq!(parsed.report.area, 3);
    }

    #[test]
    fn web_json_is_deterministic() {
        let html = web_fixture("annuaireci_week.html");
        let first = serde_json::to_string_pretty(&parse_web(&html).unwrap().document).unwrap();
        let second = serde_json::to_string_pretty(&parse_web(&html).unwrap().document).unwrap();
        assert_eq!(first, second);
        let json: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(json["period"]["week_start"], "2026-02-07");
        assert!(json.get("source_file").is_none());
    }

    #[test]
    fn upper_case_anchor_passes_validation_and_parsing() {
        let html = "<h2>Semaine du 07/02/2026 au 13/02/2026</h2><h2>LISTE DES PHARMACIES DE GARDE</h2>\
                    <h3>COCODY</h3><h4>PHARMACIE ANGRE</h4><p>Angré 8e tranche</p>";
        assert!(structure::validate_structure(html, &Settings::default().web).is_empty());
        assert_eq!(parse_web(html).unwrap().document.pharmacy_count(), 1);
    }

    #[test]
    fn wrapped_heading_page() {
        let parsed = parse_web(&web_fixture("annuaireci_wrapped.html")).unwrap();
        let period = &parsed.document.periods()[0];
        let entry = &period.areas[0].pharmacies[0];
        assert_eq!(entry.raw_name, "PHARMACIE SAINTE FAMILLE");
        assert_eq!(entry.raw_address, "Riviera 3, carrefour Djibi");
        assert_eq!(entry.phone_numbers, vec!["0102030405"]);
    }

    #[test]
    fn web_page_without_anchor_is_rejected() {
        let html = "<h2>Semaine du 07/02/2026 au 13/02/2026</h2><h3>COCODY</h3><h4>PHARMACIE X</h4>";
        let err = parse_web(html).unwrap_err();
        assert_eq!(err, ParseError::MissingAnchor("Liste des pharmacies de garde".into()));
        assert!(err.is_structural());
    }

    #[test]
    fn web_page_without_week_is_rejected() {
        let html = "<h2>Liste des pharmacies de garde</h2><h3>COCODY</h3><h4>PHARMACIE X</h4>";
        assert_eq!(parse_web(html).unwrap_err(), ParseError::MissingWeekHeader);
    }

    #[test]
    fn empty_listing_is_flagged_not_fatal() {
        let html = "<h2>Semaine du 07/02/2026 au 13/02/2026</h2><h2>Liste des pharmacies de garde</h2><h2>Urgence</h2>";
        let parsed = parse_web(html).unwrap();
        assert_eq!(parsed.document.pharmacy_count(), 0);
        assert!(parsed.report.has_no_pharmacies());
    }

    #[test]
    fn unppci_bulletin() {
        let parsed = parse_bulletin_fixture();
        let weeks = parsed.document.periods();
        assert_eq!(weeks.len(), 2);

        let first = &weeks[0];
        assert_eq!(first.start_date.to_string(), "2026-02-07");
        assert_eq!(first.end_date.to_string(), "2026-02-13");
        let labels: Vec<&str> = first.areas.iter().map(|a| a.raw_label.as_str()).collect();
        assert_eq!(labels, vec!["COCODY", "YOPOUGON", "ABENGOUROU", "BOUAKE"]);

        // repeated header on page 2 keeps filling COCODY
        let cocody = &first.areas[0].pharmacies;
        assert_eq!(cocody.len(), 3);
        assert_eq!(cocody[0].raw_name, "PHCIE DES II PLATEAUX");
        assert_eq!(cocody[0].raw_address, "BD LATRILLE FACE SOCOCE");
        assert_eq!(cocody[0].phone_numbers, vec!["2722414141", "0769353909"]);
        assert_eq!(cocody[2].raw_name, "PHCIE RIVIERA PALMERAIE");

        let yopougon = &first.areas[1].pharmacies;
        assert_eq!(yopougon[0].phone_numbers, vec!["0769353909", "22441011"]);
        assert_eq!(yopougon[0].raw_address, "ROUTE DU MARCHE");

        let abengourou = &first.areas[2].pharmacies;
        assert_eq!(abengourou[0].raw_name, "PHCIE DU MARCHE");
        assert_eq!(abengourou[0].raw_address, "QUARTIER COMMERCE");

        let second = &weeks[1];
        assert_eq!(second.start_date.to_string(), "2026-02-14");
        assert_eq!(second.areas.len(), 1);
        assert_eq!(second.areas[0].raw_label, "COCODY");
        assert_eq!(second.areas[0].pharmacies.len(), 1);
    }

    #[test]
    fn bulletin_report() {
        let parsed = parse_bulletin_fixture();
        assert_eq!(parsed.report.week, 2);
        assert_eq!(parsed.report.ignored_pre_week, 3);
        assert_eq!(parsed.report.pharmacy, 7);
        assert_eq!(parsed.report.dropped_fragments, 0);
        assert!(!parsed.report.has_no_pharmacies());
    }

    #[test]
    fn bulletin_json_is_deterministic() {
        let first = serde_json::to_string_pretty(&parse_bulletin_fixture().document).unwrap();
        let second = serde_json::to_string_pretty(&parse_bulletin_fixture().document).unwrap();
        assert_eq!(first, second);
        let json: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(json["source"], "unppci");
        assert_eq!(json["source_file"], "unppci_bulletin.pdf");
        assert_eq!(json["weeks"][1]["week_end"], "2026-02-20");
    }

    #[test]
    fn pages_are_concatenated() {
        let pages = vec![
            "SEMAINE DU SAMEDI 07 AU VENDREDI 13 FEVRIER 2026\nCOCODY\nPHCIE DES II PLATEAUX".to_string(),
            "BD LATRILLE\n07 69 35 39 09".to_string(),
        ];
        let parsed = parse_bulletin_pages(&pages, &MonthTable::french(), SourceInfo::default()).unwrap();
        let entry = &parsed.document.periods()[0].areas[0].pharmacies[0];
        assert_eq!(entry.raw_address, "BD LATRILLE");
        assert_eq!(entry.phone_numbers, vec!["0769353909"]);
    }

    #[test]
    fn bulletin_without_header_is_empty() {
        let parsed = parse_bulletin(["COCODY", "PHCIE X"], &MonthTable::french(), SourceInfo::default()).unwrap();
        assert!(parsed.document.periods().is_empty());
        assert!(parsed.report.has_no_pharmacies());
    }
}

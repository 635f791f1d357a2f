use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::metrics::ParseReport;
use crate::parser::dates::WeekRange;
use crate::parser::text::{clean, fold_label};

/// Payload handed to the persistence side. Field names are part of the
/// contract with the loaders and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub source: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(flatten)]
    pub schedule: Schedule,
}

/// A web page carries one week; a bulletin carries several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Period(Period),
    Weeks(Vec<Period>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(rename = "week_start")]
    pub start_date: NaiveDate,
    #[serde(rename = "week_end")]
    pub end_date: NaiveDate,
    pub areas: Vec<Area>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Area {
    #[serde(rename = "area")]
    pub raw_label: String,
    pub pharmacies: Vec<PharmacyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PharmacyEntry {
    #[serde(rename = "name_raw")]
    pub raw_name: String,
    #[serde(rename = "address_raw")]
    pub raw_address: String,
    #[serde(rename = "phones_raw")]
    pub phone_numbers: Vec<String>,
}

/// Where a document came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub source: String,
    pub source_url: String,
    pub source_file: Option<String>,
}

/// Result of one parse call: the payload plus what was counted on the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub document: Document,
    pub report: ParseReport,
}

impl Document {
    pub fn new(source: SourceInfo, schedule: Schedule) -> Self {
        Document {
            source: source.source,
            source_url: source.source_url,
            source_file: source.source_file,
            schedule,
        }
    }

    pub fn periods(&self) -> &[Period] {
        match &self.schedule {
            Schedule::Period(period) => std::slice::from_ref(period),
            Schedule::Weeks(weeks) => weeks,
        }
    }

    pub fn area_count(&self) -> usize {
        self.periods().iter().map(|p| p.areas.len()).sum()
    }

    pub fn pharmacy_count(&self) -> usize {
        self.periods().iter().map(Period::pharmacy_count).sum()
    }
}

impl Period {
    pub fn new(range: WeekRange) -> Self {
        Period {
            start_date: range.start,
            end_date: range.end,
            areas: Vec::new(),
        }
    }

    pub fn range(&self) -> WeekRange {
        WeekRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn pharmacy_count(&self) -> usize {
        self.areas.iter().map(|a| a.pharmacies.len()).sum()
    }
}

impl Area {
    pub fn new(raw_label: impl Into<String>) -> Self {
        Area {
            raw_label: raw_label.into(),
            pharmacies: Vec::new(),
        }
    }
}

impl PharmacyEntry {
    pub fn new(raw_name: impl Into<String>, phone_numbers: Vec<String>) -> Self {
        PharmacyEntry {
            raw_name: raw_name.into(),
            raw_address: String::new(),
            phone_numbers,
        }
    }

    /// Space-join another address fragment onto the address.
    pub fn append_address(&mut self, text: &str) {
        self.raw_address = clean(&format!("{} {}", self.raw_address, text));
    }

    /// Add numbers not already known, keeping first-seen order.
    pub fn merge_phones(&mut self, phones: &[String]) {
        for phone in phones {
            if !self.phone_numbers.contains(phone) {
                self.phone_numbers.push(phone.clone());
            }
        }
    }
}

/// Per-period lookup of areas by folded label, so a label seen twice (page
/// headers repeated, city prefixes) lands in the same area.
#[derive(Debug, Default)]
pub struct AreaIndex {
    by_label: HashMap<String, usize>,
}

impl AreaIndex {
    /// Index of the area for `label`, creating it at the end of `areas` when
    /// new. The flag tells whether it was created.
    pub fn open(&mut self, areas: &mut Vec<Area>, label: &str) -> (usize, bool) {
        let key = fold_label(label);
        if let Some(&idx) = self.by_label.get(&key) {
            return (idx, false);
        }
        areas.push(Area::new(label));
        let idx = areas.len() - 1;
        self.by_label.insert(key, idx);
        (idx, true)
    }

    pub fn clear(&mut self) {
        self.by_label.clear();
    }
}

/// Render phone lists for log lines.
pub(crate) fn phones_display(phones: &[String]) -> String {
    phones.iter().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> WeekRange {
        WeekRange {
            start: NaiveDate::from_ymd_opt(2026, 2, 7).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        }
    }

    fn sample_period() -> Period {
        let mut period = Period::new(week());
        let mut area = Area::new("COCODY");
        let mut entry = PharmacyEntry::new("PHCIE DES II PLATEAUX", vec!["0769353909".into()]);
        entry.append_address("BD LATRILLE");
        area.pharmacies.push(entry);
        period.areas.push(area);
        period
    }

    #[test]
    fn web_payload_shape() {
        let doc = Document::new(
            SourceInfo {
                source: "annuaireci".into(),
                source_url: "https://annuaireci.com/pharmacies-de-garde/".into(),
                source_file: None,
            },
            Schedule::Period(sample_period()),
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["source"], "annuaireci");
        assert!(json.get("source_file").is_none());
        assert_eq!(json["period"]["week_start"], "2026-02-07");
        assert_eq!(json["period"]["week_end"], "2026-02-13");
        let pharmacy = &json["period"]["areas"][0]["pharmacies"][0];
        assert_eq!(json["period"]["areas"][0]["area"], "COCODY");
        assert_eq!(pharmacy["name_raw"], "PHCIE DES II PLATEAUX");
        assert_eq!(pharmacy["address_raw"], "BD LATRILLE");
        assert_eq!(pharmacy["phones_raw"][0], "0769353909");
    }

    #[test]
    fn bulletin_payload_shape() {
        let doc = Document::new(
            SourceInfo {
                source: "unppci".into(),
                source_url: String::new(),
                source_file: Some("garde.pdf".into()),
            },
            Schedule::Weeks(vec![sample_period()]),
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["source_file"], "garde.pdf");
        assert_eq!(json["weeks"][0]["week_start"], "2026-02-07");
        assert_eq!(doc.area_count(), 1);
        assert_eq!(doc.pharmacy_count(), 1);
    }

    #[test]
    fn address_fragments_join_with_spaces() {
        let mut entry = PharmacyEntry::new("PHCIE X", Vec::new());
        entry.append_address("  RUE 12 ");
        entry.append_address("FACE MOSQUEE");
        assert_eq!(entry.raw_address, "RUE 12 FACE MOSQUEE");
    }

    #[test]
    fn merged_phones_stay_unique() {
        let mut entry = PharmacyEntry::new("PHCIE X", vec!["0769353909".into()]);
        entry.merge_phones(&["0509098877".into(), "0769353909".into()]);
        assert_eq!(entry.phone_numbers, vec!["0769353909", "0509098877"]);
    }

    #[test]
    fn area_index_folds_case_and_spacing() {
        let mut areas = Vec::new();
        let mut index = AreaIndex::default();
        assert_eq!(index.open(&mut areas, "Yopougon  Secteur 9"), (0, true));
        assert_eq!(index.open(&mut areas, "YOPOUGON SECTEUR 9"), (0, false));
        assert_eq!(index.open(&mut areas, "ABOBO"), (1, true));
        assert_eq!(areas[0].raw_label, "Yopougon  Secteur 9");
        index.clear();
        assert_eq!(index.open(&mut areas, "ABOBO"), (2, true));
    }
}

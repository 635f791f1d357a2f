use serde::Serialize;
use tracing::{info, warn};

use crate::record::Document;

/// Soft problems seen during a parse. None of these abort it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    NoPharmacies,
    DroppedFragment { digits: String },
    Unclassified { line: String },
}

/// Classification counters for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub lines: usize,
    pub week: usize,
    pub area: usize,
    pub pharmacy: usize,
    pub address: usize,
    pub phone: usize,
    pub skipped: usize,
    pub ignored_pre_week: usize,
    pub dropped_fragments: usize,
    pub anomalies: Vec<Anomaly>,
}

impl ParseReport {
    pub fn record_dropped(&mut self, fragments: &[String]) {
        self.dropped_fragments += fragments.len();
        self.anomalies.extend(
            fragments
                .iter()
                .map(|digits| Anomaly::DroppedFragment { digits: digits.clone() }),
        );
    }

    pub fn record_unclassified(&mut self, line: &str) {
        self.skipped += 1;
        self.anomalies.push(Anomaly::Unclassified {
            line: line.to_string(),
        });
    }

    pub fn unclassified(&self) -> usize {
        self.anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::Unclassified { .. }))
            .count()
    }

    pub fn has_no_pharmacies(&self) -> bool {
        self.anomalies.contains(&Anomaly::NoPharmacies)
    }

    /// Log the per-document summary and flag an empty result.
    pub fn finish(&mut self, document: &Document) {
        let periods = document.periods().len();
        let areas = document.area_count();
        let pharmacies = document.pharmacy_count();
        info!(
            source = %document.source,
            "Result: {periods} weeks, {areas} areas, {pharmacies} pharmacies"
        );
        if self.lines > 0 {
            info!(
                "Classification: {} lines - week={}, area={}, pharmacy={}, address={}, phone={}, skipped={} (unclassified={}), pre-week={}",
                self.lines,
                self.week,
                self.area,
                self.pharmacy,
                self.address,
                self.phone,
                self.skipped,
                self.unclassified(),
                self.ignored_pre_week,
            );
        }
        if pharmacies == 0 {
            warn!(source = %document.source, "No pharmacy extracted - check the document layout");
            self.anomalies.push(Anomaly::NoPharmacies);
        }
    }
}

//! Weekly on-duty pharmacy listings (Côte d'Ivoire): the annuaireci.com web
//! page and the UNPPCI bulletin text, both turned into the same
//! period > area > pharmacy payload.

pub mod config;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod record;

pub use config::Settings;
pub use error::ParseError;
pub use metrics::{Anomaly, ParseReport};
pub use parser::dates::{MonthTable, WeekRange};
pub use parser::structure::{validate_structure, StructureAlert};
pub use parser::{parse_bulletin, parse_bulletin_pages, parse_bulletin_text, parse_web_page};
pub use record::{Area, Document, Parsed, Period, PharmacyEntry, Schedule, SourceInfo};

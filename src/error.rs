use thiserror::Error;

/// Fatal parse failures. Everything else (empty results, stray lines,
/// undersized digit runs) is reported through `ParseReport` instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("anchor heading not found: '{0}'")]
    MissingAnchor(String),
    #[error("no week range header (Semaine du ... au ...) found on page")]
    MissingWeekHeader,
    #[error("unknown month name: {0}")]
    UnknownMonth(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

impl ParseError {
    /// The page no longer has the layout the extractor relies on.
    pub fn is_structural(&self) -> bool {
        matches!(self, ParseError::MissingAnchor(_) | ParseError::MissingWeekHeader)
    }
}

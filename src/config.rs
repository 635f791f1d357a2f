use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::parser::dates::MonthTable;
use crate::record::SourceInfo;

/// Runtime settings. Layered: built-in defaults, then `garde.toml` in the
/// working directory, then the `--config` file, then `GARDE_*` variables
/// (`GARDE_WEB__ANCHOR_PHRASE`, `GARDE_BULLETIN__SOURCE_URL`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub web: WebSettings,
    pub bulletin: BulletinSettings,
    /// Extra month spellings, e.g. `FEVR = 2`.
    pub months: HashMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub source: String,
    pub source_url: String,
    pub anchor_phrase: String,
    pub stop_titles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulletinSettings {
    pub source: String,
    pub source_url: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        WebSettings {
            source: "annuaireci".to_string(),
            source_url: "https://annuaireci.com/pharmacies-de-garde/".to_string(),
            anchor_phrase: "Liste des pharmacies de garde".to_string(),
            stop_titles: [
                "Urgence",
                "Horaires",
                "Localisation",
                "Rechercher une pharmacie",
                "Questions fréquentes",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for BulletinSettings {
    fn default() -> Self {
        BulletinSettings {
            source: "unppci".to_string(),
            source_url: String::new(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::with_name("garde").required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("GARDE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("web.stop_titles")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn month_table(&self) -> MonthTable {
        MonthTable::french().with_aliases(&self.months)
    }

    pub fn web_source(&self) -> SourceInfo {
        SourceInfo {
            source: self.web.source.clone(),
            source_url: self.web.source_url.clone(),
            source_file: None,
        }
    }

    /// `source_url` falls back to the configured one when not given.
    pub fn bulletin_source(&self, file: Option<String>, source_url: Option<String>) -> SourceInfo {
        SourceInfo {
            source: self.bulletin.source.clone(),
            source_url: source_url.unwrap_or_else(|| self.bulletin.source_url.clone()),
            source_file: file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.web.source, "annuaireci");
        assert_eq!(settings.web.stop_titles.len(), 5);
        assert_eq!(settings.bulletin.source, "unppci");
        assert_eq!(settings.month_table().lookup("AOÛT"), Some(8));
    }

    #[test]
    fn file_overrides_defaults() {
        let settings = Settings::load(Some(Path::new("tests/fixtures/garde.toml"))).unwrap();
        assert_eq!(settings.web.anchor_phrase, "Pharmacies de garde cette semaine");
        assert_eq!(settings.web.source, "annuaireci");
        assert_eq!(
            settings.bulletin.source_url,
            "https://www.unppci.org/tour-de-garde.pdf"
        );
        assert_eq!(settings.month_table().lookup("FEVR"), Some(2));
    }

    #[test]
    fn bulletin_source_prefers_explicit_url() {
        let settings = Settings::default();
        let info = settings.bulletin_source(Some("garde.pdf".into()), Some("https://x/y.pdf".into()));
        assert_eq!(info.source, "unppci");
        assert_eq!(info.source_url, "https://x/y.pdf");
        assert_eq!(info.source_file.as_deref(), Some("garde.pdf"));
        assert_eq!(settings.bulletin_source(None, None).source_url, "");
    }
}

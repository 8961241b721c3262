use super::Lookup;
use crate::infrastructure::csv_source::ColumnSpec;
use serde::Deserialize;

/// Input column names. `sentiment_column` and `date_column` left unset fall
/// back to header detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEnvConfig {
    pub entity_column: String,
    pub text_column: String,
    pub sentiment_column: Option<String>,
    pub date_column: Option<String>,
}

impl Default for IngestEnvConfig {
    fn default() -> Self {
        let columns = ColumnSpec::default();
        Self {
            entity_column: columns.entity,
            text_column: columns.text,
            sentiment_column: columns.sentiment,
            date_column: columns.date,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl IngestEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let defaults = Self::default();
        Self {
            entity_column: non_empty(lookup("ENTITY_COLUMN")).unwrap_or(defaults.entity_column),
            text_column: non_empty(lookup("TEXT_COLUMN")).unwrap_or(defaults.text_column),
            sentiment_column: non_empty(lookup("SENTIMENT_COLUMN")),
            date_column: non_empty(lookup("DATE_COLUMN")),
        }
    }

    pub(super) fn apply(&mut self, overlay: IngestOverlay) {
        if let Some(v) = non_empty(overlay.entity_column) {
            self.entity_column = v;
        }
        if let Some(v) = non_empty(overlay.text_column) {
            self.text_column = v;
        }
        if let Some(v) = non_empty(overlay.sentiment_column) {
            self.sentiment_column = Some(v);
        }
        if let Some(v) = non_empty(overlay.date_column) {
            self.date_column = Some(v);
        }
    }

    pub fn to_column_spec(&self) -> ColumnSpec {
        ColumnSpec {
            entity: self.entity_column.clone(),
            text: self.text_column.clone(),
            sentiment: self.sentiment_column.clone(),
            date: self.date_column.clone(),
        }
    }
}

/// `[ingest]` table of a TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestOverlay {
    pub entity_column: Option<String>,
    pub text_column: Option<String>,
    pub sentiment_column: Option<String>,
    pub date_column: Option<String>,
}

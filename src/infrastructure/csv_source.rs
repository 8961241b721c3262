//! CSV ingestion for forum posts.
//!
//! Column names are resolved once, at the boundary, into a [`ResolvedColumns`]
//! index set. The sentiment column may be given explicitly; otherwise the
//! last header containing `sentiment` wins, then a plain `label` column.
//! An optional post-date column is detected the same way, by the first header
//! naming a date or time; cells that do not parse as a date are left empty.

use crate::domain::errors::PipelineError;
use crate::domain::ports::SentimentClassifier;
use crate::domain::types::Document;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header written by the classify command.
pub const LABEL_COLUMN: &str = "sentiment_binary";

/// Header words that mark a post-date column. Matched against whole words so
/// that `sentiment` is not taken for `time`.
const DATE_HINTS: &[&str] = &["date", "datetime", "time", "timestamp", "날짜", "일자", "작성일"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%Y%m%d"];

/// Which columns carry the entity, the text and the polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub entity: String,
    pub text: String,
    /// `None` resolves by header name (see module docs).
    pub sentiment: Option<String>,
    /// `None` detects a date header; absence is not an error.
    pub date: Option<String>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            entity: "종목명".to_string(),
            text: "제목_전처리".to_string(),
            sentiment: None,
            date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub entity: usize,
    pub text: usize,
    pub sentiment: usize,
    pub date: Option<usize>,
}

fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| clean_header(h) == name)
        .ok_or_else(|| PipelineError::schema(name, "required column is missing"))
}

/// Pick the authoritative polarity column.
pub fn resolve_sentiment_column(
    headers: &StringRecord,
    explicit: Option<&str>,
) -> Result<usize, PipelineError> {
    if let Some(name) = explicit {
        return find_column(headers, name);
    }
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| clean_header(h).to_lowercase().contains("sentiment"))
        .last()
        .map(|(i, _)| i)
        .or_else(|| headers.iter().position(|h| clean_header(h) == "label"))
        .ok_or_else(|| {
            PipelineError::schema("sentiment", "no column containing 'sentiment' and no 'label' column")
        })
}

/// Explicit name first, else the first header naming a date or time.
pub fn resolve_date_column(
    headers: &StringRecord,
    explicit: Option<&str>,
) -> Result<Option<usize>, PipelineError> {
    if let Some(name) = explicit {
        return find_column(headers, name).map(Some);
    }
    Ok(headers.iter().position(|h| {
        clean_header(h)
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| DATE_HINTS.contains(&word))
    }))
}

pub fn resolve_columns(
    headers: &StringRecord,
    spec: &ColumnSpec,
) -> Result<ResolvedColumns, PipelineError> {
    Ok(ResolvedColumns {
        entity: find_column(headers, &spec.entity)?,
        text: find_column(headers, &spec.text)?,
        sentiment: resolve_sentiment_column(headers, spec.sentiment.as_deref())?,
        date: resolve_date_column(headers, spec.date.as_deref())?,
    })
}

/// Numeric coercion: anything that does not parse is missing.
pub fn parse_polarity(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Calendar day of a post timestamp. Unparseable cells are missing.
pub fn parse_post_date(cell: &str) -> Option<NaiveDate> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        })
}

/// Read documents from any CSV source. Rows with an empty entity id are dropped.
pub fn read_documents<R: Read>(reader: R, spec: &ColumnSpec) -> Result<Vec<Document>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let columns = resolve_columns(&headers, spec)?;
    debug!(
        "Columns resolved - entity={}, text={}, sentiment={}",
        columns.entity,
        columns.text,
        clean_header(headers.get(columns.sentiment).unwrap_or_default())
    );

    let mut documents = Vec::new();
    let mut dropped = 0usize;
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        let entity_id = record.get(columns.entity).unwrap_or_default().trim();
        if entity_id.is_empty() {
            dropped += 1;
            continue;
        }
        documents.push(Document {
            text: record.get(columns.text).unwrap_or_default().to_string(),
            entity_id: entity_id.to_string(),
            raw_sentiment: record.get(columns.sentiment).and_then(parse_polarity),
            posted_on: columns
                .date
                .and_then(|index| record.get(index))
                .and_then(parse_post_date),
        });
    }

    if dropped > 0 {
        debug!("Dropped {} rows without an entity id", dropped);
    }
    Ok(documents)
}

/// File-backed post source.
#[derive(Debug, Clone)]
pub struct CsvPostSource {
    path: PathBuf,
    columns: ColumnSpec,
}

impl CsvPostSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnSpec) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Document>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open input CSV {}", self.path.display()))?;
        let documents = read_documents(file, &self.columns)
            .with_context(|| format!("Failed to load posts from {}", self.path.display()))?;
        info!(
            "Loaded {} posts from {}",
            documents.len(),
            self.path.display()
        );
        Ok(documents)
    }
}

/// Copy every record and append a [`LABEL_COLUMN`] holding the classifier's
/// `-1`/`1` verdict for `text_column`. Returns the number of rows labeled.
pub fn label_records<R: Read, W: Write>(
    reader: R,
    writer: W,
    text_column: &str,
    classifier: &dyn SentimentClassifier,
) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let text = find_column(&headers, text_column)?;
    headers.push_field(LABEL_COLUMN);
    wtr.write_record(&headers)?;

    let mut labeled = 0usize;
    for record in rdr.records() {
        let mut record = record.context("Failed to read CSV record")?;
        let polarity = classifier.classify(record.get(text).unwrap_or_default());
        record.push_field(&polarity.to_string());
        wtr.write_record(&record)?;
        labeled += 1;
    }
    wtr.flush().context("Failed to flush labeled CSV")?;
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::Polarity;

    fn spec() -> ColumnSpec {
        ColumnSpec {
            entity: "ticker".to_string(),
            text: "text".to_string(),
            sentiment: None,
            date: None,
        }
    }

    #[test]
    fn test_reads_documents_and_coerces_polarity() {
        let data = "ticker,text,label\nA,good,1\nA,bad,0\nB,meh,\nC,odd,abc\n,orphan,1\n";
        let docs = read_documents(data.as_bytes(), &spec()).unwrap();

        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0].raw_sentiment, Some(1.0));
        assert_eq!(docs[1].raw_sentiment, Some(0.0));
        assert_eq!(docs[2].raw_sentiment, None);
        assert_eq!(docs[3].raw_sentiment, None);
    }

    #[test]
    fn test_last_sentiment_column_wins() {
        let headers = StringRecord::from(vec!["sentiment_rule", "label", "Sentiment_Model"]);
        assert_eq!(resolve_sentiment_column(&headers, None).unwrap(), 2);

        let only_label = StringRecord::from(vec!["text", "label"]);
        assert_eq!(resolve_sentiment_column(&only_label, None).unwrap(), 1);

        assert_eq!(
            resolve_sentiment_column(&headers, Some("sentiment_rule")).unwrap(),
            0
        );
    }

    #[test]
    fn test_missing_columns_are_schema_errors() {
        let headers = StringRecord::from(vec!["ticker", "text"]);
        let err = resolve_sentiment_column(&headers, None).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));

        let data = "ticker,body,label\nA,x,1\n";
        assert!(read_documents(data.as_bytes(), &spec()).is_err());
    }

    #[test]
    fn test_bom_prefixed_header_is_matched() {
        let data = "\u{feff}ticker,text,sentiment\nA,x,-1\n";
        let docs = read_documents(data.as_bytes(), &spec()).unwrap();
        assert_eq!(docs[0].entity_id, "A");
        assert_eq!(docs[0].raw_sentiment, Some(-1.0));
    }

    #[test]
    fn test_date_column_is_detected_and_parsed() {
        let data = "ticker,text,label,작성일\nA,x,1,2024.03.05 14:20\nA,y,0,어제\nA,z,1,2024-03-06\n";
        let docs = read_documents(data.as_bytes(), &spec()).unwrap();

        assert_eq!(docs[0].posted_on, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(docs[1].posted_on, None);
        assert_eq!(docs[2].posted_on, NaiveDate::from_ymd_opt(2024, 3, 6));
    }

    #[test]
    fn test_missing_date_column_is_not_an_error() {
        let headers = StringRecord::from(vec!["ticker", "sentiment", "posted_date"]);
        assert_eq!(resolve_date_column(&headers, None).unwrap(), Some(2));

        let headers = StringRecord::from(vec!["ticker", "text", "sentiment_binary"]);
        assert_eq!(resolve_date_column(&headers, None).unwrap(), None);
        assert!(resolve_date_column(&headers, Some("written_at")).is_err());
    }

    #[test]
    fn test_parse_post_date_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31);
        assert_eq!(parse_post_date("2024-01-31T09:00:00+09:00"), day);
        assert_eq!(parse_post_date("2024/01/31 23:59:59"), day);
        assert_eq!(parse_post_date("20240131"), day);
        assert_eq!(parse_post_date(" "), None);
        assert_eq!(parse_post_date("31 Jan"), None);
    }

    struct AlwaysPositive;

    impl SentimentClassifier for AlwaysPositive {
        fn classify(&self, _text: &str) -> Polarity {
            Polarity::Positive
        }
    }

    #[test]
    fn test_label_records_appends_column() {
        let data = "ticker,text\nA,hello\nB,world\n";
        let mut out = Vec::new();
        let count = label_records(data.as_bytes(), &mut out, "text", &AlwaysPositive).unwrap();

        assert_eq!(count, 2);
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with("ticker,text,sentiment_binary\n"));
        assert!(written.contains("A,hello,1\n"));
    }
}

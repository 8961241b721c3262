use crate::application::daily_summary::DailySentiment;
use crate::application::matrix_builder::{ComparisonMatrix, Metric};
use crate::application::pipeline::PipelineOutcome;
use crate::application::ticker_summary::TickerSentiment;
use crate::domain::types::{DocumentTopic, SkipNotice, TopicId, TopicInfo, TopicStat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const FULL_TABLE_FILE: &str = "topic_sentiment_full_table.csv";
pub const TICKER_SUMMARY_FILE: &str = "sentiment_by_ticker.csv";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
pub const DAILY_SUMMARY_FILE: &str = "daily_sentiment.csv";

// Headers are written explicitly so that empty tables keep their columns.
const TOPIC_HEADER: [&str; 7] = [
    "ticker",
    "topic",
    "topic_label",
    "n",
    "mean_sent",
    "pos_ratio",
    "top_words",
];
const DOCUMENT_HEADER: [&str; 4] = ["ticker", "text", "sentiment", "topic"];
const TOPIC_INFO_HEADER: [&str; 4] = ["ticker", "topic", "count", "keywords"];
const TICKER_HEADER: [&str; 7] = [
    "ticker",
    "total",
    "positive",
    "negative",
    "positive_pct",
    "negative_pct",
    "sentiment_score",
];
const DAILY_HEADER: [&str; 4] = ["day", "total", "pos_ratio", "neg_ratio"];

/// Replace characters that are invalid in file names and cap the length.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .take(80)
        .collect()
}

/// Row layout of exported topic tables.
#[derive(Debug, Serialize)]
struct TopicRow<'a> {
    ticker: &'a str,
    topic: u32,
    topic_label: &'a str,
    n: usize,
    mean_sent: f64,
    pos_ratio: f64,
    top_words: &'a str,
}

impl<'a> From<&'a TopicStat> for TopicRow<'a> {
    fn from(stat: &'a TopicStat) -> Self {
        Self {
            ticker: &stat.entity_id,
            topic: stat.topic_id,
            topic_label: &stat.topic_label,
            n: stat.document_count,
            mean_sent: stat.mean_sentiment,
            pos_ratio: stat.positive_ratio,
            top_words: &stat.top_words,
        }
    }
}

/// Outliers are written as topic `-1`.
fn topic_number(topic: TopicId) -> i64 {
    topic.local().map_or(-1, i64::from)
}

#[derive(Debug, Serialize)]
struct DocumentRow<'a> {
    ticker: &'a str,
    text: &'a str,
    sentiment: i8,
    topic: i64,
}

impl<'a> From<&'a DocumentTopic> for DocumentRow<'a> {
    fn from(document: &'a DocumentTopic) -> Self {
        Self {
            ticker: &document.entity_id,
            text: &document.text,
            sentiment: document.sentiment.value(),
            topic: topic_number(document.topic_id),
        }
    }
}

#[derive(Debug, Serialize)]
struct TopicInfoRow<'a> {
    ticker: &'a str,
    topic: i64,
    count: usize,
    keywords: String,
}

impl<'a> From<&'a TopicInfo> for TopicInfoRow<'a> {
    fn from(info: &'a TopicInfo) -> Self {
        Self {
            ticker: &info.entity_id,
            topic: topic_number(info.topic_id),
            count: info.document_count,
            keywords: info.keywords.join(", "),
        }
    }
}

/// Entity ids in first-appearance order.
fn entities_in_order<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut entities: Vec<&str> = Vec::new();
    for id in ids {
        if !entities.contains(&id) {
            entities.push(id);
        }
    }
    entities
}

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub generated_at: DateTime<Utc>,
    pub entities_analyzed: &'a [String],
    pub topic_rows: usize,
    pub dropped_missing: usize,
    pub skipped: &'a [SkipNotice],
}

/// Writes run artifacts as CSV/JSON files under one directory.
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    fn writer(&self, filename: &str) -> Result<(PathBuf, csv::Writer<fs::File>)> {
        let path = self.output_dir.join(filename);
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok((path, writer))
    }

    fn write_rows<T: Serialize>(
        &self,
        filename: &str,
        header: &[&str],
        rows: impl IntoIterator<Item = T>,
    ) -> Result<PathBuf> {
        let (path, mut wtr) = self.writer(filename)?;
        wtr.write_record(header)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(path)
    }

    pub fn write_topic_table(&self, filename: &str, stats: &[TopicStat]) -> Result<PathBuf> {
        self.write_rows(filename, &TOPIC_HEADER, stats.iter().map(TopicRow::from))
    }

    /// One table per entity, in first-appearance order.
    pub fn write_entity_tables(&self, stats: &[TopicStat]) -> Result<Vec<PathBuf>> {
        entities_in_order(stats.iter().map(|s| s.entity_id.as_str()))
            .into_iter()
            .map(|entity| {
                let rows: Vec<TopicStat> = stats
                    .iter()
                    .filter(|s| s.entity_id == entity)
                    .cloned()
                    .collect();
                let filename = format!("{}_topic_sentiment_table.csv", safe_filename(entity));
                self.write_topic_table(&filename, &rows)
            })
            .collect()
    }

    /// First column is `topic_label`, then one column per entity.
    pub fn write_matrix(&self, matrix: &ComparisonMatrix) -> Result<PathBuf> {
        let (path, mut wtr) = self.writer(&format!("matrix_{}.csv", matrix.metric.name()))?;

        let mut header = vec!["topic_label"];
        header.extend(matrix.column_ids().iter().map(String::as_str));
        wtr.write_record(&header)?;

        for (label, values) in matrix.rows() {
            let mut record = vec![label.to_string()];
            record.extend(values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(path)
    }

    /// `{ticker}_docs.csv`: every analyzed post with its topic, `-1` for outliers.
    pub fn write_document_tables(&self, documents: &[DocumentTopic]) -> Result<Vec<PathBuf>> {
        entities_in_order(documents.iter().map(|d| d.entity_id.as_str()))
            .into_iter()
            .map(|entity| {
                let rows = documents
                    .iter()
                    .filter(|d| d.entity_id == entity)
                    .map(DocumentRow::from);
                let filename = format!("{}_docs.csv", safe_filename(entity));
                self.write_rows(&filename, &DOCUMENT_HEADER, rows)
            })
            .collect()
    }

    /// `{ticker}_topics.csv`: size and keywords of every topic found.
    pub fn write_topic_info(&self, topic_info: &[TopicInfo]) -> Result<Vec<PathBuf>> {
        entities_in_order(topic_info.iter().map(|t| t.entity_id.as_str()))
            .into_iter()
            .map(|entity| {
                let rows = topic_info
                    .iter()
                    .filter(|t| t.entity_id == entity)
                    .map(TopicInfoRow::from);
                let filename = format!("{}_topics.csv", safe_filename(entity));
                self.write_rows(&filename, &TOPIC_INFO_HEADER, rows)
            })
            .collect()
    }

    pub fn write_ticker_summary(&self, summary: &[TickerSentiment]) -> Result<PathBuf> {
        self.write_rows(TICKER_SUMMARY_FILE, &TICKER_HEADER, summary)
    }

    pub fn write_daily_summary(&self, days: &[DailySentiment]) -> Result<PathBuf> {
        self.write_rows(DAILY_SUMMARY_FILE, &DAILY_HEADER, days)
    }

    pub fn write_run_summary(&self, outcome: &PipelineOutcome) -> Result<PathBuf> {
        let summary = RunSummary {
            generated_at: Utc::now(),
            entities_analyzed: &outcome.analyzed_entities,
            topic_rows: outcome.stats.len(),
            dropped_missing: outcome.dropped_missing,
            skipped: &outcome.skipped,
        };
        let path = self.output_dir.join(RUN_SUMMARY_FILE);
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write every artifact of a run: topic tables, per-ticker document and
    /// topic listings, both matrices, the top/bottom extracts by mean
    /// sentiment, the ticker and daily summaries and a JSON run summary.
    pub fn export_all(&self, outcome: &PipelineOutcome, rank_limit: usize) -> Result<Vec<PathBuf>> {
        let mut written = vec![self.write_topic_table(FULL_TABLE_FILE, &outcome.stats)?];
        written.extend(self.write_entity_tables(&outcome.stats)?);
        written.extend(self.write_document_tables(&outcome.documents)?);
        written.extend(self.write_topic_info(&outcome.topic_info)?);
        for metric in Metric::ALL {
            written.push(self.write_matrix(&outcome.matrix(metric))?);
        }

        let ranked = outcome.ranked(rank_limit, Metric::MeanSentiment);
        written.push(self.write_topic_table(
            &format!("top{}_topics_by_mean_sent.csv", rank_limit),
            &ranked.top,
        )?);
        written.push(self.write_topic_table(
            &format!("bottom{}_topics_by_mean_sent.csv", rank_limit),
            &ranked.bottom,
        )?);

        written.push(self.write_ticker_summary(&outcome.ticker_summary)?);
        written.push(self.write_daily_summary(&outcome.daily_summary)?);
        written.push(self.write_run_summary(outcome)?);

        info!(
            "Exported {} files to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::matrix_builder::MatrixBuilder;
    use crate::domain::sentiment::Polarity;
    use chrono::NaiveDate;

    fn stat(entity: &str, topic: u32, mean: f64) -> TopicStat {
        TopicStat {
            entity_id: entity.to_string(),
            topic_id: topic,
            topic_label: format!("{} | T{}(a/b)", entity, topic),
            document_count: 4,
            mean_sentiment: mean,
            positive_ratio: (mean + 1.0) / 2.0,
            top_words: "a, b".to_string(),
        }
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("A/B:C*D"), "A_B_C_D");
        assert_eq!(safe_filename(&"x".repeat(100)).chars().count(), 80);
        assert_eq!(safe_filename("삼성전자"), "삼성전자");
    }

    #[test]
    fn test_topic_table_columns() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let path = exporter
            .write_topic_table("t.csv", &[stat("A", 0, 0.5)])
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("ticker,topic,topic_label,n,mean_sent,pos_ratio,top_words")
        );
        assert_eq!(lines.next(), Some("A,0,A | T0(a/b),4,0.5,0.75,\"a, b\""));
    }

    #[test]
    fn test_matrix_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let matrix = MatrixBuilder::build(&[stat("A", 0, 0.5), stat("B", 0, -0.25)], Metric::MeanSentiment);
        let path = exporter.write_matrix(&matrix).unwrap();

        assert!(path.ends_with("matrix_mean_sentiment.csv"));
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "topic_label,A,B");
        assert_eq!(lines[1], "A | T0(a/b),0.5,0");
        assert_eq!(lines[2], "B | T0(a/b),0,-0.25");
    }

    #[test]
    fn test_entity_tables_are_split_per_entity() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("nested")).unwrap();
        let paths = exporter
            .write_entity_tables(&[stat("A", 0, 0.1), stat("B/C", 0, 0.2), stat("A", 1, 0.3)])
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("B_C_topic_sentiment_table.csv"));
        let a = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(a.lines().count(), 3);
    }

    #[test]
    fn test_document_table_marks_outliers() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let assigned = |text: &str, sentiment, topic_id| DocumentTopic {
            entity_id: "A".to_string(),
            text: text.to_string(),
            sentiment,
            topic_id,
        };
        let paths = exporter
            .write_document_tables(&[
                assigned("up", Polarity::Positive, TopicId::Topic(0)),
                assigned("noise", Polarity::Negative, TopicId::Outlier),
            ])
            .unwrap();

        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("A_docs.csv"));
        let content = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["ticker,text,sentiment,topic", "A,up,1,0", "A,noise,-1,-1"]);
    }

    #[test]
    fn test_topic_info_lists_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let paths = exporter
            .write_topic_info(&[
                TopicInfo {
                    entity_id: "A".to_string(),
                    topic_id: TopicId::Outlier,
                    document_count: 3,
                    keywords: Vec::new(),
                },
                TopicInfo {
                    entity_id: "A".to_string(),
                    topic_id: TopicId::Topic(0),
                    document_count: 7,
                    keywords: vec!["x".to_string(), "y".to_string()],
                },
            ])
            .unwrap();

        assert!(paths[0].ends_with("A_topics.csv"));
        let content = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["ticker,topic,count,keywords", "A,-1,3,", "A,0,7,\"x, y\""]);
    }

    #[test]
    fn test_daily_summary_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let path = exporter
            .write_daily_summary(&[DailySentiment {
                day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                total: 4,
                pos_ratio: 75.0,
                neg_ratio: 25.0,
            }])
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "day,total,pos_ratio,neg_ratio\n2024-03-01,4,75.0,25.0\n");
    }

    #[test]
    fn test_empty_outcome_keeps_table_headers() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        let written = exporter.export_all(&PipelineOutcome::default(), 15).unwrap();

        // No entities: no per-ticker files, the shared tables are still there
        assert_eq!(written.len(), 8);
        let first_line = |file: &str| {
            fs::read_to_string(dir.path().join(file))
                .unwrap()
                .lines()
                .next()
                .map(str::to_string)
        };
        assert_eq!(
            first_line(FULL_TABLE_FILE).as_deref(),
            Some("ticker,topic,topic_label,n,mean_sent,pos_ratio,top_words")
        );
        assert_eq!(
            first_line("top15_topics_by_mean_sent.csv").as_deref(),
            Some("ticker,topic,topic_label,n,mean_sent,pos_ratio,top_words")
        );
        assert_eq!(
            first_line(TICKER_SUMMARY_FILE).as_deref(),
            Some("ticker,total,positive,negative,positive_pct,negative_pct,sentiment_score")
        );
        assert_eq!(
            first_line(DAILY_SUMMARY_FILE).as_deref(),
            Some("day,total,pos_ratio,neg_ratio")
        );
        assert_eq!(first_line("matrix_mean_sentiment.csv").as_deref(), Some("topic_label"));
    }
}

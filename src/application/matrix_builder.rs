use crate::domain::errors::PipelineError;
use crate::domain::types::TopicStat;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Value written into cells the aggregation never produced: the topic does
/// not occur for that entity. Check `document_count` in the source table to
/// tell this apart from a genuinely neutral score.
pub const MISSING_FILL: f64 = 0.0;

/// Which [`TopicStat`] field populates the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    MeanSentiment,
    PositiveRatio,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::MeanSentiment, Metric::PositiveRatio];

    pub fn of(self, stat: &TopicStat) -> f64 {
        match self {
            Self::MeanSentiment => stat.mean_sentiment,
            Self::PositiveRatio => stat.positive_ratio,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MeanSentiment => "mean_sentiment",
            Self::PositiveRatio => "positive_ratio",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean_sentiment" | "mean_sent" | "mean" => Ok(Self::MeanSentiment),
            "positive_ratio" | "pos_ratio" => Ok(Self::PositiveRatio),
            _ => Err(PipelineError::InvalidConfig(format!(
                "Unknown metric '{}'. Must be 'mean_sentiment' or 'positive_ratio'",
                s
            ))),
        }
    }
}

/// Dense topic-label x entity matrix, stored row-major.
///
/// Rows are sorted by label and columns by entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonMatrix {
    pub metric: Metric,
    row_labels: Vec<String>,
    column_ids: Vec<String>,
    values: Vec<f64>,
}

impl ComparisonMatrix {
    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn column_ids(&self) -> &[String] {
        &self.column_ids
    }

    /// `(rows, columns)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.column_ids.len();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.row_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), self.row(i)))
    }

    pub fn get(&self, topic_label: &str, entity_id: &str) -> Option<f64> {
        let row = self.row_labels.binary_search_by(|l| l.as_str().cmp(topic_label)).ok()?;
        let column = self.column_ids.binary_search_by(|c| c.as_str().cmp(entity_id)).ok()?;
        Some(self.values[row * self.column_ids.len() + column])
    }
}

/// Pivots long-form [`TopicStat`] rows into a [`ComparisonMatrix`].
pub struct MatrixBuilder;

impl MatrixBuilder {
    /// Every label and entity present in `stats` gets a row or column, even
    /// when all of its cells are fill values. Duplicate `(label, entity)`
    /// pairs are averaged.
    pub fn build(stats: &[TopicStat], metric: Metric) -> ComparisonMatrix {
        let row_labels: Vec<String> = stats
            .iter()
            .map(|s| s.topic_label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column_ids: Vec<String> = stats
            .iter()
            .map(|s| s.entity_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
        for stat in stats {
            let cell = cells
                .entry((stat.topic_label.as_str(), stat.entity_id.as_str()))
                .or_insert((0.0, 0));
            cell.0 += metric.of(stat);
            cell.1 += 1;
        }

        let mut values = Vec::with_capacity(row_labels.len() * column_ids.len());
        for label in &row_labels {
            for entity in &column_ids {
                let value = cells
                    .get(&(label.as_str(), entity.as_str()))
                    .map(|(sum, count)| sum / *count as f64)
                    .unwrap_or(MISSING_FILL);
                values.push(value);
            }
        }

        ComparisonMatrix {
            metric,
            row_labels,
            column_ids,
            values,
        }
    }
}

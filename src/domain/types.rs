use crate::domain::sentiment::Polarity;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A forum post tagged by ticker, as delivered by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub entity_id: String,
    /// Numeric polarity cell; `None` when empty or not numeric.
    pub raw_sentiment: Option<f64>,
    pub posted_on: Option<NaiveDate>,
}

/// A document whose polarity has been normalized onto the binary scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub text: String,
    pub entity_id: String,
    pub sentiment: Polarity,
    pub posted_on: Option<NaiveDate>,
}

/// Documents sharing one entity id. Lives for one run only.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    pub entity_id: String,
    pub documents: Vec<ScoredDocument>,
}

impl EntityGroup {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.text.as_str()).collect()
    }
}

/// Entity-local topic id. Ids from different entities are unrelated and
/// must never be compared; cross-entity joins go through topic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicId {
    /// Unclustered document.
    Outlier,
    Topic(u32),
}

impl TopicId {
    pub fn local(self) -> Option<u32> {
        match self {
            Self::Outlier => None,
            Self::Topic(id) => Some(id),
        }
    }

    pub fn is_outlier(self) -> bool {
        self == Self::Outlier
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outlier => write!(f, "-1"),
            Self::Topic(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicAssignment {
    pub document_index: usize,
    pub topic_id: TopicId,
}

/// Result of clustering one entity's documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutput {
    pub assignments: Vec<TopicAssignment>,
    /// Most-salient keyword first. Used only for labels.
    pub keywords: BTreeMap<u32, Vec<String>>,
}

impl ClusterOutput {
    /// Build from one topic id per document, in document order.
    pub fn from_topics(topics: Vec<TopicId>, keywords: BTreeMap<u32, Vec<String>>) -> Self {
        let assignments = topics
            .into_iter()
            .enumerate()
            .map(|(document_index, topic_id)| TopicAssignment {
                document_index,
                topic_id,
            })
            .collect();
        Self {
            assignments,
            keywords,
        }
    }

    pub fn keywords_for(&self, topic_id: u32) -> &[String] {
        self.keywords
            .get(&topic_id)
            .map(|k| k.as_slice())
            .unwrap_or(&[])
    }
}

/// Where one document landed, outliers included.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTopic {
    pub entity_id: String,
    pub text: String,
    pub sentiment: Polarity,
    pub topic_id: TopicId,
}

/// Size and keywords of every topic an entity's clustering produced,
/// including the outlier bucket and topics beyond the kept top N.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicInfo {
    pub entity_id: String,
    pub topic_id: TopicId,
    pub document_count: usize,
    pub keywords: Vec<String>,
}

/// Aggregated sentiment of one (entity, topic) cell. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicStat {
    pub entity_id: String,
    pub topic_id: u32,
    pub topic_label: String,
    pub document_count: usize,
    /// Mean of the signed polarity, in `[-1, 1]`.
    pub mean_sentiment: f64,
    /// Share of positive documents, in `[0, 1]`.
    pub positive_ratio: f64,
    /// Leading keywords joined for export.
    pub top_words: String,
}

/// Why an entity produced no output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    BelowMinimumDocuments { count: usize, minimum: usize },
    NoClusteredDocuments { count: usize },
    ClusteringFailed { reason: String },
}

/// Observable record of an entity excluded by a data-sufficiency gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipNotice {
    pub entity_id: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkipNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::BelowMinimumDocuments { count, minimum } => write!(
                f,
                "{} skipped: {} documents < minimum {}",
                self.entity_id, count, minimum
            ),
            SkipReason::NoClusteredDocuments { count } => write!(
                f,
                "{} skipped: all {} documents unclustered",
                self.entity_id, count
            ),
            SkipReason::ClusteringFailed { reason } => {
                write!(f, "{} skipped: clustering failed ({})", self.entity_id, reason)
            }
        }
    }
}

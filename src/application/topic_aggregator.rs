use crate::application::label_generator::LabelGenerator;
use crate::domain::errors::PipelineError;
use crate::domain::ports::{TextEmbedder, TopicClusterer};
use crate::domain::sentiment::Polarity;
use crate::domain::types::{
    ClusterOutput, DocumentTopic, EntityGroup, SkipNotice, SkipReason, TopicAssignment, TopicId,
    TopicInfo, TopicStat,
};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-topic figures before labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSummary {
    pub topic_id: u32,
    pub document_count: usize,
    pub mean_sentiment: f64,
    pub positive_ratio: f64,
}

/// Everything one entity's clustering produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTopics {
    /// Top-N topics, ranked.
    pub stats: Vec<TopicStat>,
    /// Every topic id seen, outliers first.
    pub topic_info: Vec<TopicInfo>,
    /// One entry per input document, in input order.
    pub documents: Vec<DocumentTopic>,
}

/// Result of aggregating one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    Aggregated(EntityTopics),
    Skipped(SkipNotice),
}

/// Drives one clustering call per entity and turns the assignments into
/// [`TopicStat`] rows for that entity's most frequent topics.
pub struct TopicAggregator {
    embedder: Arc<dyn TextEmbedder>,
    clusterer: Arc<dyn TopicClusterer>,
    labels: LabelGenerator,
    topics_per_entity: usize,
}

impl TopicAggregator {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        clusterer: Arc<dyn TopicClusterer>,
        labels: LabelGenerator,
        topics_per_entity: usize,
    ) -> Self {
        Self {
            embedder,
            clusterer,
            labels,
            topics_per_entity,
        }
    }

    /// Aggregate a single entity. Failures are isolated and reported as skips.
    pub fn aggregate(&self, group: &EntityGroup) -> EntityOutcome {
        info!(
            "Topic clustering started - entity={}, documents={}",
            group.entity_id,
            group.len()
        );

        let output = match self.fit(group) {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    entity = %group.entity_id,
                    count = group.len(),
                    error = %e,
                    "Clustering failed, skipping entity"
                );
                return EntityOutcome::Skipped(SkipNotice {
                    entity_id: group.entity_id.clone(),
                    reason: SkipReason::ClusteringFailed {
                        reason: e.to_string(),
                    },
                });
            }
        };

        let topics = topic_per_document(group.len(), &output.assignments);
        let sentiments: Vec<Polarity> = group.documents.iter().map(|d| d.sentiment).collect();
        let mut summaries = summarize_topics(&sentiments, &topics);

        if summaries.is_empty() {
            warn!(
                entity = %group.entity_id,
                count = group.len(),
                "No clustered documents after outlier exclusion, skipping entity"
            );
            return EntityOutcome::Skipped(SkipNotice {
                entity_id: group.entity_id.clone(),
                reason: SkipReason::NoClusteredDocuments { count: group.len() },
            });
        }

        let total_topics = summaries.len();
        summaries.truncate(self.topics_per_entity);
        debug!(
            "Topics ranked - entity={}, found={}, kept={}",
            group.entity_id,
            total_topics,
            summaries.len()
        );

        let stats = summaries
            .into_iter()
            .map(|s| {
                let keywords = output.keywords_for(s.topic_id);
                TopicStat {
                    entity_id: group.entity_id.clone(),
                    topic_id: s.topic_id,
                    topic_label: self.labels.label(&group.entity_id, s.topic_id, keywords),
                    document_count: s.document_count,
                    mean_sentiment: s.mean_sentiment,
                    positive_ratio: s.positive_ratio,
                    top_words: self.labels.top_words(keywords),
                }
            })
            .collect();

        EntityOutcome::Aggregated(EntityTopics {
            stats,
            topic_info: topic_info(&group.entity_id, &topics, &output),
            documents: group
                .documents
                .iter()
                .zip(&topics)
                .map(|(document, topic_id)| DocumentTopic {
                    entity_id: group.entity_id.clone(),
                    text: document.text.clone(),
                    sentiment: document.sentiment,
                    topic_id: *topic_id,
                })
                .collect(),
        })
    }

    fn fit(&self, group: &EntityGroup) -> Result<ClusterOutput, PipelineError> {
        let texts = group.texts();
        let clustering_error = |reason: String| PipelineError::Clustering {
            entity: group.entity_id.clone(),
            reason,
        };

        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| clustering_error(format!("embedding failed: {}", e)))?;
        if embeddings.len() != texts.len() {
            return Err(clustering_error(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                texts.len()
            )));
        }

        let output = self
            .clusterer
            .cluster(&texts, &embeddings)
            .map_err(|e| clustering_error(e.to_string()))?;
        validate_assignments(texts.len(), &output).map_err(clustering_error)?;
        Ok(output)
    }
}

/// Assignments must reference each document at most once and stay in range.
fn validate_assignments(documents: usize, output: &ClusterOutput) -> Result<(), String> {
    let mut seen = vec![false; documents];
    for assignment in &output.assignments {
        let index = assignment.document_index;
        if index >= documents {
            return Err(format!(
                "assignment references document {} of {}",
                index, documents
            ));
        }
        if seen[index] {
            return Err(format!("document {} assigned twice", index));
        }
        seen[index] = true;
    }
    Ok(())
}

/// Documents without an assignment count as unclustered.
fn topic_per_document(documents: usize, assignments: &[TopicAssignment]) -> Vec<TopicId> {
    let mut topics = vec![TopicId::Outlier; documents];
    for assignment in assignments {
        topics[assignment.document_index] = assignment.topic_id;
    }
    topics
}

/// Document count and keywords per topic id in id order, the outlier
/// bucket first when present.
fn topic_info(entity_id: &str, topics: &[TopicId], output: &ClusterOutput) -> Vec<TopicInfo> {
    let mut counts: BTreeMap<TopicId, usize> = BTreeMap::new();
    for topic in topics {
        *counts.entry(*topic).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(topic_id, document_count)| TopicInfo {
            entity_id: entity_id.to_string(),
            topic_id,
            document_count,
            keywords: topic_id
                .local()
                .map(|id| output.keywords_for(id).to_vec())
                .unwrap_or_default(),
        })
        .collect()
}

/// Group sentiments by topic, ignoring outliers, and rank topics by
/// document count descending with ascending topic id on ties.
pub fn summarize_topics(sentiments: &[Polarity], topics: &[TopicId]) -> Vec<TopicSummary> {
    let mut by_topic: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (sentiment, topic) in sentiments.iter().zip(topics) {
        if let Some(id) = topic.local() {
            by_topic.entry(id).or_default().push(sentiment.as_f64());
        }
    }

    let mut summaries: Vec<TopicSummary> = by_topic
        .into_iter()
        .map(|(topic_id, values)| {
            let document_count = values.len();
            let positives = values.iter().filter(|v| **v > 0.0).count();
            TopicSummary {
                topic_id,
                document_count,
                mean_sentiment: values.iter().mean(),
                positive_ratio: positives as f64 / document_count as f64,
            }
        })
        .collect();

    // BTreeMap iteration is by ascending id; stable sort keeps that on ties
    summaries.sort_by(|a, b| b.document_count.cmp(&a.document_count));
    summaries
}

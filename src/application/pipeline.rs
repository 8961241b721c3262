use crate::application::daily_summary::{DailySentiment, summarize_by_day};
use crate::application::label_generator::LabelGenerator;
use crate::application::matrix_builder::{ComparisonMatrix, MatrixBuilder, Metric};
use crate::application::partitioner::EntityPartitioner;
use crate::application::ranking::{RankedExtract, RankingReporter};
use crate::application::ticker_summary::{TickerSentiment, summarize_by_ticker};
use crate::application::topic_aggregator::{EntityOutcome, TopicAggregator};
use crate::domain::errors::PipelineError;
use crate::domain::ports::{TextEmbedder, TopicClusterer};
use crate::domain::sentiment::SentimentNormalizer;
use crate::domain::types::{Document, DocumentTopic, SkipNotice, TopicInfo, TopicStat};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Knobs for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Maximum number of entities analyzed (K).
    pub top_entities: usize,
    /// Minimum documents an entity needs to be analyzed (M).
    pub min_documents: usize,
    /// Topics kept per entity (N).
    pub topics_per_entity: usize,
    /// Cluster entities concurrently on the rayon pool.
    pub parallel: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_entities: 10,
            min_documents: 80,
            topics_per_entity: 8,
            parallel: true,
        }
    }
}

/// Terminal artifacts of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    /// Long-form table, grouped by entity in analysis order.
    pub stats: Vec<TopicStat>,
    pub skipped: Vec<SkipNotice>,
    /// Entities that produced at least one topic row.
    pub analyzed_entities: Vec<String>,
    pub dropped_missing: usize,
    /// Every topic id per analyzed entity, outliers and truncated topics included.
    pub topic_info: Vec<TopicInfo>,
    /// Per-document topic assignments of analyzed entities.
    pub documents: Vec<DocumentTopic>,
    /// Topic-independent breakdown over every normalized document.
    pub ticker_summary: Vec<TickerSentiment>,
    /// Empty unless the input carried post dates.
    pub daily_summary: Vec<DailySentiment>,
}

impl PipelineOutcome {
    /// Empty but valid; the caller decides whether this is fatal.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn matrix(&self, metric: Metric) -> ComparisonMatrix {
        MatrixBuilder::build(&self.stats, metric)
    }

    pub fn ranked(&self, n: usize, metric: Metric) -> RankedExtract<TopicStat> {
        RankingReporter::extract(&self.stats, n, |s| metric.of(s))
    }
}

/// Normalize, partition, cluster per entity, aggregate.
pub struct TopicSentimentPipeline {
    aggregator: TopicAggregator,
    settings: PipelineSettings,
}

impl TopicSentimentPipeline {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        clusterer: Arc<dyn TopicClusterer>,
        settings: PipelineSettings,
    ) -> Self {
        Self::with_labels(embedder, clusterer, settings, LabelGenerator::default())
    }

    pub fn with_labels(
        embedder: Arc<dyn TextEmbedder>,
        clusterer: Arc<dyn TopicClusterer>,
        settings: PipelineSettings,
        labels: LabelGenerator,
    ) -> Self {
        Self {
            aggregator: TopicAggregator::new(embedder, clusterer, labels, settings.topics_per_entity),
            settings,
        }
    }

    /// Only schema violations in `documents` fail the run. Entity-level
    /// problems become skip notices in the outcome.
    pub fn run(&self, documents: &[Document]) -> Result<PipelineOutcome, PipelineError> {
        let corpus = SentimentNormalizer::normalize_documents(documents)?;
        let ticker_summary = summarize_by_ticker(&corpus.documents);
        let daily_summary = summarize_by_day(&corpus.documents);

        let partition = EntityPartitioner::new(self.settings.top_entities, self.settings.min_documents)
            .partition(corpus.documents);
        info!(
            "Entities selected for topic analysis: {:?}",
            partition.entity_ids()
        );

        // Indexed collect keeps partition order regardless of scheduling
        let outcomes: Vec<EntityOutcome> = if self.settings.parallel {
            partition
                .groups
                .par_iter()
                .map(|group| self.aggregator.aggregate(group))
                .collect()
        } else {
            partition
                .groups
                .iter()
                .map(|group| self.aggregator.aggregate(group))
                .collect()
        };

        let mut outcome = PipelineOutcome {
            skipped: partition.skipped,
            dropped_missing: corpus.dropped_missing,
            ticker_summary,
            daily_summary,
            ..PipelineOutcome::default()
        };
        for (group, entity_outcome) in partition.groups.iter().zip(outcomes) {
            match entity_outcome {
                EntityOutcome::Aggregated(entity) => {
                    info!(
                        "Topic aggregation complete - entity={}, topics={}",
                        group.entity_id,
                        entity.stats.len()
                    );
                    outcome.analyzed_entities.push(group.entity_id.clone());
                    outcome.stats.extend(entity.stats);
                    outcome.topic_info.extend(entity.topic_info);
                    outcome.documents.extend(entity.documents);
                }
                EntityOutcome::Skipped(notice) => outcome.skipped.push(notice),
            }
        }

        if outcome.is_empty() {
            warn!(
                skipped = outcome.skipped.len(),
                "No topic statistics produced; result is empty"
            );
        } else {
            info!(
                "Pipeline complete - entities={}, topic_rows={}, skipped={}",
                outcome.analyzed_entities.len(),
                outcome.stats.len(),
                outcome.skipped.len()
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ClusterOutput, SkipReason, TopicId};
    use anyhow::Result;
    use std::collections::BTreeMap;

    struct UnitEmbedder;

    impl TextEmbedder for UnitEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]; texts.len()])
        }
    }

    /// Topic = first whitespace token parsed as a number, `x` = outlier.
    struct PrefixClusterer;

    impl TopicClusterer for PrefixClusterer {
        fn cluster(&self, texts: &[&str], _embeddings: &[Vec<f32>]) -> Result<ClusterOutput> {
            let topics: Vec<TopicId> = texts
                .iter()
                .map(|t| match t.split_whitespace().next().and_then(|w| w.parse().ok()) {
                    Some(id) => TopicId::Topic(id),
                    None => TopicId::Outlier,
                })
                .collect();
            let keywords: BTreeMap<u32, Vec<String>> = topics
                .iter()
                .filter_map(|t| t.local())
                .map(|id| (id, vec![format!("w{}", id)]))
                .collect();
            Ok(ClusterOutput::from_topics(topics, keywords))
        }
    }

    fn document(entity: &str, text: &str, raw: f64) -> Document {
        Document {
            text: text.to_string(),
            entity_id: entity.to_string(),
            raw_sentiment: Some(raw),
            posted_on: None,
        }
    }

    fn settings(min_documents: usize, parallel: bool) -> PipelineSettings {
        PipelineSettings {
            top_entities: 10,
            min_documents,
            topics_per_entity: 8,
            parallel,
        }
    }

    fn pipeline(min_documents: usize, parallel: bool) -> TopicSentimentPipeline {
        TopicSentimentPipeline::new(
            Arc::new(UnitEmbedder),
            Arc::new(PrefixClusterer),
            settings(min_documents, parallel),
        )
    }

    #[test]
    fn test_schema_violation_is_fatal() {
        let docs = vec![document("A", "0 a", 1.0), document("A", "0 b", 3.0)];
        let err = pipeline(1, false).run(&docs).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPolarity { row: 1, .. }));
    }

    #[test]
    fn test_unclustered_entity_is_skipped_others_continue() {
        let docs = vec![
            document("A", "0 a", 1.0),
            document("A", "0 b", 0.0),
            document("B", "x a", 1.0),
            document("B", "x b", 1.0),
        ];
        let outcome = pipeline(1, true).run(&docs).unwrap();

        assert_eq!(outcome.analyzed_entities, vec!["A"]);
        assert_eq!(outcome.stats.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].entity_id, "B");
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::NoClusteredDocuments { count: 2 }
        );
        // Assignments are carried only for analyzed entities
        assert_eq!(outcome.documents.len(), 2);
        assert!(outcome.documents.iter().all(|d| d.entity_id == "A"));
        assert_eq!(outcome.topic_info.len(), 1);
        assert_eq!(outcome.topic_info[0].document_count, 2);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let docs = vec![document("A", "0 a", 1.0)];
        let outcome = pipeline(5, false).run(&docs).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.matrix(Metric::MeanSentiment).dimensions(), (0, 0));
        assert_eq!(outcome.ticker_summary.len(), 1);
    }

    #[test]
    fn test_parallel_and_sequential_runs_match() {
        let docs: Vec<Document> = (0..60)
            .map(|i| {
                let entity = ["A", "B", "C"][i % 3];
                let raw = if i % 4 == 0 { 1.0 } else { 0.0 };
                document(entity, &format!("{} post", i % 5), raw)
            })
            .collect();

        let sequential = pipeline(1, false).run(&docs).unwrap();
        let parallel = pipeline(1, true).run(&docs).unwrap();
        assert_eq!(sequential.stats, parallel.stats);
        assert_eq!(sequential.skipped, parallel.skipped);
    }
}

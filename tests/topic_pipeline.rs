use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use topicsense::application::matrix_builder::Metric;
use topicsense::application::pipeline::{PipelineSettings, TopicSentimentPipeline};
use topicsense::application::ranking::RankingReporter;
use topicsense::domain::ports::{TextEmbedder, TopicClusterer};
use topicsense::domain::types::{ClusterOutput, Document, SkipReason, TopicId};
use topicsense::infrastructure::export::{CsvExporter, FULL_TABLE_FILE};

// --- Stubs ---

struct ZeroEmbedder;

impl TextEmbedder for ZeroEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.0; 4]; texts.len()])
    }
}

/// Assigns consecutive runs of documents to topics 0, 1, ...; the rest are
/// outliers.
struct RunLengthClusterer {
    sizes: Vec<usize>,
}

impl TopicClusterer for RunLengthClusterer {
    fn cluster(&self, texts: &[&str], _embeddings: &[Vec<f32>]) -> Result<ClusterOutput> {
        let mut topics = vec![TopicId::Outlier; texts.len()];
        let mut start = 0;
        for (id, size) in self.sizes.iter().enumerate() {
            let end = (start + size).min(texts.len());
            for topic in &mut topics[start..end] {
                *topic = TopicId::Topic(id as u32);
            }
            start = end;
        }

        let keywords: BTreeMap<u32, Vec<String>> = (0..self.sizes.len() as u32)
            .map(|id| (id, vec![format!("alpha{}", id), format!("beta{}", id)]))
            .collect();
        Ok(ClusterOutput::from_topics(topics, keywords))
    }
}

fn alternating(entity: &str, count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| Document {
            text: format!("post {} about {}", i, entity),
            entity_id: entity.to_string(),
            raw_sentiment: Some(if i % 2 == 0 { 1.0 } else { 0.0 }),
            posted_on: None,
        })
        .collect()
}

fn pipeline(sizes: Vec<usize>, min_documents: usize) -> TopicSentimentPipeline {
    TopicSentimentPipeline::new(
        Arc::new(ZeroEmbedder),
        Arc::new(RunLengthClusterer { sizes }),
        PipelineSettings {
            min_documents,
            ..PipelineSettings::default()
        },
    )
}

#[test]
fn test_hundred_documents_two_topics_and_outliers() {
    let outcome = pipeline(vec![60, 30], 80)
        .run(&alternating("A", 100))
        .unwrap();

    assert_eq!(outcome.stats.len(), 2);
    let counts: Vec<usize> = outcome.stats.iter().map(|s| s.document_count).collect();
    assert_eq!(counts, vec![60, 30]);
    for stat in &outcome.stats {
        assert_eq!(stat.entity_id, "A");
        assert!(stat.mean_sentiment.abs() < 1e-9);
        assert!((stat.positive_ratio - 0.5).abs() < 1e-9);
    }
    assert_eq!(outcome.stats[0].topic_label, "A | T0(alpha0/beta0)");
    assert_eq!(outcome.stats[1].top_words, "alpha1, beta1");
}

#[test]
fn test_entity_below_minimum_has_no_rows_or_column() {
    let mut documents = alternating("A", 100);
    documents.extend(alternating("B", 5));

    let outcome = pipeline(vec![60, 30], 80).run(&documents).unwrap();

    assert!(outcome.stats.iter().all(|s| s.entity_id != "B"));
    assert_eq!(outcome.analyzed_entities, vec!["A".to_string()]);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(outcome.skipped.iter().any(|n| n.entity_id == "B"
        && n.reason
            == SkipReason::BelowMinimumDocuments {
                count: 5,
                minimum: 80
            }));

    for metric in Metric::ALL {
        let matrix = outcome.matrix(metric);
        assert_eq!(matrix.column_ids(), ["A".to_string()]);
        assert_eq!(matrix.dimensions(), (2, 1));
    }
}

#[test]
fn test_rank_limit_larger_than_table() {
    let outcome = pipeline(vec![10, 10, 10], 1).run(&alternating("A", 30)).unwrap();
    assert_eq!(outcome.stats.len(), 3);

    let ranked = outcome.ranked(10, Metric::MeanSentiment);
    assert_eq!(ranked.top.len(), 3);
    assert_eq!(ranked.bottom.len(), 3);
    assert!(
        ranked
            .top
            .windows(2)
            .all(|w| w[0].mean_sentiment >= w[1].mean_sentiment)
    );

    let bottom = RankingReporter::bottom_n(&outcome.stats, 10, |s| s.positive_ratio);
    assert!(bottom.windows(2).all(|w| w[0].positive_ratio <= w[1].positive_ratio));
}

#[test]
fn test_matrix_cells_cover_every_pair() {
    let mut documents = alternating("A", 20);
    documents.extend(alternating("B", 20));
    let outcome = pipeline(vec![10, 5], 1).run(&documents).unwrap();

    let matrix = outcome.matrix(Metric::PositiveRatio);
    let (rows, columns) = matrix.dimensions();
    assert_eq!((rows, columns), (4, 2));
    for stat in &outcome.stats {
        assert_eq!(
            matrix.get(&stat.topic_label, &stat.entity_id),
            Some(stat.positive_ratio)
        );
    }
    // Labels embed the entity, so the other column is filled
    assert_eq!(matrix.get("A | T0(alpha0/beta0)", "B"), Some(0.0));
}

#[test]
fn test_repeated_runs_export_identical_bytes() {
    let mut documents = alternating("A", 90);
    documents.extend(alternating("B", 85));
    documents.extend(alternating("C", 3));
    let pipeline = pipeline(vec![40, 20, 10], 80);

    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    for dir in [&first_dir, &second_dir] {
        let outcome = pipeline.run(&documents).unwrap();
        CsvExporter::new(dir.path())
            .unwrap()
            .export_all(&outcome, 15)
            .unwrap();
    }

    for file in [
        FULL_TABLE_FILE,
        "matrix_mean_sentiment.csv",
        "matrix_positive_ratio.csv",
        "top15_topics_by_mean_sent.csv",
    ] {
        let first = fs::read(first_dir.path().join(file)).unwrap();
        let second = fs::read(second_dir.path().join(file)).unwrap();
        assert!(!first.is_empty(), "{} is empty", file);
        assert_eq!(first, second, "{} differs between runs", file);
    }
}

#[test]
fn test_parallel_flag_does_not_change_results() {
    let mut documents = alternating("A", 50);
    documents.extend(alternating("B", 40));

    let run = |parallel: bool| {
        TopicSentimentPipeline::new(
            Arc::new(ZeroEmbedder),
            Arc::new(RunLengthClusterer { sizes: vec![20, 15] }),
            PipelineSettings {
                min_documents: 10,
                parallel,
                ..PipelineSettings::default()
            },
        )
        .run(&documents)
        .unwrap()
    };

    assert_eq!(run(true).stats, run(false).stats);
}

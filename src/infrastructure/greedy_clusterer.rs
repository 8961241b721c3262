use crate::domain::ports::TopicClusterer;
use crate::domain::types::{ClusterOutput, TopicId};
use crate::infrastructure::tfidf::tokenize;
use anyhow::{Result, bail};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    pub threshold: f32,        // cosine similarity to the seed, e.g. 0.3
    pub min_topic_size: usize, // smaller clusters become outliers
    pub keywords_per_topic: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_topic_size: 10,
            keywords_per_topic: 5,
        }
    }
}

/// Deterministic seed clustering over document embeddings.
///
/// Each unassigned document in input order seeds a cluster and absorbs every
/// later unassigned document whose cosine similarity to it reaches the
/// threshold. Clusters below `min_topic_size` are outliers. Surviving
/// clusters are numbered from 0 by size, largest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyThresholdClusterer {
    params: ClusterParams,
}

impl GreedyThresholdClusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    fn seed_clusters(&self, embeddings: &[Vec<f32>]) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; embeddings.len()];
        let mut clusters = Vec::new();

        for i in 0..embeddings.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut members = vec![i];

            let seed = &embeddings[i];
            let similar: Vec<usize> = (i + 1..embeddings.len())
                .into_par_iter()
                .filter(|&j| {
                    !assigned[j] && cosine_similarity(seed, &embeddings[j]) >= self.params.threshold
                })
                .collect();
            for j in similar {
                assigned[j] = true;
                members.push(j);
            }
            clusters.push(members);
        }
        clusters
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Class-based TF-IDF: a term scores high when frequent inside the topic and
/// rare across topics. Ties break by term.
pub fn topic_keywords(
    texts: &[&str],
    topics: &[TopicId],
    keywords_per_topic: usize,
) -> BTreeMap<u32, Vec<String>> {
    let mut topic_terms: BTreeMap<u32, BTreeMap<String, usize>> = BTreeMap::new();
    for (text, topic) in texts.iter().zip(topics) {
        if let Some(id) = topic.local() {
            let counts = topic_terms.entry(id).or_default();
            for token in tokenize(text) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
    }
    if topic_terms.is_empty() {
        return BTreeMap::new();
    }

    let mut term_totals: BTreeMap<&str, usize> = BTreeMap::new();
    for counts in topic_terms.values() {
        for (term, count) in counts {
            *term_totals.entry(term.as_str()).or_insert(0) += count;
        }
    }
    let total_words: usize = term_totals.values().sum();
    let avg_words = total_words as f64 / topic_terms.len() as f64;

    topic_terms
        .iter()
        .map(|(id, counts)| {
            let mut scored: Vec<(&str, f64)> = counts
                .iter()
                .map(|(term, tf)| {
                    let total = term_totals[term.as_str()] as f64;
                    (term.as_str(), *tf as f64 * (1.0 + avg_words / total).ln())
                })
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let words = scored
                .into_iter()
                .take(keywords_per_topic)
                .map(|(term, _)| term.to_string())
                .collect();
            (*id, words)
        })
        .collect()
}

impl TopicClusterer for GreedyThresholdClusterer {
    fn cluster(&self, texts: &[&str], embeddings: &[Vec<f32>]) -> Result<ClusterOutput> {
        if texts.len() != embeddings.len() {
            bail!(
                "{} texts but {} embeddings",
                texts.len(),
                embeddings.len()
            );
        }

        let mut kept: Vec<Vec<usize>> = self
            .seed_clusters(embeddings)
            .into_iter()
            .filter(|members| members.len() >= self.params.min_topic_size)
            .collect();
        // Members are pushed seed first, so members[0] is the smallest index
        kept.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

        let mut topics = vec![TopicId::Outlier; texts.len()];
        for (id, members) in kept.iter().enumerate() {
            for &index in members {
                topics[index] = TopicId::Topic(id as u32);
            }
        }

        let keywords = topic_keywords(texts, &topics, self.params.keywords_per_topic);
        debug!(
            "Clustering finished - documents={}, topics={}, outliers={}",
            texts.len(),
            kept.len(),
            topics.iter().filter(|t| t.is_outlier()).count()
        );
        Ok(ClusterOutput::from_topics(topics, keywords))
    }
}

use super::{Lookup, parse_var};
use crate::infrastructure::greedy_clusterer::ClusterParams;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEnvConfig {
    pub similarity_threshold: f32,
    pub min_topic_size: usize,
    pub keywords_per_topic: usize,
    pub tfidf_min_df: usize,
}

impl Default for ClusterEnvConfig {
    fn default() -> Self {
        let params = ClusterParams::default();
        Self {
            similarity_threshold: params.threshold,
            min_topic_size: params.min_topic_size,
            keywords_per_topic: params.keywords_per_topic,
            tfidf_min_df: 2,
        }
    }
}

impl ClusterEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            similarity_threshold: parse_var(
                lookup,
                "CLUSTER_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            )?,
            min_topic_size: parse_var(lookup, "CLUSTER_MIN_TOPIC_SIZE", defaults.min_topic_size)?,
            keywords_per_topic: parse_var(lookup, "CLUSTER_KEYWORDS", defaults.keywords_per_topic)?,
            tfidf_min_df: parse_var(lookup, "TFIDF_MIN_DF", defaults.tfidf_min_df)?,
        })
    }

    pub(super) fn apply(&mut self, overlay: ClusterOverlay) {
        if let Some(v) = overlay.similarity_threshold {
            self.similarity_threshold = v;
        }
        if let Some(v) = overlay.min_topic_size {
            self.min_topic_size = v;
        }
        if let Some(v) = overlay.keywords_per_topic {
            self.keywords_per_topic = v;
        }
        if let Some(v) = overlay.tfidf_min_df {
            self.tfidf_min_df = v;
        }
    }

    pub fn to_cluster_params(&self) -> ClusterParams {
        ClusterParams {
            threshold: self.similarity_threshold,
            min_topic_size: self.min_topic_size,
            keywords_per_topic: self.keywords_per_topic,
        }
    }
}

/// `[cluster]` table of a TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterOverlay {
    pub similarity_threshold: Option<f32>,
    pub min_topic_size: Option<usize>,
    pub keywords_per_topic: Option<usize>,
    pub tfidf_min_df: Option<usize>,
}

//! Runtime configuration.
//!
//! Values come from environment variables (a `.env` file is loaded by the
//! binary), and an optional TOML file overlays them table by table:
//!
//! ```toml
//! [pipeline]
//! top_tickers = 5
//!
//! [cluster]
//! similarity_threshold = 0.35
//! ```

mod cluster_config;
mod ingest_config;
mod pipeline_config;

pub use cluster_config::{ClusterEnvConfig, ClusterOverlay};
pub use ingest_config::{IngestEnvConfig, IngestOverlay};
pub use pipeline_config::{PipelineEnvConfig, PipelineOverlay};

use crate::application::label_generator::LabelGenerator;
use crate::application::pipeline::PipelineSettings;
use crate::domain::errors::PipelineError;
use crate::infrastructure::tfidf::TfIdfEmbedder;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Key to value resolver, `env::var` in production.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn parse_var<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub pipeline: PipelineEnvConfig,
    pub ingest: IngestEnvConfig,
    pub cluster: ClusterEnvConfig,
}

/// Shape of a TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    pub pipeline: PipelineOverlay,
    pub ingest: IngestOverlay,
    pub cluster: ClusterOverlay,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            pipeline: PipelineEnvConfig::from_lookup(lookup)?,
            ingest: IngestEnvConfig::from_lookup(lookup),
            cluster: ClusterEnvConfig::from_lookup(lookup)?,
        })
    }

    /// Environment first, then the TOML file if given, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            config
                .apply_toml(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let overlay: ConfigOverlay = toml::from_str(raw).context("Failed to parse TOML")?;
        self.apply(overlay);
        Ok(())
    }

    pub fn apply(&mut self, overlay: ConfigOverlay) {
        self.pipeline.apply(overlay.pipeline);
        self.ingest.apply(overlay.ingest);
        self.cluster.apply(overlay.cluster);
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("TOP_TICKERS", self.pipeline.top_tickers),
            ("TOPICS_PER_TICKER", self.pipeline.topics_per_ticker),
            ("RANK_LIMIT", self.pipeline.rank_limit),
            ("CLUSTER_MIN_TOPIC_SIZE", self.cluster.min_topic_size),
            ("TFIDF_MIN_DF", self.cluster.tfidf_min_df),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "{} must be greater than 0",
                key
            )));
        }

        let threshold = self.cluster.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "CLUSTER_SIMILARITY_THRESHOLD must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.ingest.entity_column == self.ingest.text_column {
            return Err(PipelineError::InvalidConfig(format!(
                "ENTITY_COLUMN and TEXT_COLUMN must differ, both are '{}'",
                self.ingest.entity_column
            )));
        }
        Ok(())
    }

    pub fn to_pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            top_entities: self.pipeline.top_tickers,
            min_documents: self.pipeline.min_docs_ticker,
            topics_per_entity: self.pipeline.topics_per_ticker,
            parallel: self.pipeline.parallel,
        }
    }

    pub fn to_embedder(&self) -> TfIdfEmbedder {
        TfIdfEmbedder::new(self.cluster.tfidf_min_df)
    }

    /// Labels keep two keywords; `top_words` lists every extracted keyword.
    pub fn to_label_generator(&self) -> LabelGenerator {
        LabelGenerator::new(2, self.cluster.keywords_per_topic)
    }
}

use crate::domain::sentiment::Polarity;
use crate::domain::types::ClusterOutput;
use anyhow::Result;

/// Produces one embedding vector per input text.
///
/// Called once per entity with that entity's documents only.
pub trait TextEmbedder: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Fits topics over one entity's documents.
///
/// Treated as a pure function of its input: `texts[i]` and `embeddings[i]`
/// describe the same document, and assignments refer to those indices.
pub trait TopicClusterer: Send + Sync {
    fn cluster(&self, texts: &[&str], embeddings: &[Vec<f32>]) -> Result<ClusterOutput>;
}

/// Assigns a binary polarity to a piece of text.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Polarity;
}

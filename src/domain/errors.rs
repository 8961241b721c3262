use thiserror::Error;

/// Errors raised while turning raw posts into topic-sentiment aggregates.
///
/// Only `Schema` and `InvalidPolarity` abort a run. `Clustering` is produced
/// by per-entity stages and is downgraded to a skip notice by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Schema error on field '{field}': {reason}")]
    Schema { field: String, reason: String },

    #[error("Invalid polarity value {value} at row {row}: expected one of -1, 0, 1")]
    InvalidPolarity { row: usize, value: f64 },

    #[error("Clustering failed for {entity}: {reason}")]
    Clustering { entity: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Clustering { .. })
    }
}

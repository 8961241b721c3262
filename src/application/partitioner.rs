use crate::domain::types::{EntityGroup, ScoredDocument, SkipNotice, SkipReason};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Entities selected for analysis, in descending document-count order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub groups: Vec<EntityGroup>,
    pub skipped: Vec<SkipNotice>,
    /// Entities meeting the minimum but ranked below the top-K cutoff.
    pub beyond_top_k: usize,
}

impl Partition {
    pub fn entity_ids(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.entity_id.as_str()).collect()
    }
}

/// Splits the corpus into per-entity groups with a minimum-sample gate.
#[derive(Debug, Clone, Copy)]
pub struct EntityPartitioner {
    top_k: usize,
    min_documents: usize,
}

impl EntityPartitioner {
    pub fn new(top_k: usize, min_documents: usize) -> Self {
        Self {
            top_k,
            min_documents,
        }
    }

    /// Group by entity, rank by count descending (ties keep first-seen order)
    /// and keep the first `top_k` entities with at least `min_documents`.
    pub fn partition(&self, documents: Vec<ScoredDocument>) -> Partition {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<EntityGroup> = Vec::new();

        for document in documents {
            match index.get(&document.entity_id) {
                Some(&slot) => groups[slot].documents.push(document),
                None => {
                    index.insert(document.entity_id.clone(), groups.len());
                    groups.push(EntityGroup {
                        entity_id: document.entity_id.clone(),
                        documents: vec![document],
                    });
                }
            }
        }

        // sort_by is stable, so equal counts stay in first-seen order
        groups.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut partition = Partition::default();
        for group in groups {
            let count = group.len();
            if count < self.min_documents {
                warn!(
                    entity = %group.entity_id,
                    count,
                    minimum = self.min_documents,
                    "Insufficient data, skipping entity"
                );
                partition.skipped.push(SkipNotice {
                    entity_id: group.entity_id,
                    reason: SkipReason::BelowMinimumDocuments {
                        count,
                        minimum: self.min_documents,
                    },
                });
            } else if partition.groups.len() < self.top_k {
                partition.groups.push(group);
            } else {
                partition.beyond_top_k += 1;
            }
        }

        debug!(
            "Partition complete - selected={}, skipped={}, beyond_top_k={}",
            partition.groups.len(),
            partition.skipped.len(),
            partition.beyond_top_k
        );
        partition
    }
}

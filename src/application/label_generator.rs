/// Placeholder used when a topic has no usable keywords.
pub const GENERIC_TOPIC_WORD: &str = "topic";

/// Derives display labels and keyword summaries for entity-local topics.
///
/// Labels embed both the entity and the local topic id, so they are unique
/// within a run and serve as the cross-entity join key of the comparison
/// matrix: `"{entity} | T{id}({kw1}/{kw2})"`.
#[derive(Debug, Clone, Copy)]
pub struct LabelGenerator {
    label_keywords: usize,
    summary_keywords: usize,
}

impl Default for LabelGenerator {
    fn default() -> Self {
        Self {
            label_keywords: 2,
            summary_keywords: 5,
        }
    }
}

impl LabelGenerator {
    pub fn new(label_keywords: usize, summary_keywords: usize) -> Self {
        Self {
            label_keywords: label_keywords.max(1),
            summary_keywords,
        }
    }

    pub fn label(&self, entity_id: &str, topic_id: u32, keywords: &[String]) -> String {
        let words = usable(keywords);
        let short = if words.is_empty() {
            GENERIC_TOPIC_WORD.to_string()
        } else {
            words
                .iter()
                .take(self.label_keywords)
                .copied()
                .collect::<Vec<_>>()
                .join("/")
        };
        format!("{} | T{}({})", entity_id, topic_id, short)
    }

    /// Leading keywords joined with `", "`, for export tables.
    pub fn top_words(&self, keywords: &[String]) -> String {
        usable(keywords)
            .into_iter()
            .take(self.summary_keywords)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn usable(keywords: &[String]) -> Vec<&str> {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect()
}

//! TF-IDF document vectors, fitted per batch.
//!
//! - sublinear tf: `1 + ln(count)`
//! - smooth idf: `ln((1 + n) / (1 + df)) + 1`
//! - terms below `min_df` are dropped; rows are L2-normalized
//!
//! The vocabulary is sorted so the same batch always yields the same vectors.

use crate::domain::ports::TextEmbedder;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Lower-cased whitespace tokens with surrounding punctuation stripped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct TfIdfEmbedder {
    min_df: usize,
}

impl Default for TfIdfEmbedder {
    fn default() -> Self {
        Self { min_df: 2 }
    }
}

impl TfIdfEmbedder {
    pub fn new(min_df: usize) -> Self {
        Self {
            min_df: min_df.max(1),
        }
    }

    /// Sorted vocabulary and smooth idf weights for a tokenized corpus.
    pub fn fit(&self, corpus: &[Vec<String>]) -> (Vec<String>, Vec<f64>) {
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.min_df)
            .map(|(term, df)| (term.to_string(), ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .unzip()
    }

    pub fn transform(corpus: &[Vec<String>], vocabulary: &[String], idf: &[f64]) -> Vec<Vec<f32>> {
        corpus
            .iter()
            .map(|doc| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for term in doc {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }

                let mut row = vec![0.0f64; vocabulary.len()];
                for (term, count) in counts {
                    if let Ok(col) = vocabulary.binary_search_by(|v| v.as_str().cmp(term)) {
                        row[col] = (1.0 + (count as f64).ln()) * idf[col];
                    }
                }

                let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
                row.into_iter()
                    .map(|x| if norm > 0.0 { (x / norm) as f32 } else { 0.0 })
                    .collect()
            })
            .collect()
    }
}

impl TextEmbedder for TfIdfEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let corpus: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
        let (vocabulary, idf) = self.fit(&corpus);
        Ok(Self::transform(&corpus, &vocabulary, &idf))
    }
}

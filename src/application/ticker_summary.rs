use crate::domain::types::ScoredDocument;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-ticker sentiment breakdown, independent of topics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSentiment {
    pub ticker: String,
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// Percent, rounded to two decimals.
    pub positive_pct: f64,
    pub negative_pct: f64,
    /// `positive_pct - negative_pct`, in `[-100, 100]`.
    pub sentiment_score: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Count polarities per ticker and sort by sentiment score descending.
/// Tickers with equal scores stay in ascending ticker order.
pub fn summarize_by_ticker(documents: &[ScoredDocument]) -> Vec<TickerSentiment> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for document in documents {
        let entry = counts.entry(document.entity_id.as_str()).or_insert((0, 0));
        if document.sentiment.is_positive() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut summary: Vec<TickerSentiment> = counts
        .into_iter()
        .map(|(ticker, (positive, negative))| {
            let total = positive + negative;
            let positive_pct = round2(positive as f64 / total as f64 * 100.0);
            let negative_pct = round2(negative as f64 / total as f64 * 100.0);
            TickerSentiment {
                ticker: ticker.to_string(),
                total,
                positive,
                negative,
                positive_pct,
                negative_pct,
                sentiment_score: round2(positive_pct - negative_pct),
            }
        })
        .collect();

    summary.sort_by(|a, b| b.sentiment_score.total_cmp(&a.sentiment_score));
    summary
}

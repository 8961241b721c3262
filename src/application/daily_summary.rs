use crate::domain::types::ScoredDocument;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Positive/negative share of all posts written on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySentiment {
    pub day: NaiveDate,
    pub total: usize,
    /// Percent, rounded to two decimals.
    pub pos_ratio: f64,
    pub neg_ratio: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Days in ascending order. Posts without a date are ignored, so an input
/// without a date column yields an empty series.
pub fn summarize_by_day(documents: &[ScoredDocument]) -> Vec<DailySentiment> {
    let mut counts: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for document in documents {
        let Some(day) = document.posted_on else {
            continue;
        };
        let entry = counts.entry(day).or_insert((0, 0));
        if document.sentiment.is_positive() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(day, (positive, negative))| {
            let total = positive + negative;
            DailySentiment {
                day,
                total,
                pos_ratio: round2(positive as f64 / total as f64 * 100.0),
                neg_ratio: round2(negative as f64 / total as f64 * 100.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::Polarity;

    fn post(day: Option<(i32, u32, u32)>, sentiment: Polarity) -> ScoredDocument {
        ScoredDocument {
            text: String::new(),
            entity_id: "A".to_string(),
            sentiment,
            posted_on: day.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    #[test]
    fn test_days_are_ascending_with_ratios() {
        let docs = vec![
            post(Some((2024, 3, 2)), Polarity::Negative),
            post(Some((2024, 3, 1)), Polarity::Positive),
            post(Some((2024, 3, 1)), Polarity::Negative),
            post(Some((2024, 3, 1)), Polarity::Negative),
            post(None, Polarity::Positive),
        ];
        let days = summarize_by_day(&docs);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days[0].total, 3);
        assert_eq!(days[0].pos_ratio, 33.33);
        assert_eq!(days[0].neg_ratio, 66.67);
        assert_eq!(days[1].neg_ratio, 100.0);
    }

    #[test]
    fn test_undated_posts_give_empty_series() {
        let docs = vec![post(None, Polarity::Positive), post(None, Polarity::Negative)];
        assert!(summarize_by_day(&docs).is_empty());
    }
}

use crate::domain::errors::PipelineError;
use crate::domain::types::{Document, ScoredDocument};
use std::fmt;
use tracing::debug;

/// Canonical two-valued sentiment scale. There is no neutral class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Signed encoding: `1` for positive, `-1` for negative.
    pub fn value(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    pub fn is_positive(self) -> bool {
        self == Self::Positive
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// How a raw polarity column was encoded before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityEncoding {
    /// Every present value is `0` or `1`.
    ZeroOne,
    /// Every present value is `-1` or `1`.
    SignedUnit,
    /// Both `-1` and `0` occur; `0` is still read as negative.
    Mixed,
    /// No present values at all.
    Empty,
}

/// Documents that survived normalization, plus how many were dropped for a
/// missing polarity.
#[derive(Debug, Clone, Default)]
pub struct NormalizedCorpus {
    pub documents: Vec<ScoredDocument>,
    pub dropped_missing: usize,
}

/// Maps heterogeneous polarity encodings onto [`Polarity`].
pub struct SentimentNormalizer;

impl SentimentNormalizer {
    /// Map a single raw value. `Ok(None)` means missing.
    ///
    /// `0 -> Negative`, `1 -> Positive`, `-1 -> Negative`. NaN counts as missing.
    pub fn normalize_value(row: usize, raw: Option<f64>) -> Result<Option<Polarity>, PipelineError> {
        let Some(value) = raw else {
            return Ok(None);
        };
        if value.is_nan() {
            return Ok(None);
        }
        if value == 1.0 {
            Ok(Some(Polarity::Positive))
        } else if value == 0.0 || value == -1.0 {
            Ok(Some(Polarity::Negative))
        } else {
            Err(PipelineError::InvalidPolarity { row, value })
        }
    }

    /// Normalize a whole column, preserving length. Any out-of-domain value fails
    /// the entire column.
    pub fn normalize(raw: &[Option<f64>]) -> Result<Vec<Option<Polarity>>, PipelineError> {
        raw.iter()
            .enumerate()
            .map(|(row, value)| Self::normalize_value(row, *value))
            .collect()
    }

    pub fn detect_encoding(raw: &[Option<f64>]) -> PolarityEncoding {
        let present = || raw.iter().flatten().filter(|v| !v.is_nan());
        let has_zero = present().any(|v| *v == 0.0);
        let has_minus_one = present().any(|v| *v == -1.0);

        match (present().next().is_some(), has_zero, has_minus_one) {
            (false, _, _) => PolarityEncoding::Empty,
            (true, true, true) => PolarityEncoding::Mixed,
            (true, true, false) => PolarityEncoding::ZeroOne,
            (true, false, _) => PolarityEncoding::SignedUnit,
        }
    }

    /// Normalize the polarity of every document, dropping rows whose value is
    /// missing. Fails on the first out-of-domain value.
    pub fn normalize_documents(documents: &[Document]) -> Result<NormalizedCorpus, PipelineError> {
        let raw: Vec<Option<f64>> = documents.iter().map(|d| d.raw_sentiment).collect();
        let encoding = Self::detect_encoding(&raw);
        let polarities = Self::normalize(&raw)?;

        let mut corpus = NormalizedCorpus::default();
        for (document, polarity) in documents.iter().zip(polarities) {
            match polarity {
                Some(sentiment) => corpus.documents.push(ScoredDocument {
                    text: document.text.clone(),
                    entity_id: document.entity_id.clone(),
                    sentiment,
                    posted_on: document.posted_on,
                }),
                None => corpus.dropped_missing += 1,
            }
        }

        debug!(
            "Sentiment normalized - encoding={:?}, kept={}, dropped_missing={}",
            encoding,
            corpus.documents.len(),
            corpus.dropped_missing
        );
        Ok(corpus)
    }
}

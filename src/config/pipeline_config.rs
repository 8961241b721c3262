use super::{Lookup, parse_var};
use anyhow::Result;
use serde::Deserialize;

/// Selection and ranking knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEnvConfig {
    pub top_tickers: usize,
    pub topics_per_ticker: usize,
    pub min_docs_ticker: usize,
    pub rank_limit: usize,
    pub parallel: bool,
}

impl Default for PipelineEnvConfig {
    fn default() -> Self {
        Self {
            top_tickers: 10,
            topics_per_ticker: 8,
            min_docs_ticker: 80,
            rank_limit: 15,
            parallel: true,
        }
    }
}

impl PipelineEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            top_tickers: parse_var(lookup, "TOP_TICKERS", defaults.top_tickers)?,
            topics_per_ticker: parse_var(lookup, "TOPICS_PER_TICKER", defaults.topics_per_ticker)?,
            min_docs_ticker: parse_var(lookup, "MIN_DOCS_TICKER", defaults.min_docs_ticker)?,
            rank_limit: parse_var(lookup, "RANK_LIMIT", defaults.rank_limit)?,
            parallel: parse_var(lookup, "PARALLEL", defaults.parallel)?,
        })
    }

    pub(super) fn apply(&mut self, overlay: PipelineOverlay) {
        if let Some(v) = overlay.top_tickers {
            self.top_tickers = v;
        }
        if let Some(v) = overlay.topics_per_ticker {
            self.topics_per_ticker = v;
        }
        if let Some(v) = overlay.min_docs_ticker {
            self.min_docs_ticker = v;
        }
        if let Some(v) = overlay.rank_limit {
            self.rank_limit = v;
        }
        if let Some(v) = overlay.parallel {
            self.parallel = v;
        }
    }
}

/// `[pipeline]` table of a TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOverlay {
    pub top_tickers: Option<usize>,
    pub topics_per_ticker: Option<usize>,
    pub min_docs_ticker: Option<usize>,
    pub rank_limit: Option<usize>,
    pub parallel: Option<bool>,
}

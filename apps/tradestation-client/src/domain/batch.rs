//! Per-symbol outcomes of a multi-symbol fetch.

use super::bar::Bar;
use crate::error::ClientError;

/// What happened for one symbol in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    /// Request succeeded.
    Fetched(Vec<Bar>),
    /// Symbol is on the ignore list; no request was made.
    Skipped,
    /// Request failed.
    Failed(ClientError),
}

/// Outcome for a single symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolResult {
    /// Requested symbol.
    pub symbol: String,
    /// Outcome.
    pub outcome: SymbolOutcome,
}

impl SymbolResult {
    /// Bars for this symbol; empty unless fetched.
    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        match &self.outcome {
            SymbolOutcome::Fetched(bars) => bars,
            SymbolOutcome::Skipped | SymbolOutcome::Failed(_) => &[],
        }
    }

    /// Error, if the request failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ClientError> {
        match &self.outcome {
            SymbolOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Results of a fan-out, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    results: Vec<SymbolResult>,
}

impl BatchResult {
    /// Wrap per-symbol results.
    #[must_use]
    pub const fn new(results: Vec<SymbolResult>) -> Self {
        Self { results }
    }

    /// All per-symbol results.
    #[must_use]
    pub fn results(&self) -> &[SymbolResult] {
        &self.results
    }

    /// Bars for the first entry matching `symbol`.
    #[must_use]
    pub fn bars_for(&self, symbol: &str) -> &[Bar] {
        self.results
            .iter()
            .find(|r| r.symbol == symbol)
            .map_or(&[], SymbolResult::bars)
    }

    /// All fetched bars, concatenated in request order.
    #[must_use]
    pub fn all_bars(&self) -> Vec<Bar> {
        self.results.iter().flat_map(|r| r.bars().iter().cloned()).collect()
    }

    /// Consume into the concatenated bars.
    #[must_use]
    pub fn into_bars(self) -> Vec<Bar> {
        self.results
            .into_iter()
            .flat_map(|r| match r.outcome {
                SymbolOutcome::Fetched(bars) => bars,
                SymbolOutcome::Skipped | SymbolOutcome::Failed(_) => Vec::new(),
            })
            .collect()
    }

    /// Symbols whose request failed, with the error.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ClientError)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.symbol.as_str(), e)))
    }

    /// Symbols skipped because they were on the ignore list.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome == SymbolOutcome::Skipped)
            .map(|r| r.symbol.as_str())
    }

    /// Returns true if no symbol failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the batch has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

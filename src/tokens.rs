//! Token counting and cost calculation.
//!
//! Counts use the tiktoken BPE vocabulary selected by the model identifier,
//! so they match what the completion service bills for. Costs are plain
//! per-million-token rates; no rounding happens here — formatting is a
//! display-time concern.

use crate::error::{PipelineError, PipelineResult};
use std::fmt;
use tiktoken_rs::CoreBPE;

/// Deterministic token counter bound to one model's vocabulary.
pub struct TokenCounter {
    bpe: CoreBPE,
    model: String,
}

impl TokenCounter {
    /// Build a counter for the given model identifier.
    ///
    /// Fails if the identifier maps to no known tiktoken vocabulary.
    pub fn for_model(model: &str) -> PipelineResult<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| PipelineError::Tokenizer {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe,
            model: model.to_string(),
        })
    }

    /// Number of tokens in `text` under this model's vocabulary.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("model", &self.model)
            .finish()
    }
}

/// Whether tokens were sent to the model or generated by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostDirection {
    Input,
    Output,
}

/// Per-million-token rates for one model.
#[derive(Debug, Clone, Copy)]
pub struct CostRates {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Cost in USD of `tokens` in the given direction.
pub fn calculate_cost(tokens: usize, direction: CostDirection, rates: CostRates) -> f64 {
    let tokens_in_millions = tokens as f64 / 1_000_000.0;
    tokens_in_millions
        * match direction {
            CostDirection::Input => rates.input_per_million,
            CostDirection::Output => rates.output_per_million,
        }
}

//! Sequential batch driver.
//!
//! One row at a time: normalize → count input tokens → request completion →
//! strip fence → count output tokens → extract fields → emit. A failed
//! request yields a sentinel row and the batch moves on; only store failures
//! abort the run, so a broken checkpoint never silently discards processed
//! work.

use crate::api::CompleteAsync;
use crate::error::PipelineResult;
use crate::html::{normalize_article, parse_completion, strip_code_fence};
use crate::models::{ArticleRecord, ProcessedRecord, RowOutcome, RunningTotals};
use crate::store::CheckpointedWriter;
use crate::tokens::{calculate_cost, CostDirection, CostRates, TokenCounter};
use tracing::{debug, info, instrument, warn};

/// Orchestrates one full run over the input rows.
///
/// Generic over the completion client so tests can script responses; the
/// binary plugs in [`crate::api::RetryCompletion`] around the real client.
#[derive(Debug)]
pub struct BatchDriver<C> {
    client: C,
    counter: TokenCounter,
    rates: CostRates,
    writer: CheckpointedWriter,
    checkpoint_every: usize,
}

impl<C> BatchDriver<C>
where
    C: CompleteAsync<Response = String>,
{
    pub fn new(
        client: C,
        counter: TokenCounter,
        rates: CostRates,
        writer: CheckpointedWriter,
        checkpoint_every: usize,
    ) -> Self {
        Self {
            client,
            counter,
            rates,
            writer,
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Process every article and return the accumulated totals.
    ///
    /// Emits exactly one output row per input row, checkpointing every
    /// `checkpoint_every` rows and flushing the remainder at the end.
    #[instrument(level = "info", skip_all, fields(total = articles.len()))]
    pub async fn run(&self, articles: Vec<ArticleRecord>) -> PipelineResult<RunningTotals> {
        self.writer.ensure_exists()?;

        let total = articles.len();
        let mut totals = RunningTotals::default();
        let mut pending: Vec<ProcessedRecord> = Vec::new();

        for (index, article) in articles.into_iter().enumerate() {
            info!(row = index + 1, total, id = %article.id, title = %article.title, "Processing article");

            match self.process_row(&article).await {
                RowOutcome::Success {
                    record,
                    input_tokens,
                    output_tokens,
                } => {
                    let cost = calculate_cost(input_tokens, CostDirection::Input, self.rates)
                        + calculate_cost(output_tokens, CostDirection::Output, self.rates);
                    totals.record_success(output_tokens, cost);
                    debug!(input_tokens, output_tokens, "Article processed");
                    pending.push(record);
                }
                RowOutcome::Failure { error } => {
                    warn!(id = %article.id, error = %error, "Article failed; emitting sentinel row");
                    pending.push(ProcessedRecord::error_sentinel(&article.id));
                }
            }

            if (index + 1) % self.checkpoint_every == 0 {
                self.writer.append(&pending)?;
                pending.clear();
            }
        }

        if !pending.is_empty() {
            self.writer.append(&pending)?;
        }

        info!(
            total_output_tokens = totals.total_output_tokens,
            total_cost = format!("{:.4}", totals.total_cost),
            "Batch complete"
        );
        Ok(totals)
    }

    async fn process_row(&self, article: &ArticleRecord) -> RowOutcome {
        let normalized = normalize_article(&article.raw_text);
        let input_tokens = self.counter.count(&normalized);

        let raw = match self.client.complete(&normalized).await {
            Ok(raw) => raw,
            Err(error) => return RowOutcome::Failure { error },
        };

        // Stripping is idempotent, so parsing the pre-stripped text is safe.
        let stripped = strip_code_fence(&raw);
        let output_tokens = self.counter.count(&stripped);
        let parsed = parse_completion(&stripped);

        RowOutcome::Success {
            record: ProcessedRecord {
                id: article.id.clone(),
                title: parsed.title,
                url: article.url.clone(),
                processed_text: parsed.processed_text,
                description: parsed.description,
            },
            input_tokens,
            output_tokens,
        }
    }
}

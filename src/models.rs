//! Data models for articles moving through the pipeline.
//!
//! This module defines the core data structures:
//! - [`ArticleRecord`]: one raw row of the input store
//! - [`ProcessedRecord`]: one finished row of the output store
//! - [`RowOutcome`]: explicit success/failure result for a single row
//! - [`RunningTotals`]: process-lifetime token and cost accumulator
//!
//! Every `ArticleRecord` produces exactly one `ProcessedRecord` — a real one
//! on success, a sentinel row on failure. Nothing is dropped or duplicated.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Sentinel written into every field of a failed row.
pub const ERROR_MARKER: &str = "Error";

/// Sentinel body written into `processed_text` of a failed row.
pub const ERROR_BODY: &str = "<article>Error processing</article>";

/// A raw news article as read from the input store.
///
/// Immutable once read. The input store must carry `id`, `url`, and `text`
/// columns; `title` is optional and defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleRecord {
    /// Opaque row identifier, carried through to the output unchanged.
    pub id: String,
    /// Original article title, if the input store has one.
    #[serde(default)]
    pub title: String,
    /// Source URL of the article.
    pub url: String,
    /// Raw article HTML.
    #[serde(rename = "text")]
    pub raw_text: String,
}

/// A finished article row, appended to the output store and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: String,
    /// Title extracted from the completion's `<title>` element.
    pub title: String,
    pub url: String,
    /// Inner HTML of the completion's `<article>` element.
    pub processed_text: String,
    /// `content` attribute of the completion's description meta element.
    pub description: String,
}

impl ProcessedRecord {
    /// The sentinel row emitted when processing an article fails.
    pub fn error_sentinel(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: ERROR_MARKER.to_string(),
            url: ERROR_MARKER.to_string(),
            processed_text: ERROR_BODY.to_string(),
            description: ERROR_MARKER.to_string(),
        }
    }
}

/// Result of processing a single row.
///
/// Failures are data, not control flow: the driver matches on this instead
/// of letting an error abort the batch.
#[derive(Debug)]
pub enum RowOutcome {
    Success {
        record: ProcessedRecord,
        input_tokens: usize,
        output_tokens: usize,
    },
    Failure {
        error: PipelineError,
    },
}

/// Token and cost accumulator for a whole run.
///
/// Only successful rows contribute; failed rows never touch the totals.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningTotals {
    pub total_output_tokens: u64,
    pub total_cost: f64,
}

impl RunningTotals {
    pub fn record_success(&mut self, output_tokens: usize, cost: f64) {
        self.total_output_tokens += output_tokens as u64;
        self.total_cost += cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_record_from_csv_row() {
        let data = "id,url,text\n7,http://example.com,<p>hi</p>\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: ArticleRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.url, "http://example.com");
        assert_eq!(record.raw_text, "<p>hi</p>");
        assert_eq!(record.title, "");
    }

    #[test]
    fn test_article_record_with_title_column() {
        let data = "id,title,url,text\n7,Headline,http://example.com,<p>hi</p>\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: ArticleRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.title, "Headline");
    }

    #[test]
    fn test_error_sentinel_shape() {
        let row = ProcessedRecord::error_sentinel("5");
        assert_eq!(row.id, "5");
        assert_eq!(row.title, "Error");
        assert_eq!(row.url, "Error");
        assert_eq!(row.processed_text, "<article>Error processing</article>");
        assert_eq!(row.description, "Error");
    }

    #[test]
    fn test_running_totals_accumulate() {
        let mut totals = RunningTotals::default();
        totals.record_success(100, 0.25);
        totals.record_success(50, 0.10);
        assert_eq!(totals.total_output_tokens, 150);
        assert!((totals.total_cost - 0.35).abs() < 1e-12);
    }
}

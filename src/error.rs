//! Error taxonomy for the processing pipeline.
//!
//! Errors fall into three families:
//! - request/service failures from the completion endpoint, recovered per
//!   row by the batch driver;
//! - store failures (I/O, CSV), which are fatal so a failed checkpoint never
//!   silently drops processed rows;
//! - setup failures (configuration, tokenizer init), which stop the process
//!   before any row is touched.
//!
//! Missing HTML structure in a completion response is deliberately *not* an
//! error: the response parser degrades to field-level sentinel strings.

use thiserror::Error;

/// All failure modes of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport-level failure: connect, TLS, timeout, body read.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The completion service answered with a non-success status.
    #[error("completion service returned {status}: {body_preview}")]
    Service { status: u16, body_preview: String },

    /// The completion service answered 2xx but with no choices.
    #[error("completion response contained no choices")]
    EmptyCompletion,

    /// The tokenizer vocabulary for the configured model could not be built.
    #[error("tokenizer init failed for model {model}: {reason}")]
    Tokenizer { model: String, reason: String },

    /// Store or filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed row or failed (de)serialization in the tabular store.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let e = PipelineError::Service {
            status: 429,
            body_preview: "rate limited".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "completion service returned 429: rate limited"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: PipelineError = io.into();
        assert!(matches!(e, PipelineError::Io(_)));
    }
}

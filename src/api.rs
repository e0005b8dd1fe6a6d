//! Completion-service client with exponential backoff retry logic.
//!
//! This module talks to an OpenAI-compatible chat-completions API. Each
//! article is one request carrying two messages — the fixed system
//! instruction and the normalized article text — and yields the single
//! completion's text content, trimmed.
//!
//! # Architecture
//!
//! The module uses a trait-based design:
//! - [`CompleteAsync`]: core trait for sending text and receiving a completion
//! - [`CompletionClient`]: reqwest-backed implementation with a per-request
//!   timeout
//! - [`RetryCompletion`]: decorator adding retry logic to any
//!   `CompleteAsync` implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Exhausted retries surface the last error to the caller, where the batch
//! driver converts it into a per-row failure instead of aborting the run.

use crate::config::{ApiConfig, ModelConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::utils::truncate_for_log;
use rand::{rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

const BODY_PREVIEW_BYTES: usize = 300;

/// Trait for async completion requests.
///
/// Implementors can send text to a completion service and receive a
/// response. The abstraction allows decorators (like retry logic) and
/// scripted test doubles to stand in for the real client.
pub trait CompleteAsync {
    /// The type of response returned by the service.
    type Response;

    /// Send text to the completion service and receive a response.
    async fn complete(&self, text: &str) -> PipelineResult<Self::Response>;
}

/// Wrapper that adds exponential backoff retry logic to any
/// [`CompleteAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryCompletion<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryCompletion<T>
where
    T: CompleteAsync,
{
    /// Create a new retry wrapper around an existing [`CompleteAsync`]
    /// implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryCompletion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryCompletion")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> CompleteAsync for RetryCompletion<T>
where
    T: CompleteAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn complete(&self, text: &str) -> PipelineResult<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.complete(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "complete() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "complete() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Reqwest-backed client for an OpenAI-compatible chat-completions endpoint.
///
/// Carries the fixed system instruction and model parameters so each call
/// only needs the normalized article text. The HTTP client enforces the
/// configured per-request timeout: a hung request fails the row rather than
/// stalling the batch forever.
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl CompletionClient {
    pub fn new(
        api: &ApiConfig,
        model: &ModelConfig,
        system_prompt: String,
    ) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(api.request_timeout_secs))
            .build()?;
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            api.base_url.trim_end_matches('/')
        ))
        .map_err(|e| PipelineError::Config(format!("invalid base_url {}: {e}", api.base_url)))?;

        Ok(Self {
            http,
            endpoint,
            api_key: api.api_key.clone(),
            model: model.name.clone(),
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            system_prompt,
        })
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl CompleteAsync for CompletionClient {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn complete(&self, text: &str) -> PipelineResult<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let t0 = Instant::now();
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_preview = truncate_for_log(&body, BODY_PREVIEW_BYTES);
            warn!(
                status = status.as_u16(),
                body = %body_preview,
                "completion service returned an error status"
            );
            return Err(PipelineError::Service {
                status: status.as_u16(),
                body_preview,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(PipelineError::EmptyCompletion)?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "completion received"
        );
        Ok(content.trim().to_string())
    }
}

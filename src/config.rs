//! Configuration loading.
//!
//! All tunables live in one YAML file deserialized into [`AppConfig`], which
//! is passed explicitly into the driver — there is no ambient global state.
//! The API key may also come from the `OPENAI_API_KEY` environment variable,
//! which takes precedence over the file.
//!
//! # Example
//!
//! ```yaml
//! api:
//!   base_url: https://api.openai.com/v1
//!   api_key: sk-...
//! model:
//!   name: gpt-4o-2024-11-20
//! pipeline:
//!   input_path: data/articles.csv
//!   output_path: data/processed_articles.csv
//!   prompt_path: data/prompt.txt
//! ```

use crate::error::{PipelineError, PipelineResult};
use crate::tokens::CostRates;
use serde::Deserialize;
use std::env;
use std::fs;

/// Environment variable that overrides `api.api_key`.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential; may be left empty and supplied via `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// Per-request timeout. A hung request fails the row instead of stalling
    /// the whole batch.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts made by the backoff decorator before a row is marked failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// Model identity, sampling parameters, and pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model identifier, also used to select the tokenizer vocabulary.
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hard cap on output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// USD per million input tokens.
    #[serde(default = "default_input_cost_per_million")]
    pub input_cost_per_million: f64,
    /// USD per million output tokens.
    #[serde(default = "default_output_cost_per_million")]
    pub output_cost_per_million: f64,
}

impl ModelConfig {
    pub fn cost_rates(&self) -> CostRates {
        CostRates {
            input_per_million: self.input_cost_per_million,
            output_per_million: self.output_cost_per_million,
        }
    }
}

/// Store paths and checkpoint cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Input CSV with `id`, `url`, `text` columns.
    pub input_path: String,
    /// Output CSV, created with a header row if absent.
    pub output_path: String,
    /// File holding the fixed system instruction, sent verbatim.
    pub prompt_path: String,
    /// Rows processed between checkpoint writes.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

/// Full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file, applying the environment
    /// override for the API key.
    ///
    /// Fails if the file is unreadable, malformed, or no API key is
    /// available from either source.
    pub fn load(path: &str) -> PipelineResult<Self> {
        let raw = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("{path}: {e}")))?;
        let config = config.with_env_key(env::var(API_KEY_ENV).ok());
        if config.api.api_key.is_empty() {
            return Err(PipelineError::Config(format!(
                "no API key: set api.api_key in {path} or export {API_KEY_ENV}"
            )));
        }
        Ok(config)
    }

    /// Load the fixed system instruction from `prompt_path`, trimmed.
    pub fn load_prompt(&self) -> PipelineResult<String> {
        Ok(fs::read_to_string(&self.pipeline.prompt_path)?
            .trim()
            .to_string())
    }

    fn with_env_key(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key {
            if !key.is_empty() {
                self.api.api_key = key;
            }
        }
        self
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_input_cost_per_million() -> f64 {
    2.50
}

fn default_output_cost_per_million() -> f64 {
    10.00
}

fn default_checkpoint_every() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
api:
  api_key: sk-test
model:
  name: gpt-4o-2024-11-20
pipeline:
  input_path: in.csv
  output_path: out.csv
  prompt_path: prompt.txt
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.api.base_url, "https://api.openai.com/v1");
        assert_eq!(config.api.request_timeout_secs, 120);
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.model.temperature, 0.3);
        assert_eq!(config.model.max_tokens, 2000);
        assert_eq!(config.model.input_cost_per_million, 2.50);
        assert_eq!(config.model.output_cost_per_million, 10.00);
        assert_eq!(config.pipeline.checkpoint_every, 20);
    }

    #[test]
    fn test_env_key_overrides_file_key() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let config = config.with_env_key(Some("sk-env".to_string()));
        assert_eq!(config.api.api_key, "sk-env");
    }

    #[test]
    fn test_empty_env_key_keeps_file_key() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let config = config.with_env_key(Some(String::new()));
        assert_eq!(config.api.api_key, "sk-test");
    }

    #[test]
    fn test_explicit_values_win_over_defaults() {
        let yaml = r#"
api:
  api_key: sk-test
  base_url: http://localhost:8080/v1
  request_timeout_secs: 10
model:
  name: gpt-4o
  temperature: 0.7
  max_tokens: 512
  input_cost_per_million: 1.0
  output_cost_per_million: 3.0
pipeline:
  input_path: in.csv
  output_path: out.csv
  prompt_path: prompt.txt
  checkpoint_every: 5
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.pipeline.checkpoint_every, 5);
        let rates = config.model.cost_rates();
        assert_eq!(rates.input_per_million, 1.0);
        assert_eq!(rates.output_per_million, 3.0);
    }
}

//! Adapter configuration
//!
//! Settings load from the environment under the `ASSIST_` prefix (a local
//! `.env` file is honored), with working defaults for everything except the
//! endpoint and key.

use core_kernel::CircuitBreakerConfig;
use serde::Deserialize;

use crate::error::AssistError;

#[derive(Debug, Clone, Deserialize)]
pub struct AssistConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// Bearer token for the service
    pub api_key: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Per-call deadline in seconds
    pub timeout_secs: u64,

    /// Retries for transient failures (0 disables retry)
    pub retry_attempts: u32,

    /// Circuit breaker thresholds; `None` disables the breaker
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 20,
            retry_attempts: 2,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

impl AssistConfig {
    /// Loads configuration from `ASSIST_*` environment variables
    ///
    /// `ASSIST_ENDPOINT` and `ASSIST_API_KEY` are required; the rest fall
    /// back to defaults.
    pub fn from_env() -> Result<Self, AssistError> {
        dotenvy::dotenv().ok();

        let defaults = AssistConfig::default();
        let builder = config::Config::builder()
            .set_default("model", defaults.model.clone())
            .and_then(|b| b.set_default("timeout_secs", defaults.timeout_secs))
            .and_then(|b| b.set_default("retry_attempts", defaults.retry_attempts as u64))
            .map_err(|e| AssistError::unavailable(format!("config defaults: {e}")))?;
        let settings = builder
            .add_source(config::Environment::with_prefix("ASSIST"))
            .build()
            .map_err(|e| AssistError::unavailable(format!("config load: {e}")))?;

        let endpoint: String = settings
            .get_string("endpoint")
            .map_err(|_| AssistError::unavailable("ASSIST_ENDPOINT is not set"))?;
        let api_key: String = settings
            .get_string("api_key")
            .map_err(|_| AssistError::unavailable("ASSIST_API_KEY is not set"))?;

        Ok(Self {
            endpoint,
            api_key,
            model: settings
                .get_string("model")
                .unwrap_or(defaults.model),
            timeout_secs: settings
                .get_int("timeout_secs")
                .map(|v| v as u64)
                .unwrap_or(defaults.timeout_secs),
            retry_attempts: settings
                .get_int("retry_attempts")
                .map(|v| v as u32)
                .unwrap_or(defaults.retry_attempts),
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        })
    }
}

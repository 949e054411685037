//! HTTP adapter for the decision-assist service
//!
//! Speaks an OpenAI-style chat-completions protocol. Includes:
//!
//! - Connection pooling via reqwest
//! - Retry with linear backoff for transient failures
//! - Circuit breaker so a down service fails fast instead of queueing
//! - Per-call correlation ids in the logs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, CircuitBreakerConfig, HealthCheckResult, HealthCheckable,
};

use crate::adapter::{ChatContext, DecisionAssist, ReviewContext};
use crate::config::AssistConfig;
use crate::disposition::Disposition;
use crate::error::AssistError;

const BACKOFF_STEP_MS: u64 = 200;

const REVIEW_SYSTEM_PROMPT: &str = "You are a prior-authorization reviewer for a health insurer. \
Assess the request against the member's profile and history. Respond with a single JSON object: \
{\"status\": \"approved\"|\"pending\"|\"rejected\", \"reason\": \"...\", \"ai_notes\": \"...\"}.";

const FORMAT_SYSTEM_PROMPT: &str = "Rewrite the following clinical note with correct spelling, \
casing, and punctuation. Preserve every clinical fact. Reply with the rewritten text only.";

const AUTOCOMPLETE_SYSTEM_PROMPT: &str = "Complete the partially typed clinical phrase. \
Reply with the completed phrase only.";

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful insurance support assistant. Answer the \
member's question about their coverage plainly and briefly.";

/// Circuit breaker guarding calls to the assist service
///
/// Opens after consecutive failures, half-opens once the reset timeout
/// elapses, and closes again after enough successes.
#[derive(Debug)]
struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    is_open: AtomicBool,
    last_failure_time: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            last_failure_time: RwLock::new(None),
        }
    }

    async fn is_available(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }
        let last_failure = self.last_failure_time.read().await;
        if let Some(time) = *last_failure {
            if time.elapsed() > Duration::from_secs(self.config.reset_timeout_secs) {
                // Half-open: let one request probe the service
                return true;
            }
        }
        false
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= self.config.success_threshold as u64 {
            self.is_open.store(false, Ordering::Relaxed);
            self.success_count.store(0, Ordering::Relaxed);
        }
    }

    async fn record_failure(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.config.failure_threshold as u64 {
            self.is_open.store(true, Ordering::Relaxed);
            *self.last_failure_time.write().await = Some(Instant::now());
        }
    }

    fn has_failures(&self) -> bool {
        self.failure_count.load(Ordering::Relaxed) > 0
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    content: String,
}

/// Decision-assist over HTTP
pub struct HttpAssist {
    config: AssistConfig,
    client: reqwest::Client,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl HttpAssist {
    pub fn new(config: AssistConfig) -> Self {
        let breaker = config
            .circuit_breaker
            .clone()
            .map(|cb| Arc::new(CircuitBreaker::new(cb)));
        Self {
            config,
            client: reqwest::Client::new(),
            breaker,
        }
    }

    /// True while the breaker is rejecting calls
    pub async fn is_circuit_open(&self) -> bool {
        match &self.breaker {
            Some(cb) => !cb.is_available().await,
            None => false,
        }
    }

    /// Sends one prompt pair and returns the reply text
    async fn complete(
        &self,
        operation: &'static str,
        system: &str,
        user: &str,
    ) -> Result<String, AssistError> {
        if let Some(cb) = &self.breaker {
            if !cb.is_available().await {
                return Err(AssistError::unavailable("circuit breaker open"));
            }
        }

        let correlation_id = Uuid::new_v4();
        let mut last_err = AssistError::unavailable("no attempts made");
        for attempt in 0..=self.config.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(BACKOFF_STEP_MS * attempt as u64)).await;
            }
            match self.send(operation, system, user).await {
                Ok(reply) => {
                    if let Some(cb) = &self.breaker {
                        cb.record_success();
                    }
                    tracing::debug!(%correlation_id, operation, attempt, "assist call succeeded");
                    return Ok(reply);
                }
                Err(e) => {
                    tracing::warn!(%correlation_id, operation, attempt, error = %e, "assist call failed");
                    if let Some(cb) = &self.breaker {
                        cb.record_failure().await;
                    }
                    let transient = e.is_transient();
                    last_err = e;
                    if !transient {
                        break;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn send(
        &self,
        operation: &'static str,
        system: &str,
        user: &str,
    ) -> Result<String, AssistError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: system,
                },
                WireMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistError::Timeout {
                        operation,
                        duration_ms: self.config.timeout_secs * 1000,
                    }
                } else {
                    AssistError::unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::unavailable(format!(
                "service answered {status}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AssistError::malformed(format!("completion body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistError::malformed("completion had no choices"))
    }
}

#[async_trait]
impl DecisionAssist for HttpAssist {
    async fn review(&self, ctx: &ReviewContext) -> Result<Disposition, AssistError> {
        let material = serde_json::to_string_pretty(ctx)
            .map_err(|e| AssistError::malformed(format!("review context: {e}")))?;
        let reply = self.complete("review", REVIEW_SYSTEM_PROMPT, &material).await?;
        Disposition::from_reply(&reply)
    }

    async fn format_text(&self, raw: &str) -> Result<String, AssistError> {
        let reply = self.complete("format_text", FORMAT_SYSTEM_PROMPT, raw).await?;
        Ok(reply.trim().to_string())
    }

    async fn autocomplete(&self, prefix: &str) -> Result<String, AssistError> {
        let reply = self
            .complete("autocomplete", AUTOCOMPLETE_SYSTEM_PROMPT, prefix)
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn chat(&self, message: &str, ctx: &ChatContext) -> Result<String, AssistError> {
        let mut user = String::new();
        if let Some(name) = &ctx.member_name {
            user.push_str(&format!("Member: {name}\n"));
        }
        if let Some(topic) = &ctx.topic {
            user.push_str(&format!("Topic: {topic}\n"));
        }
        user.push_str(message);
        let reply = self.complete("chat", CHAT_SYSTEM_PROMPT, &user).await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl HealthCheckable for HttpAssist {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let status = if self.is_circuit_open().await {
            AdapterHealth::Unhealthy
        } else if self.breaker.as_ref().is_some_and(|cb| cb.has_failures()) {
            AdapterHealth::Degraded
        } else if self.config.endpoint.is_empty() {
            AdapterHealth::Unknown
        } else {
            AdapterHealth::Healthy
        };
        HealthCheckResult {
            adapter_id: "decision_assist_http".to_string(),
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }
}

impl std::fmt::Debug for HttpAssist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAssist")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn breaker_opens_after_threshold_and_half_opens() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout_secs: 0,
            success_threshold: 2,
        });
        assert!(cb.is_available().await);
        for _ in 0..3 {
            cb.record_failure().await;
        }
        // reset_timeout_secs of zero means the open breaker half-opens
        // immediately; elapsed() needs a moment to exceed zero
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cb.is_available().await);
        assert!(cb.is_open.load(Ordering::Relaxed));

        cb.record_success();
        assert!(cb.is_open.load(Ordering::Relaxed));
        cb.record_success();
        assert!(!cb.is_open.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn breaker_failure_resets_success_streak() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout_secs: 60,
            success_threshold: 2,
        });
        cb.record_failure().await;
        cb.record_success();
        cb.record_failure().await;
        // One failure since the success, not two in a row
        assert!(cb.is_available().await);
    }

    fn unreachable_config(endpoint: &str) -> AssistConfig {
        AssistConfig {
            endpoint: endpoint.to_string(),
            api_key: "test-key".into(),
            timeout_secs: 2,
            retry_attempts: 0,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 2,
                reset_timeout_secs: 60,
                success_threshold: 1,
            }),
            ..AssistConfig::default()
        }
    }

    #[tokio::test]
    async fn health_tracks_the_breaker_through_failures() {
        // Nothing listens on this port; every call fails without the network
        let assist = HttpAssist::new(unreachable_config(
            "http://127.0.0.1:9/v1/chat/completions",
        ));
        assert_eq!(assist.health_check().await.status, AdapterHealth::Healthy);

        assert!(assist.format_text("note").await.is_err());
        assert_eq!(assist.health_check().await.status, AdapterHealth::Degraded);

        assert!(assist.format_text("note").await.is_err());
        assert_eq!(assist.health_check().await.status, AdapterHealth::Unhealthy);

        // The open circuit now rejects calls before they are sent
        let err = assist.format_text("note").await.unwrap_err();
        assert!(err.to_string().contains("circuit breaker open"));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_reports_unknown_health() {
        let assist = HttpAssist::new(unreachable_config(""));
        let health = assist.health_check().await;
        assert_eq!(health.status, AdapterHealth::Unknown);
        assert_eq!(health.adapter_id, "decision_assist_http");
    }
}

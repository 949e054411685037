//! Degrading facade over the decision-assist port
//!
//! Text operations are conveniences, so their failures are swallowed here
//! with fixed fallbacks. Review is the one operation whose failure matters
//! to the state machine, so it passes errors through for the engine to
//! handle.

use std::sync::Arc;

use crate::adapter::{ChatContext, DecisionAssist, ReviewContext};
use crate::disposition::Disposition;
use crate::error::AssistError;

/// Reply used when the chat operation fails
pub const CHAT_FALLBACK: &str =
    "Sorry, I am unable to help with that right now. Please try again later.";

/// Fallback-applying wrapper around any [`DecisionAssist`] implementation
#[derive(Clone)]
pub struct Assist {
    inner: Arc<dyn DecisionAssist>,
}

impl Assist {
    pub fn new(inner: Arc<dyn DecisionAssist>) -> Self {
        Self { inner }
    }

    /// Advisory review; errors surface to the caller
    pub async fn review(&self, ctx: &ReviewContext) -> Result<Disposition, AssistError> {
        self.inner.review(ctx).await
    }

    /// Formats a note, falling back to the raw input on failure
    pub async fn format_text(&self, raw: &str) -> String {
        match self.inner.format_text(raw).await {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!(error = %e, "format_text degraded to raw input");
                raw.to_string()
            }
        }
    }

    /// Completes a phrase, falling back to an empty suggestion on failure
    pub async fn autocomplete(&self, prefix: &str) -> String {
        match self.inner.autocomplete(prefix).await {
            Ok(suggestion) => suggestion,
            Err(e) => {
                tracing::warn!(error = %e, "autocomplete degraded to empty suggestion");
                String::new()
            }
        }
    }

    /// Answers a member question, falling back to a fixed apology on failure
    pub async fn chat(&self, message: &str, ctx: &ChatContext) -> String {
        match self.inner.chat(message, ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "chat degraded to fallback reply");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}

impl std::fmt::Debug for Assist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assist").finish_non_exhaustive()
    }
}

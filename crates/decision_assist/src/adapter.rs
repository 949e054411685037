//! The decision-assist port
//!
//! The adapter is a boundary: it sees plain review material, not domain
//! entities, so the authorization crate converts its own types into the
//! context structs here before calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::disposition::Disposition;
use crate::error::AssistError;

/// Member facts shared with the reviewer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberProfile {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    /// Known diagnoses, free-text
    pub diseases: Vec<String>,
}

/// One earlier authorization in the member's history window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastRequest {
    pub procedure: String,
    pub status: String,
    pub decided_reason: Option<String>,
}

/// Everything the reviewer gets to see for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContext {
    pub procedure: String,
    pub diagnosis: String,
    /// "routine", "urgent", or "emergency"
    pub urgency: String,
    /// Requested amount rendered with its currency symbol
    pub amount: String,
    pub provider_notes: Option<String>,
    pub member: MemberProfile,
    /// Most recent prior requests, newest first, bounded by the caller
    pub history: Vec<PastRequest>,
}

/// Conversation context for the member-facing chat operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    pub member_name: Option<String>,
    /// Optional subject line ("coverage", "claim status")
    pub topic: Option<String>,
}

/// Advisory operations backed by an external model service
///
/// Every operation here is best-effort. `review` failures surface as errors
/// so the engine can land the request in manual review; the text operations
/// are wrapped by [`Assist`](crate::Assist), which substitutes fallbacks.
#[async_trait]
pub trait DecisionAssist: Send + Sync {
    /// Reviews a prior-authorization request and recommends a disposition
    async fn review(&self, ctx: &ReviewContext) -> Result<Disposition, AssistError>;

    /// Cleans up free-text clinical notes
    async fn format_text(&self, raw: &str) -> Result<String, AssistError>;

    /// Completes a partially typed field
    async fn autocomplete(&self, prefix: &str) -> Result<String, AssistError>;

    /// Answers a member question
    async fn chat(&self, message: &str, ctx: &ChatContext) -> Result<String, AssistError>;
}

//! Member-initiated pending requests
//!
//! A member cannot open a prior authorization directly; they file a pending
//! request that their provider either endorses (turning it into a
//! [`PriorAuthRequest`](crate::PriorAuthRequest)) or rejects. Each pending
//! request is consumed exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{MemberId, PayerId, PendingId, ProviderId};
use infra_store::Entity;

use crate::request::Urgency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: PendingId,
    pub member_id: MemberId,
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    /// Denormalized for display in provider worklists
    pub member_name: String,
    pub provider_name: String,
    pub payer_name: String,
    pub procedure: String,
    pub diagnosis: String,
    pub urgency: Urgency,
    pub member_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Entity for PendingRequest {
    type Key = PendingId;
    const NAME: &'static str = "pending_request";

    fn key(&self) -> PendingId {
        self.request_id.clone()
    }
}

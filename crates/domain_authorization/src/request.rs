//! Prior-authorization request and its state machine
//!
//! Status flow:
//!
//! ```text
//! Submitted ──► AutoReviewed ──────────► Approved
//!     │              │                      ▲
//!     │              └──────► Rejected      │
//!     └────► PendingManualReview ───────────┘
//!                    │
//!                    └──────► Rejected
//! ```
//!
//! Auto-review never lands a terminal status; only a payer or admin decision
//! reaches `Approved` or `Rejected`. Once terminal, the only permitted
//! mutation is appending a note.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuthId, MemberId, Money, PayerId, ProviderId, SubscriptionId};
use decision_assist::DispositionStatus;
use infra_store::Entity;

use crate::error::AuthError;

/// Clinical urgency of the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    /// Urgent and emergency requests always get human eyes
    pub fn is_expedited(&self) -> bool {
        matches!(self, Urgency::Urgent | Urgency::Emergency)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Routine => "routine",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// How the request entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    /// Submitted by the provider directly
    Direct,
    /// Started as a member pending request and endorsed by the provider
    ProviderApproved,
}

/// Adjudication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Received, auto-review not yet run
    Submitted,
    /// Auto-review produced a confident advisory verdict
    AutoReviewed,
    /// Needs human review: expedited, high-risk, or the advisory path failed
    PendingManualReview,
    /// Funded and settled; terminal
    Approved,
    /// Declined; terminal
    Rejected,
}

impl AuthStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthStatus::Approved | AuthStatus::Rejected)
    }

    /// Whether the state machine permits moving to `next`
    pub fn can_transition_to(&self, next: AuthStatus) -> bool {
        matches!(
            (self, next),
            (
                AuthStatus::Submitted,
                AuthStatus::AutoReviewed | AuthStatus::PendingManualReview
            ) | (
                AuthStatus::AutoReviewed | AuthStatus::PendingManualReview,
                AuthStatus::Approved | AuthStatus::Rejected
            )
        )
    }

    /// True when the request is waiting on a payer or admin decision
    pub fn awaits_decision(&self) -> bool {
        matches!(
            self,
            AuthStatus::AutoReviewed | AuthStatus::PendingManualReview
        )
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthStatus::Submitted => "submitted",
            AuthStatus::AutoReviewed => "auto_reviewed",
            AuthStatus::PendingManualReview => "pending_manual_review",
            AuthStatus::Approved => "approved",
            AuthStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A prior-authorization request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorAuthRequest {
    pub auth_id: AuthId,
    pub member_id: MemberId,
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    pub subscription_id: SubscriptionId,
    pub procedure: String,
    pub diagnosis: String,
    pub urgency: Urgency,
    pub member_notes: Option<String>,
    pub provider_notes: Option<String>,
    /// Notes appended after submission, including on terminal requests
    pub additional_notes: Vec<String>,
    /// Requested amount; what settles may be less after clamping
    pub auth_amount: Money,
    pub status: AuthStatus,
    pub source: RequestSource,
    /// True once the advisory service produced a usable verdict
    pub ai_processed: bool,
    pub ai_decision: Option<DispositionStatus>,
    pub ai_reason: Option<String>,
    pub ai_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub ai_reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Who made the final decision
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
}

impl PriorAuthRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        auth_id: AuthId,
        member_id: MemberId,
        provider_id: ProviderId,
        payer_id: PayerId,
        subscription_id: SubscriptionId,
        procedure: String,
        diagnosis: String,
        urgency: Urgency,
        auth_amount: Money,
        source: RequestSource,
    ) -> Self {
        Self {
            auth_id,
            member_id,
            provider_id,
            payer_id,
            subscription_id,
            procedure,
            diagnosis,
            urgency,
            member_notes: None,
            provider_notes: None,
            additional_notes: Vec::new(),
            auth_amount,
            status: AuthStatus::Submitted,
            source,
            ai_processed: false,
            ai_decision: None,
            ai_reason: None,
            ai_notes: None,
            submitted_at: Utc::now(),
            ai_reviewed_at: None,
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
        }
    }

    /// Moves the request to `next`, enforcing the transition matrix
    pub fn transition(&mut self, next: AuthStatus) -> Result<(), AuthError> {
        if !self.status.can_transition_to(next) {
            return Err(AuthError::InvalidState {
                auth_id: self.auth_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Appends a free-text note; permitted in every status
    pub fn append_note(&mut self, note: impl Into<String>) {
        self.additional_notes.push(note.into());
    }
}

impl Entity for PriorAuthRequest {
    type Key = AuthId;
    const NAME: &'static str = "authorization";

    fn key(&self) -> AuthId {
        self.auth_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_matrix() {
        use AuthStatus::*;
        let allowed = [
            (Submitted, AutoReviewed),
            (Submitted, PendingManualReview),
            (AutoReviewed, Approved),
            (AutoReviewed, Rejected),
            (PendingManualReview, Approved),
            (PendingManualReview, Rejected),
        ];
        let all = [Submitted, AutoReviewed, PendingManualReview, Approved, Rejected];
        for from in all {
            for to in all {
                let expect = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expect,
                    "{from} -> {to} should be {expect}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_refuse_transitions() {
        use core_kernel::{Currency, Money};
        let mut req = PriorAuthRequest::submit(
            AuthId::from_number(1),
            MemberId::from_number(1),
            ProviderId::from_number(1),
            PayerId::from_number(1),
            SubscriptionId::from_number(1),
            "MRI".into(),
            "chronic back pain".into(),
            Urgency::Routine,
            Money::from_units(1_200, Currency::USD),
            RequestSource::Direct,
        );
        req.transition(AuthStatus::AutoReviewed).unwrap();
        req.transition(AuthStatus::Approved).unwrap();
        let err = req.transition(AuthStatus::Rejected).unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));
        // Notes still allowed on terminal requests
        req.append_note("settled after peer-to-peer call");
        assert_eq!(req.additional_notes.len(), 1);
    }

    #[test]
    fn expedited_urgencies() {
        assert!(!Urgency::Routine.is_expedited());
        assert!(Urgency::Urgent.is_expedited());
        assert!(Urgency::Emergency.is_expedited());
    }
}

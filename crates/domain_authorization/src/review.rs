//! Auto-review policy
//!
//! The advisory verdict is mapped into the state machine here, and the
//! safety override lives here too: expedited or high-risk requests are never
//! routed on an advisory approval, whatever the service said.

use decision_assist::{Disposition, DispositionStatus};

use crate::request::{AuthStatus, PriorAuthRequest};

/// Environment variable overriding the high-risk procedure list
/// (comma-separated, case-insensitive)
pub const HIGH_RISK_ENV: &str = "AUTH_HIGH_RISK_PROCEDURES";

/// Procedures that always require human review
const DEFAULT_HIGH_RISK: &[&str] = &["heart surgery", "organ transplant", "brain surgery"];

/// Routing policy for advisory review results
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    high_risk_procedures: Vec<String>,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            high_risk_procedures: DEFAULT_HIGH_RISK.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReviewPolicy {
    pub fn new(high_risk_procedures: Vec<String>) -> Self {
        Self {
            high_risk_procedures: high_risk_procedures
                .into_iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Reads the high-risk list from the environment, falling back to the
    /// built-in defaults
    pub fn from_env() -> Self {
        match std::env::var(HIGH_RISK_ENV) {
            Ok(list) if !list.trim().is_empty() => {
                Self::new(list.split(',').map(str::to_string).collect())
            }
            _ => Self::default(),
        }
    }

    pub fn is_high_risk(&self, procedure: &str) -> bool {
        let needle = procedure.trim().to_ascii_lowercase();
        self.high_risk_procedures.iter().any(|p| *p == needle)
    }

    /// True when the request must see a human regardless of the verdict
    pub fn requires_manual_review(&self, request: &PriorAuthRequest) -> bool {
        request.urgency.is_expedited() || self.is_high_risk(&request.procedure)
    }

    /// Routes an advisory verdict into a non-terminal status
    ///
    /// A confident verdict (approved or rejected) lands in `AutoReviewed`
    /// for the payer to confirm; anything else, and any approval the
    /// override catches, lands in `PendingManualReview`.
    pub fn route(&self, request: &PriorAuthRequest, disposition: &Disposition) -> AuthStatus {
        match disposition.status {
            DispositionStatus::Approved if self.requires_manual_review(request) => {
                AuthStatus::PendingManualReview
            }
            DispositionStatus::Approved | DispositionStatus::Rejected => AuthStatus::AutoReviewed,
            DispositionStatus::Pending => AuthStatus::PendingManualReview,
        }
    }
}

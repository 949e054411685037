//! Domain Authorization - the prior-authorization adjudication engine
//!
//! Requests move through a small state machine ([`AuthStatus`]): submitted
//! requests get an advisory auto-review, land in either `AutoReviewed` or
//! `PendingManualReview`, and only a payer or admin decision takes them to a
//! terminal `Approved` or `Rejected`. Approval settles against the ledger in
//! the same operation.
//!
//! Members cannot open authorizations themselves; they file a
//! [`PendingRequest`] that a provider endorses or rejects.

pub mod engine;
pub mod error;
pub mod pending;
pub mod request;
pub mod review;

pub use engine::{
    Actor, AdjudicationEngine, AuthIntake, Decision, PendingIntake, ReviewStats,
};
pub use error::AuthError;
pub use pending::PendingRequest;
pub use request::{AuthStatus, PriorAuthRequest, RequestSource, Urgency};
pub use review::ReviewPolicy;

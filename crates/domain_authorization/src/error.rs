//! Authorization errors

use core_kernel::AuthId;
use domain_ledger::LedgerError;
use domain_party::PartyError;
use infra_store::StoreError;
use thiserror::Error;

use crate::request::AuthStatus;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The actor may not perform this action on this request
    #[error("{actor} is not allowed to {action}")]
    Unauthorized {
        actor: String,
        action: &'static str,
    },

    /// The request is not in a status that permits the transition
    #[error("authorization {auth_id} cannot move from {from} to {to}")]
    InvalidState {
        auth_id: AuthId,
        from: AuthStatus,
        to: AuthStatus,
    },

    /// The named subscription does not tie this member to this payer
    #[error("subscription {subscription_id} does not cover member {member_id} under payer {payer_id}")]
    SubscriptionMismatch {
        subscription_id: core_kernel::SubscriptionId,
        member_id: core_kernel::MemberId,
        payer_id: core_kernel::PayerId,
    },

    /// No active subscription exists for the (member, payer) pair
    #[error("member {member_id} has no active subscription with payer {payer_id}")]
    NoActiveSubscription {
        member_id: core_kernel::MemberId,
        payer_id: core_kernel::PayerId,
    },

    /// Repeated id collisions while creating a request
    #[error("could not allocate a fresh authorization id")]
    IdSpaceExhausted,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Party(#[from] PartyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Returns true when the underlying entity was missing from the store
    pub fn is_not_found(&self) -> bool {
        match self {
            AuthError::Store(StoreError::NotFound { .. }) => true,
            AuthError::Ledger(e) => e.is_not_found(),
            _ => false,
        }
    }
}

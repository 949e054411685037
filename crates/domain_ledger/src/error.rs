//! Ledger errors

use core_kernel::{MemberId, Money, MoneyError, PayerId, SubscriptionId};
use domain_party::PartyError;
use infra_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The subscription exists but is expired or cancelled
    #[error("subscription {0} is not active")]
    SubscriptionNotActive(SubscriptionId),

    /// Nothing left to draw: the member's remaining balance is zero
    #[error("subscription {0} has no remaining balance")]
    InsufficientBalance(SubscriptionId),

    /// The payer's pool cannot cover the (already clamped) debit
    #[error("payer {payer_id} limit exceeded: requested {requested}, available {available}")]
    PayerLimitExceeded {
        payer_id: PayerId,
        requested: Money,
        available: Money,
    },

    #[error("member {member_id} already has an active subscription with payer {payer_id}")]
    AlreadySubscribed {
        member_id: MemberId,
        payer_id: PayerId,
    },

    /// Repeated id collisions while opening a subscription
    #[error("could not allocate a fresh subscription id")]
    IdSpaceExhausted,

    #[error("money error: {0}")]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PartyError> for LedgerError {
    fn from(err: PartyError) -> Self {
        match err {
            PartyError::LimitExceeded {
                payer_id,
                requested,
                available,
            } => LedgerError::PayerLimitExceeded {
                payer_id,
                requested,
                available,
            },
            PartyError::IdSpaceExhausted { .. } => LedgerError::IdSpaceExhausted,
            PartyError::Money(e) => LedgerError::Money(e),
            PartyError::Store(e) => LedgerError::Store(e),
        }
    }
}

impl LedgerError {
    /// Returns true when the underlying entity was missing from the store
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Store(StoreError::NotFound { .. }))
    }
}

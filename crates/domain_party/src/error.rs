//! Party domain errors

use core_kernel::{Money, MoneyError, PayerId};
use infra_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartyError {
    /// The payer's remaining pool cannot cover the requested payment
    #[error("payer {payer_id} coverage limit exceeded: requested {requested}, available {available}")]
    LimitExceeded {
        payer_id: PayerId,
        requested: Money,
        available: Money,
    },

    /// Repeated id collisions while registering; the code space is nearly full
    #[error("could not allocate a fresh {entity} id")]
    IdSpaceExhausted { entity: &'static str },

    #[error("money error: {0}")]
    Money(#[from] MoneyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

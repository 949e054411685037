//! Domain Ledger - enrollment and settlement for insurance subscriptions
//!
//! The ledger is the system of record for who is covered and how much value
//! remains:
//!
//! - [`InsuranceSubscription`] - the member-side coverage account, where
//!   `remaining_balance + amount_reimbursed == unit_price` at all times
//! - [`LedgerManager`] - enrollment ([`LedgerManager::subscribe`]) and
//!   settlement ([`LedgerManager::reserve_and_debit`], which clamps the
//!   requested amount to the remaining balance rather than overdrawing)
//!
//! Settlement never reverses: a debited amount stays debited even if the
//! authorization is later disputed. See DESIGN.md for the rationale.

pub mod error;
pub mod manager;
pub mod subscription;

pub use error::LedgerError;
pub use manager::{DebitReceipt, LedgerManager};
pub use subscription::{InsuranceSubscription, SubscriptionStatus};

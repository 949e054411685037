//! Core Kernel - Foundational types for the prior-authorization system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Short-code identifiers (`M###`, `PAY####`, `AUTH####`, ...) with an
//!   injectable randomness source
//! - Common error and port abstractions

pub mod identifiers;
pub mod money;
pub mod ports;
pub mod random;

pub use identifiers::{
    AuthId, IdGenerator, MemberId, ParseIdError, PayerId, PendingId, ProviderId, SubscriptionId,
};
pub use money::{Currency, Money, MoneyError};
pub use ports::{
    AdapterHealth, CircuitBreakerConfig, HealthCheckResult, HealthCheckable, PortError,
};
pub use random::{choose_from, Randomness, SeededRandomness, ThreadRandomness};

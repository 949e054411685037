//! Infra Store - in-memory keyed storage for domain entities
//!
//! This crate provides the storage substrate the domain crates build on:
//!
//! - [`Collection`] - a thread-safe keyed collection with get/put/insert,
//!   predicate queries, and closure-based atomic updates
//! - [`KeyedLocks`] - per-key async mutexes for serializing multi-step
//!   operations against the same entity
//!
//! The store holds no business rules. Callers enforce invariants inside the
//! update closures, which run under the collection write lock and are applied
//! all-or-nothing.

pub mod collection;
pub mod error;
pub mod locks;

pub use collection::{Collection, Entity};
pub use error::StoreError;
pub use locks::KeyedLocks;

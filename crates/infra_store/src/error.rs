//! Store errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors raised by the entity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} already exists: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        StoreError::Duplicate {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns true if this is a duplicate-key conflict
    ///
    /// Identifier generators have a small code space, so creation sites
    /// check this variant and retry with a fresh identifier.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

impl From<StoreError> for PortError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => PortError::not_found(entity, key),
            StoreError::Duplicate { entity, key } => {
                PortError::conflict(format!("{entity} already exists: {key}"))
            }
            StoreError::Closed => PortError::connection("store is closed"),
        }
    }
}

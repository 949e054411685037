//! Short-code identifiers for domain entities
//!
//! Persisted identifiers in this system are short human-readable codes
//! (`M042`, `PAY1234`, `AUTH5821`, `SUB004417`). Newtype wrappers prevent
//! accidental mixing of identifier types, and generation goes through
//! [`IdGenerator`] so the randomness source can be substituted in tests.
//!
//! Uniqueness is expected but not guaranteed by construction: the code space
//! is small, so creation sites must retry on a duplicate-key conflict.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::random::Randomness;

/// Error returned when parsing a short-code identifier fails
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid identifier {value:?}: expected {expected} followed by {digits} digits")]
pub struct ParseIdError {
    pub expected: &'static str,
    pub digits: usize,
    pub value: String,
}

macro_rules! define_code {
    ($name:ident, $prefix:literal, $digits:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Returns the identifier prefix
            pub fn prefix() -> &'static str {
                $prefix
            }

            /// Number of digits following the prefix
            pub fn digits() -> usize {
                $digits
            }

            /// Builds the identifier for a numeric suffix
            pub fn from_number(n: u64) -> Self {
                Self(format!(concat!($prefix, "{:0width$}"), n, width = $digits))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let err = || ParseIdError {
                    expected: $prefix,
                    digits: $digits,
                    value: s.to_string(),
                };
                let suffix = s.strip_prefix($prefix).ok_or_else(err)?;
                if suffix.len() != $digits || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

define_code!(MemberId, "M", 3);
define_code!(ProviderId, "P", 3);
define_code!(PayerId, "PAY", 4);
define_code!(AuthId, "AUTH", 4);
define_code!(SubscriptionId, "SUB", 6);
define_code!(PendingId, "PEND", 4);

/// Generates fresh short-code identifiers from an injected randomness source
///
/// Cloning is cheap; all clones share the same underlying source.
#[derive(Clone)]
pub struct IdGenerator {
    rng: Arc<dyn Randomness>,
}

impl IdGenerator {
    pub fn new(rng: Arc<dyn Randomness>) -> Self {
        Self { rng }
    }

    fn suffix(&self, digits: u32) -> u64 {
        self.rng.below(10u64.pow(digits))
    }

    pub fn member_id(&self) -> MemberId {
        MemberId::from_number(self.suffix(3))
    }

    pub fn provider_id(&self) -> ProviderId {
        ProviderId::from_number(self.suffix(3))
    }

    pub fn payer_id(&self) -> PayerId {
        PayerId::from_number(self.suffix(4))
    }

    pub fn auth_id(&self) -> AuthId {
        AuthId::from_number(self.suffix(4))
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId::from_number(self.suffix(6))
    }

    pub fn pending_id(&self) -> PendingId {
        PendingId::from_number(self.suffix(4))
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

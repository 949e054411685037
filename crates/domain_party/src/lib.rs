//! Domain Party - the people and organizations in the authorization flow
//!
//! Three entity types participate in every authorization:
//!
//! - [`Member`] - the patient, carrying claim history and reimbursement totals
//! - [`Provider`] - the clinician who endorses and submits requests
//! - [`Payer`] - the insurer funding settlements out of a bounded pool
//!
//! [`PartyDirectory`] handles registration with retry-on-collision id
//! assignment and shares its collection handles with the ledger and the
//! adjudication engine.

pub mod directory;
pub mod error;
pub mod member;
pub mod payer;
pub mod provider;

pub use directory::{NewMember, NewPayer, NewProvider, PartyDirectory};
pub use error::PartyError;
pub use member::Member;
pub use payer::Payer;
pub use provider::{NetworkType, Provider};

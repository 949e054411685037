//! Decision Assist - advisory review over an external model service
//!
//! This crate is the adapter boundary to the model service that pre-reviews
//! prior-authorization requests and powers the text conveniences:
//!
//! - [`DecisionAssist`] - the port: `review`, `format_text`, `autocomplete`,
//!   `chat`
//! - [`HttpAssist`] - the production adapter: OpenAI-style chat completions
//!   over reqwest, with retry and a circuit breaker
//! - [`ScriptedAssist`] - deterministic adapter for tests
//! - [`Assist`] - facade applying the degradation rules (raw input, empty
//!   suggestion, fixed apology) to the text operations
//!
//! Review output is advisory. The engine maps it into the request state
//! machine and applies its own overrides; nothing in this crate moves money
//! or changes a request.

pub mod adapter;
pub mod assist;
pub mod config;
pub mod disposition;
pub mod error;
pub mod extract;
pub mod http;
pub mod scripted;

pub use adapter::{ChatContext, DecisionAssist, MemberProfile, PastRequest, ReviewContext};
pub use assist::{Assist, CHAT_FALLBACK};
pub use config::AssistConfig;
pub use disposition::{Disposition, DispositionStatus, FALLBACK_REASON};
pub use error::AssistError;
pub use http::HttpAssist;
pub use scripted::ScriptedAssist;

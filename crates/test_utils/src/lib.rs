//! Test Utilities
//!
//! Shared infrastructure for the workspace test suites:
//!
//! - `fixtures`: pre-built amounts and clinical strings
//! - `builders`: builders for intake and registration data
//! - `harness`: the full stack wired with scripted assist and seeded
//!   randomness
//! - `assertions`: invariant checks for ledger and payer accounting

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod harness;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use harness::*;

use once_cell::sync::OnceCell;

/// Initializes test logging once per process
///
/// Honors `RUST_LOG`; output goes through the test writer so it interleaves
/// with captured test output.
pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

//! Pre-built test data for common entities

use core_kernel::{Currency, Money};

/// Money amounts used across the test suites
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: i64) -> Money {
        Money::from_units(amount, Currency::USD)
    }

    /// Standard plan coverage
    pub fn unit_price() -> Money {
        Self::usd(5_000)
    }

    /// Standard payer pool
    pub fn payer_limit() -> Money {
        Self::usd(100_000)
    }

    pub fn deductible_tiers() -> Vec<Money> {
        vec![Self::usd(500), Self::usd(1_000), Self::usd(2_000)]
    }

    pub fn copay_tiers() -> Vec<Money> {
        vec![Self::usd(20), Self::usd(40)]
    }
}

/// Free-text clinical strings
pub struct ClinicalFixtures;

impl ClinicalFixtures {
    pub fn routine_procedure() -> &'static str {
        "MRI lumbar spine"
    }

    pub fn high_risk_procedure() -> &'static str {
        "heart surgery"
    }

    pub fn diagnosis() -> &'static str {
        "chronic lower back pain"
    }
}

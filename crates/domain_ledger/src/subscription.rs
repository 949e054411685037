//! Insurance subscription entity
//!
//! A subscription is the member-side coverage account: it opens with
//! `remaining_balance == unit_price` and every settled debit moves value from
//! `remaining_balance` to `amount_reimbursed`. The pair always sums back to
//! `unit_price`, and the balance never goes below zero because debits are
//! clamped to it before they are applied.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuthId, MemberId, Money, PayerId, SubscriptionId};
use infra_store::Entity;

use crate::error::LedgerError;

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionStatus::Active)
    }
}

/// Coverage period granted on enrollment
const VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceSubscription {
    pub subscription_id: SubscriptionId,
    pub member_id: MemberId,
    pub payer_id: PayerId,
    /// Denormalized for display; the member record is authoritative
    pub member_name: String,
    pub payer_name: String,
    /// Nominal coverage at enrollment
    pub unit_price: Money,
    /// Total settled against this subscription so far
    pub amount_reimbursed: Money,
    /// What is left to draw; `unit_price - amount_reimbursed`
    pub remaining_balance: Money,
    /// Deductible tier selected at enrollment
    pub deductible: Money,
    /// Copay tier selected at enrollment
    pub copay: Money,
    /// Coverage categories copied from the payer plan
    pub coverage_scheme: Vec<String>,
    pub status: SubscriptionStatus,
    pub subscription_date: DateTime<Utc>,
    pub validity_date: DateTime<Utc>,
    /// Settled authorizations in order of settlement
    pub claims_history: Vec<AuthId>,
}

impl InsuranceSubscription {
    /// Opens a new active subscription valid for one year
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        subscription_id: SubscriptionId,
        member_id: MemberId,
        payer_id: PayerId,
        member_name: String,
        payer_name: String,
        unit_price: Money,
        deductible: Money,
        copay: Money,
        coverage_scheme: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let currency = unit_price.currency();
        Self {
            subscription_id,
            member_id,
            payer_id,
            member_name,
            payer_name,
            unit_price,
            amount_reimbursed: Money::zero(currency),
            remaining_balance: unit_price,
            deductible,
            copay,
            coverage_scheme,
            status: SubscriptionStatus::Active,
            subscription_date: now,
            validity_date: now + Duration::days(VALIDITY_DAYS),
            claims_history: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// True when the coverage period has ended, regardless of status
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.validity_date
    }

    /// Checks `remaining_balance + amount_reimbursed == unit_price`
    pub fn accounts_balance(&self) -> bool {
        match self.remaining_balance.checked_add(&self.amount_reimbursed) {
            Ok(sum) => sum == self.unit_price && !self.remaining_balance.is_negative(),
            Err(_) => false,
        }
    }

    /// Applies an already-clamped debit and records the authorization
    ///
    /// Callers clamp `amount` to `remaining_balance` first; a debit that
    /// would overdraw fails and leaves the record unchanged.
    pub fn apply_debit(&mut self, auth_id: AuthId, amount: Money) -> Result<Money, LedgerError> {
        if !self.is_active() {
            return Err(LedgerError::SubscriptionNotActive(
                self.subscription_id.clone(),
            ));
        }
        if !self.remaining_balance.is_positive() {
            return Err(LedgerError::InsufficientBalance(
                self.subscription_id.clone(),
            ));
        }
        let new_remaining = self.remaining_balance.checked_sub(&amount)?;
        if new_remaining.is_negative() {
            return Err(LedgerError::InsufficientBalance(
                self.subscription_id.clone(),
            ));
        }
        self.remaining_balance = new_remaining;
        self.amount_reimbursed = self.amount_reimbursed.checked_add(&amount)?;
        self.claims_history.push(auth_id);
        Ok(self.remaining_balance)
    }

    pub fn expire(&mut self) {
        self.status = SubscriptionStatus::Expired;
    }

    pub fn cancel(&mut self) {
        self.status = SubscriptionStatus::Cancelled;
    }
}

impl Entity for InsuranceSubscription {
    type Key = SubscriptionId;
    const NAME: &'static str = "subscription";

    fn key(&self) -> SubscriptionId {
        self.subscription_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    use super::*;

    fn sub(unit_price: i64) -> InsuranceSubscription {
        InsuranceSubscription::open(
            SubscriptionId::from_number(1),
            MemberId::from_number(1),
            PayerId::from_number(1),
            "Asha Rao".into(),
            "Acme Health".into(),
            Money::from_units(unit_price, Currency::USD),
            Money::from_units(500, Currency::USD),
            Money::from_units(20, Currency::USD),
            vec!["surgical".into()],
            Utc::now(),
        )
    }

    #[test]
    fn debit_moves_value_between_sides() {
        let mut s = sub(5_000);
        let left = s
            .apply_debit(AuthId::from_number(1), Money::new(dec!(1200), Currency::USD))
            .unwrap();
        assert_eq!(left, Money::new(dec!(3800), Currency::USD));
        assert_eq!(s.amount_reimbursed, Money::new(dec!(1200), Currency::USD));
        assert!(s.accounts_balance());
    }

    #[test]
    fn debit_on_expired_subscription_fails() {
        let mut s = sub(5_000);
        s.expire();
        let err = s
            .apply_debit(AuthId::from_number(1), Money::new(dec!(10), Currency::USD))
            .unwrap_err();
        assert!(matches!(err, LedgerError::SubscriptionNotActive(_)));
    }

    #[test]
    fn debit_on_drained_subscription_fails() {
        let mut s = sub(1_000);
        s.apply_debit(AuthId::from_number(1), Money::new(dec!(1000), Currency::USD))
            .unwrap();
        assert!(s.remaining_balance.is_zero());
        let err = s
            .apply_debit(AuthId::from_number(2), Money::new(dec!(1), Currency::USD))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance(_)));
    }
}

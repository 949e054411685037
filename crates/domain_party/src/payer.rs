//! Payer (insurer) entity
//!
//! The payer carries the funding pool every settlement draws from. The
//! accounting invariant is `balance_left + total_amount_paid == limit`;
//! [`Payer::record_payment`] is the only mutation that touches all three
//! fields and it preserves the invariant or changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuthId, Money, PayerId};
use infra_store::Entity;

use crate::error::PartyError;

/// An insurer offering one plan with a bounded funding pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub payer_id: PayerId,
    pub name: String,
    pub email: String,
    /// Nominal coverage each subscription opens with
    pub unit_price: Money,
    /// Total pool the payer will ever pay out
    pub limit: Money,
    /// Unspent portion of the pool
    pub balance_left: Money,
    /// Spent portion of the pool
    pub total_amount_paid: Money,
    /// Deductible options a new subscription picks from
    pub deductible_tiers: Vec<Money>,
    /// Copay options a new subscription picks from
    pub copay_tiers: Vec<Money>,
    /// Procedure categories the plan covers, free-text
    pub coverage_types: Vec<String>,
    /// Authorizations awaiting this payer's decision
    pub pending_cases: Vec<AuthId>,
    /// Authorizations this payer has approved and funded
    pub approved_cases: Vec<AuthId>,
    pub created_at: DateTime<Utc>,
}

impl Payer {
    pub fn new(
        payer_id: PayerId,
        name: impl Into<String>,
        email: impl Into<String>,
        unit_price: Money,
        limit: Money,
    ) -> Self {
        let currency = limit.currency();
        Self {
            payer_id,
            name: name.into(),
            email: email.into(),
            unit_price,
            limit,
            balance_left: limit,
            total_amount_paid: Money::zero(currency),
            deductible_tiers: Vec::new(),
            copay_tiers: Vec::new(),
            coverage_types: Vec::new(),
            pending_cases: Vec::new(),
            approved_cases: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// True while the pool still has funds to draw on
    pub fn has_funds(&self) -> bool {
        self.balance_left.is_positive()
    }

    /// Checks the pool accounting invariant
    pub fn accounts_balance(&self) -> bool {
        match self.balance_left.checked_add(&self.total_amount_paid) {
            Ok(sum) => sum == self.limit,
            Err(_) => false,
        }
    }

    /// Queues an authorization for this payer's decision
    pub fn note_pending_case(&mut self, auth_id: AuthId) {
        if !self.pending_cases.contains(&auth_id) {
            self.pending_cases.push(auth_id);
        }
    }

    /// Funds an approved authorization out of the pool
    ///
    /// Fails with [`PartyError::LimitExceeded`] when the pool cannot cover
    /// `amount`, and with a currency mismatch when `amount` is not in the
    /// pool's currency; on failure no field is modified. On success the case
    /// moves from pending to approved and the new `balance_left` is returned.
    pub fn record_payment(&mut self, auth_id: &AuthId, amount: Money) -> Result<Money, PartyError> {
        let new_balance = self.balance_left.checked_sub(&amount)?;
        if new_balance.is_negative() {
            return Err(PartyError::LimitExceeded {
                payer_id: self.payer_id.clone(),
                requested: amount,
                available: self.balance_left,
            });
        }
        let new_paid = self.total_amount_paid.checked_add(&amount)?;
        self.balance_left = new_balance;
        self.total_amount_paid = new_paid;
        self.pending_cases.retain(|id| id != auth_id);
        if !self.approved_cases.contains(auth_id) {
            self.approved_cases.push(auth_id.clone());
        }
        Ok(self.balance_left)
    }

    /// Drops an authorization from the pending queue without funding it
    pub fn drop_pending_case(&mut self, auth_id: &AuthId) {
        self.pending_cases.retain(|id| id != auth_id);
    }
}

impl Entity for Payer {
    type Key = PayerId;
    const NAME: &'static str = "payer";

    fn key(&self) -> PayerId {
        self.payer_id.clone()
    }
}

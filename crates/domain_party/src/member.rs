//! Member (patient) entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuthId, MemberId, Money, SubscriptionId};
use infra_store::Entity;

/// A plan member: the patient on whose behalf authorizations are requested
///
/// Members are never deleted. `amount_reimbursed` and `claim_history` are
/// running denormalizations maintained by the ledger when a debit settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Known diagnoses, free-text
    pub diseases: Vec<String>,
    /// Authorization ids that settled against this member, oldest first
    pub claim_history: Vec<AuthId>,
    /// Lifetime total paid out on this member's behalf
    pub amount_reimbursed: Money,
    /// Currently active subscription, if any
    pub current_plan: Option<SubscriptionId>,
    /// When the current plan lapses
    pub insurance_validity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(member_id: MemberId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            member_id,
            name: name.into(),
            email: email.into(),
            date_of_birth: None,
            gender: None,
            address: None,
            phone: None,
            diseases: Vec::new(),
            claim_history: Vec::new(),
            amount_reimbursed: Money::zero(core_kernel::Currency::USD),
            current_plan: None,
            insurance_validity: None,
            created_at: Utc::now(),
        }
    }

    /// Records a settled authorization against this member
    pub fn record_settlement(&mut self, auth_id: AuthId, amount: Money) {
        self.claim_history.push(auth_id);
        self.amount_reimbursed = self.amount_reimbursed + amount;
    }

    /// Links the member to a newly opened subscription
    pub fn link_plan(&mut self, subscription_id: SubscriptionId, validity: DateTime<Utc>) {
        self.current_plan = Some(subscription_id);
        self.insurance_validity = Some(validity);
    }
}

impl Entity for Member {
    type Key = MemberId;
    const NAME: &'static str = "member";

    fn key(&self) -> MemberId {
        self.member_id.clone()
    }
}

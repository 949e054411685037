//! Builders for intake data
//!
//! Only the relevant fields need specifying; everything else has a sensible
//! default drawn from the fixtures.

use core_kernel::{MemberId, Money, PayerId, ProviderId, SubscriptionId};
use domain_authorization::{AuthIntake, PendingIntake, Urgency};
use domain_party::{NetworkType, NewMember, NewPayer, NewProvider};

use crate::fixtures::{ClinicalFixtures, MoneyFixtures};

pub struct NewMemberBuilder {
    inner: NewMember,
}

impl Default for NewMemberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewMemberBuilder {
    pub fn new() -> Self {
        Self {
            inner: NewMember {
                name: "Asha Rao".into(),
                email: "asha@example.com".into(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.inner.name = name.into();
        self
    }

    pub fn disease(mut self, disease: &str) -> Self {
        self.inner.diseases.push(disease.into());
        self
    }

    pub fn build(self) -> NewMember {
        self.inner
    }
}

pub struct NewProviderBuilder {
    inner: NewProvider,
}

impl Default for NewProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewProviderBuilder {
    pub fn new() -> Self {
        Self {
            inner: NewProvider {
                name: "Dr. Lin".into(),
                email: "lin@clinic.example".into(),
                expertise: "cardiology".into(),
                network_type: NetworkType::InNetwork,
                license_number: Some("LIC-4412".into()),
                practice_name: None,
                years_experience: Some(12),
                board_certified: true,
                languages: vec!["en".into()],
            },
        }
    }

    pub fn expertise(mut self, expertise: &str) -> Self {
        self.inner.expertise = expertise.into();
        self
    }

    pub fn build(self) -> NewProvider {
        self.inner
    }
}

pub struct NewPayerBuilder {
    inner: NewPayer,
}

impl Default for NewPayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewPayerBuilder {
    pub fn new() -> Self {
        Self {
            inner: NewPayer {
                name: "Acme Health".into(),
                email: "claims@acme.example".into(),
                unit_price: MoneyFixtures::unit_price(),
                limit: MoneyFixtures::payer_limit(),
                deductible_tiers: MoneyFixtures::deductible_tiers(),
                copay_tiers: MoneyFixtures::copay_tiers(),
                coverage_types: vec!["surgical".into(), "imaging".into()],
            },
        }
    }

    pub fn unit_price(mut self, unit_price: Money) -> Self {
        self.inner.unit_price = unit_price;
        self
    }

    pub fn limit(mut self, limit: Money) -> Self {
        self.inner.limit = limit;
        self
    }

    pub fn build(self) -> NewPayer {
        self.inner
    }
}

pub struct AuthIntakeBuilder {
    inner: AuthIntake,
}

impl AuthIntakeBuilder {
    pub fn new(
        member_id: MemberId,
        provider_id: ProviderId,
        payer_id: PayerId,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self {
            inner: AuthIntake {
                member_id,
                provider_id,
                payer_id,
                subscription_id,
                procedure: ClinicalFixtures::routine_procedure().into(),
                diagnosis: ClinicalFixtures::diagnosis().into(),
                urgency: Urgency::Routine,
                member_notes: None,
                provider_notes: None,
                auth_amount: MoneyFixtures::usd(1_200),
            },
        }
    }

    pub fn procedure(mut self, procedure: &str) -> Self {
        self.inner.procedure = procedure.into();
        self
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.inner.urgency = urgency;
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.inner.auth_amount = amount;
        self
    }

    pub fn build(self) -> AuthIntake {
        self.inner
    }
}

pub struct PendingIntakeBuilder {
    inner: PendingIntake,
}

impl PendingIntakeBuilder {
    pub fn new(member_id: MemberId, provider_id: ProviderId, payer_id: PayerId) -> Self {
        Self {
            inner: PendingIntake {
                member_id,
                provider_id,
                payer_id,
                procedure: ClinicalFixtures::routine_procedure().into(),
                diagnosis: ClinicalFixtures::diagnosis().into(),
                urgency: Urgency::Routine,
                member_notes: None,
            },
        }
    }

    pub fn procedure(mut self, procedure: &str) -> Self {
        self.inner.procedure = procedure.into();
        self
    }

    pub fn member_notes(mut self, notes: &str) -> Self {
        self.inner.member_notes = Some(notes.into());
        self
    }

    pub fn build(self) -> PendingIntake {
        self.inner
    }
}

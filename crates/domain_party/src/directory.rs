//! Party directory: registration and lookup for members, providers, payers
//!
//! Identifier codes are short, so registration draws a random id and retries
//! on a duplicate-key conflict rather than assuming uniqueness.

use chrono::NaiveDate;

use core_kernel::{IdGenerator, Money};
use infra_store::{Collection, Entity};

use crate::error::PartyError;
use crate::member::Member;
use crate::payer::Payer;
use crate::provider::{NetworkType, Provider};

/// Attempts before giving up on finding an unused identifier
const MAX_ID_ATTEMPTS: usize = 8;

/// Intake details for a new member
#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub diseases: Vec<String>,
}

/// Intake details for a new provider
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub email: String,
    pub expertise: String,
    pub network_type: NetworkType,
    pub license_number: Option<String>,
    pub practice_name: Option<String>,
    pub years_experience: Option<u32>,
    pub board_certified: bool,
    pub languages: Vec<String>,
}

/// Intake details for a new payer plan
#[derive(Debug, Clone)]
pub struct NewPayer {
    pub name: String,
    pub email: String,
    pub unit_price: Money,
    pub limit: Money,
    pub deductible_tiers: Vec<Money>,
    pub copay_tiers: Vec<Money>,
    pub coverage_types: Vec<String>,
}

/// Registration and lookup service over the party collections
///
/// Collection handles are shared: the ledger and the adjudication engine
/// operate on clones of the same collections this directory registers into.
#[derive(Debug, Clone)]
pub struct PartyDirectory {
    members: Collection<Member>,
    providers: Collection<Provider>,
    payers: Collection<Payer>,
    ids: IdGenerator,
}

impl PartyDirectory {
    pub fn new(
        members: Collection<Member>,
        providers: Collection<Provider>,
        payers: Collection<Payer>,
        ids: IdGenerator,
    ) -> Self {
        Self {
            members,
            providers,
            payers,
            ids,
        }
    }

    pub fn members(&self) -> Collection<Member> {
        self.members.clone()
    }

    pub fn providers(&self) -> Collection<Provider> {
        self.providers.clone()
    }

    pub fn payers(&self) -> Collection<Payer> {
        self.payers.clone()
    }

    pub async fn register_member(&self, new: NewMember) -> Result<Member, PartyError> {
        let member = insert_with_retry(&self.members, || {
            let mut m = Member::new(self.ids.member_id(), new.name.clone(), new.email.clone());
            m.date_of_birth = new.date_of_birth;
            m.gender = new.gender.clone();
            m.address = new.address.clone();
            m.phone = new.phone.clone();
            m.diseases = new.diseases.clone();
            m
        })
        .await?;
        tracing::info!(member_id = %member.member_id, "registered member");
        Ok(member)
    }

    pub async fn register_provider(&self, new: NewProvider) -> Result<Provider, PartyError> {
        let provider = insert_with_retry(&self.providers, || {
            let mut p = Provider::new(
                self.ids.provider_id(),
                new.name.clone(),
                new.email.clone(),
                new.expertise.clone(),
            );
            p.network_type = new.network_type;
            p.license_number = new.license_number.clone();
            p.practice_name = new.practice_name.clone();
            p.years_experience = new.years_experience;
            p.board_certified = new.board_certified;
            p.languages = new.languages.clone();
            p
        })
        .await?;
        tracing::info!(provider_id = %provider.provider_id, "registered provider");
        Ok(provider)
    }

    pub async fn register_payer(&self, new: NewPayer) -> Result<Payer, PartyError> {
        let payer = insert_with_retry(&self.payers, || {
            let mut p = Payer::new(
                self.ids.payer_id(),
                new.name.clone(),
                new.email.clone(),
                new.unit_price,
                new.limit,
            );
            p.deductible_tiers = new.deductible_tiers.clone();
            p.copay_tiers = new.copay_tiers.clone();
            p.coverage_types = new.coverage_types.clone();
            p
        })
        .await?;
        tracing::info!(payer_id = %payer.payer_id, "registered payer");
        Ok(payer)
    }

    pub async fn member(&self, id: &core_kernel::MemberId) -> Result<Member, PartyError> {
        Ok(self.members.get(id).await?)
    }

    pub async fn provider(&self, id: &core_kernel::ProviderId) -> Result<Provider, PartyError> {
        Ok(self.providers.get(id).await?)
    }

    pub async fn payer(&self, id: &core_kernel::PayerId) -> Result<Payer, PartyError> {
        Ok(self.payers.get(id).await?)
    }
}

async fn insert_with_retry<T, F>(collection: &Collection<T>, mut make: F) -> Result<T, PartyError>
where
    T: Entity,
    F: FnMut() -> T,
{
    for attempt in 0..MAX_ID_ATTEMPTS {
        let candidate = make();
        match collection.insert(candidate.clone()).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.is_duplicate() => {
                tracing::debug!(entity = T::NAME, attempt, "id collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(PartyError::IdSpaceExhausted { entity: T::NAME })
}

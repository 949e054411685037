//! Full-stack test harness
//!
//! Wires every layer together with the scripted assist adapter and seeded
//! randomness, so end-to-end scenarios run deterministically and offline.

use std::sync::Arc;

use core_kernel::{IdGenerator, SeededRandomness};
use decision_assist::{Assist, DispositionStatus, ScriptedAssist};
use domain_authorization::{AdjudicationEngine, ReviewPolicy};
use domain_ledger::{InsuranceSubscription, LedgerManager};
use domain_party::{Member, Payer, PartyDirectory, Provider};
use infra_store::Collection;

use crate::builders::{NewMemberBuilder, NewPayerBuilder, NewProviderBuilder};

pub struct Harness {
    pub directory: PartyDirectory,
    pub ledger: Arc<LedgerManager>,
    pub engine: AdjudicationEngine,
    pub scripted: Arc<ScriptedAssist>,
    pub members: Collection<Member>,
    pub providers: Collection<Provider>,
    pub payers: Collection<Payer>,
    pub subscriptions: Collection<InsuranceSubscription>,
}

impl Harness {
    /// A harness whose assist adapter always fails, exercising fallbacks
    pub fn new(seed: u64) -> Self {
        Self::with_assist(seed, ScriptedAssist::new())
    }

    /// A harness whose assist adapter always recommends approval
    pub fn approving(seed: u64) -> Self {
        Self::with_assist(
            seed,
            ScriptedAssist::always(DispositionStatus::Approved, "within plan guidelines"),
        )
    }

    pub fn with_assist(seed: u64, scripted: ScriptedAssist) -> Self {
        crate::init_tracing();

        let members: Collection<Member> = Collection::open();
        let providers: Collection<Provider> = Collection::open();
        let payers: Collection<Payer> = Collection::open();
        let subscriptions: Collection<InsuranceSubscription> = Collection::open();

        let rng = Arc::new(SeededRandomness::new(seed));
        let ids = IdGenerator::new(rng.clone());

        let directory = PartyDirectory::new(
            members.clone(),
            providers.clone(),
            payers.clone(),
            ids.clone(),
        );
        let ledger = Arc::new(LedgerManager::new(
            members.clone(),
            payers.clone(),
            subscriptions.clone(),
            ids.clone(),
            rng,
        ));
        let scripted = Arc::new(scripted);
        let engine = AdjudicationEngine::new(
            Collection::open(),
            Collection::open(),
            members.clone(),
            providers.clone(),
            payers.clone(),
            Arc::clone(&ledger),
            Assist::new(scripted.clone()),
            ReviewPolicy::default(),
            ids,
        );

        Self {
            directory,
            ledger,
            engine,
            scripted,
            members,
            providers,
            payers,
            subscriptions,
        }
    }

    /// Registers the standard member, provider, and payer
    pub async fn standard_parties(&self) -> (Member, Provider, Payer) {
        let member = self
            .directory
            .register_member(NewMemberBuilder::new().build())
            .await
            .expect("register member");
        let provider = self
            .directory
            .register_provider(NewProviderBuilder::new().build())
            .await
            .expect("register provider");
        let payer = self
            .directory
            .register_payer(NewPayerBuilder::new().build())
            .await
            .expect("register payer");
        (member, provider, payer)
    }
}

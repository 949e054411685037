//! Provider (clinician) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuthId, ProviderId};
use infra_store::Entity;

/// How the provider relates to the payer's network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    InNetwork,
    OutOfNetwork,
}

/// A clinician who endorses member requests and submits authorizations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: ProviderId,
    pub name: String,
    pub email: String,
    /// Clinical specialty, free-text ("cardiology", "orthopedics")
    pub expertise: String,
    pub network_type: NetworkType,
    pub license_number: Option<String>,
    pub practice_name: Option<String>,
    pub years_experience: Option<u32>,
    pub board_certified: bool,
    pub languages: Vec<String>,
    /// Authorization ids this provider has been involved in
    pub claim_history: Vec<AuthId>,
    pub created_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(
        provider_id: ProviderId,
        name: impl Into<String>,
        email: impl Into<String>,
        expertise: impl Into<String>,
    ) -> Self {
        Self {
            provider_id,
            name: name.into(),
            email: email.into(),
            expertise: expertise.into(),
            network_type: NetworkType::InNetwork,
            license_number: None,
            practice_name: None,
            years_experience: None,
            board_certified: false,
            languages: Vec::new(),
            claim_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn record_authorization(&mut self, auth_id: AuthId) {
        self.claim_history.push(auth_id);
    }
}

impl Entity for Provider {
    type Key = ProviderId;
    const NAME: &'static str = "provider";

    fn key(&self) -> ProviderId {
        self.provider_id.clone()
    }
}

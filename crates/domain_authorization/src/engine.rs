//! Adjudication engine
//!
//! Orchestrates the request lifecycle: intake, advisory auto-review, the
//! payer/admin decision, and the settlement debit. The engine owns the two
//! rules the advisory service must never bend:
//!
//! - auto-review lands only non-terminal statuses
//! - approval and the ledger debit happen together; a failed debit leaves
//!   the request status untouched

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use core_kernel::{AuthId, IdGenerator, MemberId, Money, PayerId, PendingId, ProviderId, SubscriptionId};
use decision_assist::{
    Assist, Disposition, MemberProfile, PastRequest, ReviewContext,
};
use domain_ledger::{DebitReceipt, LedgerManager};
use domain_party::{Member, Payer, Provider};
use infra_store::{Collection, KeyedLocks};

use crate::error::AuthError;
use crate::pending::PendingRequest;
use crate::request::{AuthStatus, PriorAuthRequest, RequestSource, Urgency};
use crate::review::ReviewPolicy;

/// Prior requests shared with the reviewer, newest first
const HISTORY_WINDOW: usize = 10;

/// Deadline for one advisory review call
const DEFAULT_REVIEW_TIMEOUT: Duration = Duration::from_secs(15);

/// Attempts before giving up on finding an unused request id
const MAX_ID_ATTEMPTS: usize = 8;

/// Who is making a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// The payer on the request; may only decide its own requests
    Payer(PayerId),
    /// An administrator, identified by name
    Admin(String),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Payer(id) => write!(f, "payer {id}"),
            Actor::Admin(name) => write!(f, "admin {name}"),
        }
    }
}

/// The final decision on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Intake for a provider-submitted request
#[derive(Debug, Clone)]
pub struct AuthIntake {
    pub member_id: MemberId,
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    pub subscription_id: SubscriptionId,
    pub procedure: String,
    pub diagnosis: String,
    pub urgency: Urgency,
    pub member_notes: Option<String>,
    pub provider_notes: Option<String>,
    pub auth_amount: Money,
}

/// Intake for a member-filed pending request
#[derive(Debug, Clone)]
pub struct PendingIntake {
    pub member_id: MemberId,
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    pub procedure: String,
    pub diagnosis: String,
    pub urgency: Urgency,
    pub member_notes: Option<String>,
}

/// Aggregate counts over a payer's (or the whole system's) requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub awaiting_decision: usize,
    pub ai_processed: usize,
    /// Approved over decided; zero when nothing has been decided
    pub approval_rate: f64,
}

pub struct AdjudicationEngine {
    requests: Collection<PriorAuthRequest>,
    pending: Collection<PendingRequest>,
    members: Collection<Member>,
    providers: Collection<Provider>,
    payers: Collection<Payer>,
    ledger: Arc<LedgerManager>,
    assist: Assist,
    policy: ReviewPolicy,
    ids: IdGenerator,
    decide_locks: KeyedLocks<AuthId>,
    review_timeout: Duration,
}

impl AdjudicationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requests: Collection<PriorAuthRequest>,
        pending: Collection<PendingRequest>,
        members: Collection<Member>,
        providers: Collection<Provider>,
        payers: Collection<Payer>,
        ledger: Arc<LedgerManager>,
        assist: Assist,
        policy: ReviewPolicy,
        ids: IdGenerator,
    ) -> Self {
        Self {
            requests,
            pending,
            members,
            providers,
            payers,
            ledger,
            assist,
            policy,
            ids,
            decide_locks: KeyedLocks::new(),
            review_timeout: DEFAULT_REVIEW_TIMEOUT,
        }
    }

    /// Overrides the advisory review deadline
    pub fn with_review_timeout(mut self, timeout: Duration) -> Self {
        self.review_timeout = timeout;
        self
    }

    /// The text-operation facade, for note formatting and member chat
    pub fn assist(&self) -> &Assist {
        &self.assist
    }

    /// Opens a provider-submitted request and runs auto-review on it
    pub async fn submit_direct(&self, intake: AuthIntake) -> Result<PriorAuthRequest, AuthError> {
        // Referenced parties must exist
        self.members.get(&intake.member_id).await?;
        self.providers.get(&intake.provider_id).await?;
        self.payers.get(&intake.payer_id).await?;

        let subscription = self.ledger.subscription(&intake.subscription_id).await?;
        if subscription.member_id != intake.member_id || subscription.payer_id != intake.payer_id {
            return Err(AuthError::SubscriptionMismatch {
                subscription_id: intake.subscription_id.clone(),
                member_id: intake.member_id.clone(),
                payer_id: intake.payer_id.clone(),
            });
        }

        let request = self.open_request(&intake, RequestSource::Direct).await?;
        tracing::info!(
            auth_id = %request.auth_id,
            member_id = %request.member_id,
            procedure = %request.procedure,
            urgency = %request.urgency,
            "authorization submitted"
        );
        self.auto_review(&request.auth_id).await
    }

    /// Files a member pending request awaiting provider endorsement
    pub async fn submit_pending(&self, intake: PendingIntake) -> Result<PendingRequest, AuthError> {
        let member = self.members.get(&intake.member_id).await?;
        let provider = self.providers.get(&intake.provider_id).await?;
        let payer = self.payers.get(&intake.payer_id).await?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = PendingRequest {
                request_id: self.ids.pending_id(),
                member_id: intake.member_id.clone(),
                provider_id: intake.provider_id.clone(),
                payer_id: intake.payer_id.clone(),
                member_name: member.name.clone(),
                provider_name: provider.name.clone(),
                payer_name: payer.name.clone(),
                procedure: intake.procedure.clone(),
                diagnosis: intake.diagnosis.clone(),
                urgency: intake.urgency,
                member_notes: intake.member_notes.clone(),
                submitted_at: Utc::now(),
            };
            match self.pending.insert(candidate.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        request_id = %candidate.request_id,
                        member_id = %candidate.member_id,
                        provider_id = %candidate.provider_id,
                        "pending request filed"
                    );
                    return Ok(candidate);
                }
                Err(e) if e.is_duplicate() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::IdSpaceExhausted)
    }

    /// Endorses a pending request, converting it into a prior authorization
    ///
    /// The pending record is consumed exactly once; a concurrent second
    /// endorsement or rejection observes NotFound.
    pub async fn provider_approve_pending(
        &self,
        request_id: &PendingId,
        provider_id: &ProviderId,
        notes: Option<String>,
        auth_amount: Money,
    ) -> Result<PriorAuthRequest, AuthError> {
        let pend = self.pending.get(request_id).await?;
        if pend.provider_id != *provider_id {
            return Err(AuthError::Unauthorized {
                actor: format!("provider {provider_id}"),
                action: "endorse this pending request",
            });
        }

        // Resolve coverage before consuming the pending record
        let subscription = self
            .ledger
            .member_subscriptions(&pend.member_id)
            .await?
            .into_iter()
            .find(|s| s.payer_id == pend.payer_id && s.is_active())
            .ok_or_else(|| AuthError::NoActiveSubscription {
                member_id: pend.member_id.clone(),
                payer_id: pend.payer_id.clone(),
            })?;

        // Single-consumer point: whoever removes the record wins
        let pend = self.pending.remove(request_id).await?;

        let intake = AuthIntake {
            member_id: pend.member_id.clone(),
            provider_id: pend.provider_id.clone(),
            payer_id: pend.payer_id.clone(),
            subscription_id: subscription.subscription_id.clone(),
            procedure: pend.procedure.clone(),
            diagnosis: pend.diagnosis.clone(),
            urgency: pend.urgency,
            member_notes: pend.member_notes.clone(),
            provider_notes: notes,
            auth_amount,
        };
        let request = match self
            .open_request(&intake, RequestSource::ProviderApproved)
            .await
        {
            Ok(request) => request,
            Err(e) => {
                // The member's request must survive a failed conversion
                if let Err(restore) = self.pending.put(pend).await {
                    tracing::error!(
                        request_id = %request_id,
                        error = %restore,
                        "pending request lost after failed endorsement"
                    );
                }
                return Err(e);
            }
        };
        tracing::info!(
            request_id = %request_id,
            auth_id = %request.auth_id,
            provider_id = %provider_id,
            "pending request endorsed"
        );
        self.auto_review(&request.auth_id).await
    }

    /// Rejects a pending request; terminal, with no ledger effect
    pub async fn provider_reject_pending(
        &self,
        request_id: &PendingId,
        provider_id: &ProviderId,
        reason: Option<String>,
    ) -> Result<PendingRequest, AuthError> {
        let pend = self.pending.get(request_id).await?;
        if pend.provider_id != *provider_id {
            return Err(AuthError::Unauthorized {
                actor: format!("provider {provider_id}"),
                action: "reject this pending request",
            });
        }
        let removed = self.pending.remove(request_id).await?;
        tracing::info!(
            request_id = %request_id,
            provider_id = %provider_id,
            reason = reason.as_deref().unwrap_or("none given"),
            "pending request rejected by provider"
        );
        Ok(removed)
    }

    async fn open_request(
        &self,
        intake: &AuthIntake,
        source: RequestSource,
    ) -> Result<PriorAuthRequest, AuthError> {
        let request = 'created: {
            for _ in 0..MAX_ID_ATTEMPTS {
                let mut candidate = PriorAuthRequest::submit(
                    self.ids.auth_id(),
                    intake.member_id.clone(),
                    intake.provider_id.clone(),
                    intake.payer_id.clone(),
                    intake.subscription_id.clone(),
                    intake.procedure.clone(),
                    intake.diagnosis.clone(),
                    intake.urgency,
                    intake.auth_amount,
                    source,
                );
                candidate.member_notes = intake.member_notes.clone();
                candidate.provider_notes = intake.provider_notes.clone();
                match self.requests.insert(candidate.clone()).await {
                    Ok(()) => break 'created candidate,
                    Err(e) if e.is_duplicate() => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            return Err(AuthError::IdSpaceExhausted);
        };

        self.payers
            .update(&request.payer_id, |p| {
                p.note_pending_case(request.auth_id.clone());
                Ok::<_, AuthError>(())
            })
            .await?;
        self.providers
            .update(&request.provider_id, |p| {
                p.record_authorization(request.auth_id.clone());
                Ok::<_, AuthError>(())
            })
            .await?;
        Ok(request)
    }

    /// Runs the advisory review on a freshly submitted request
    ///
    /// The adapter call is bounded by the review deadline and never holds a
    /// store lock. Failure or unusable output degrades to manual review with
    /// `ai_processed` left false; the request always leaves `Submitted`.
    pub async fn auto_review(&self, auth_id: &AuthId) -> Result<PriorAuthRequest, AuthError> {
        let request = self.requests.get(auth_id).await?;
        if request.status != AuthStatus::Submitted {
            return Err(AuthError::InvalidState {
                auth_id: auth_id.clone(),
                from: request.status,
                to: AuthStatus::AutoReviewed,
            });
        }

        let ctx = self.review_context(&request).await?;
        let outcome = tokio::time::timeout(self.review_timeout, self.assist.review(&ctx)).await;
        let (disposition, processed) = match outcome {
            Ok(Ok(d)) => (d, true),
            Ok(Err(e)) => {
                tracing::warn!(auth_id = %auth_id, error = %e, "advisory review failed, degrading to manual review");
                (Disposition::fallback(), false)
            }
            Err(_) => {
                tracing::warn!(
                    auth_id = %auth_id,
                    timeout_ms = self.review_timeout.as_millis() as u64,
                    "advisory review timed out, degrading to manual review"
                );
                (Disposition::fallback(), false)
            }
        };

        let next = if processed {
            self.policy.route(&request, &disposition)
        } else {
            AuthStatus::PendingManualReview
        };

        let updated = self
            .requests
            .update(auth_id, |r| {
                r.transition(next)?;
                r.ai_processed = processed;
                r.ai_reviewed_at = Some(Utc::now());
                if processed {
                    r.ai_decision = Some(disposition.status);
                    r.ai_reason = Some(disposition.reason.clone());
                    r.ai_notes = disposition.notes.clone();
                } else {
                    r.ai_reason = Some(disposition.reason.clone());
                }
                Ok::<_, AuthError>(r.clone())
            })
            .await?;

        tracing::info!(
            auth_id = %auth_id,
            status = %updated.status,
            ai_processed = updated.ai_processed,
            "auto-review complete"
        );
        Ok(updated)
    }

    async fn review_context(&self, request: &PriorAuthRequest) -> Result<ReviewContext, AuthError> {
        let member = self.members.get(&request.member_id).await?;
        let age = member.date_of_birth.map(|dob| {
            let days = (Utc::now().date_naive() - dob).num_days();
            (days / 365).max(0) as u32
        });

        let mut history = self
            .requests
            .find(|r| r.member_id == request.member_id && r.auth_id != request.auth_id)
            .await?;
        history.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        history.truncate(HISTORY_WINDOW);

        Ok(ReviewContext {
            procedure: request.procedure.clone(),
            diagnosis: request.diagnosis.clone(),
            urgency: request.urgency.to_string(),
            amount: request.auth_amount.to_string(),
            provider_notes: request.provider_notes.clone(),
            member: MemberProfile {
                name: member.name.clone(),
                age,
                gender: member.gender.clone(),
                diseases: member.diseases.clone(),
            },
            history: history
                .into_iter()
                .map(|r| PastRequest {
                    procedure: r.procedure,
                    status: r.status.to_string(),
                    decided_reason: r.review_notes.or(r.ai_reason),
                })
                .collect(),
        })
    }

    /// Makes the final decision on a request
    ///
    /// Only the payer on the request or an admin may decide. Approval runs
    /// the settlement debit first; if the debit fails the error surfaces and
    /// the request stays exactly where it was. Serialized per request, so a
    /// decided request can never be decided (or debited) twice.
    pub async fn decide(
        &self,
        auth_id: &AuthId,
        actor: &Actor,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<PriorAuthRequest, AuthError> {
        let _lock = self.decide_locks.acquire(auth_id).await;

        let request = self.requests.get(auth_id).await?;
        if let Actor::Payer(payer_id) = actor {
            if *payer_id != request.payer_id {
                return Err(AuthError::Unauthorized {
                    actor: actor.to_string(),
                    action: "decide this authorization",
                });
            }
        }
        let target = match decision {
            Decision::Approve => AuthStatus::Approved,
            Decision::Reject => AuthStatus::Rejected,
        };
        if !request.status.awaits_decision() {
            return Err(AuthError::InvalidState {
                auth_id: auth_id.clone(),
                from: request.status,
                to: target,
            });
        }

        let receipt: Option<DebitReceipt> = match decision {
            Decision::Approve => Some(
                self.ledger
                    .reserve_and_debit(&request.subscription_id, auth_id, request.auth_amount)
                    .await?,
            ),
            Decision::Reject => None,
        };

        let updated = self
            .requests
            .update(auth_id, |r| {
                r.transition(target)?;
                r.reviewed_at = Some(Utc::now());
                r.reviewed_by = Some(actor.to_string());
                r.review_notes = notes.clone();
                Ok::<_, AuthError>(r.clone())
            })
            .await?;

        if decision == Decision::Reject {
            self.payers
                .update(&request.payer_id, |p| {
                    p.drop_pending_case(auth_id);
                    Ok::<_, AuthError>(())
                })
                .await?;
        }

        match &receipt {
            Some(r) => tracing::info!(
                auth_id = %auth_id,
                actor = %actor,
                debited = %r.debited,
                remaining_balance = %r.remaining_balance,
                "authorization approved and settled"
            ),
            None => tracing::info!(auth_id = %auth_id, actor = %actor, "authorization rejected"),
        }
        Ok(updated)
    }

    /// Appends a note; the one mutation allowed on terminal requests
    pub async fn append_note(
        &self,
        auth_id: &AuthId,
        note: impl Into<String>,
    ) -> Result<PriorAuthRequest, AuthError> {
        let note = note.into();
        self.requests
            .update(auth_id, |r| {
                r.append_note(note.clone());
                Ok::<_, AuthError>(r.clone())
            })
            .await
    }

    pub async fn request(&self, auth_id: &AuthId) -> Result<PriorAuthRequest, AuthError> {
        Ok(self.requests.get(auth_id).await?)
    }

    pub async fn member_requests(
        &self,
        member_id: &MemberId,
    ) -> Result<Vec<PriorAuthRequest>, AuthError> {
        let mut out = self.requests.find(|r| r.member_id == *member_id).await?;
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(out)
    }

    pub async fn provider_requests(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<PriorAuthRequest>, AuthError> {
        let mut out = self.requests.find(|r| r.provider_id == *provider_id).await?;
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(out)
    }

    pub async fn payer_requests(
        &self,
        payer_id: &PayerId,
    ) -> Result<Vec<PriorAuthRequest>, AuthError> {
        let mut out = self.requests.find(|r| r.payer_id == *payer_id).await?;
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(out)
    }

    pub async fn pending_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<PendingRequest>, AuthError> {
        let mut out = self.pending.find(|p| p.provider_id == *provider_id).await?;
        out.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(out)
    }

    pub async fn pending_for_member(
        &self,
        member_id: &MemberId,
    ) -> Result<Vec<PendingRequest>, AuthError> {
        let mut out = self.pending.find(|p| p.member_id == *member_id).await?;
        out.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(out)
    }

    /// Aggregates decision counts, optionally scoped to one payer
    pub async fn review_stats(
        &self,
        payer_id: Option<&PayerId>,
    ) -> Result<ReviewStats, AuthError> {
        let requests = match payer_id {
            Some(id) => self.requests.find(|r| r.payer_id == *id).await?,
            None => self.requests.all().await?,
        };
        let total = requests.len();
        let approved = requests
            .iter()
            .filter(|r| r.status == AuthStatus::Approved)
            .count();
        let rejected = requests
            .iter()
            .filter(|r| r.status == AuthStatus::Rejected)
            .count();
        let awaiting_decision = requests
            .iter()
            .filter(|r| r.status.awaits_decision())
            .count();
        let ai_processed = requests.iter().filter(|r| r.ai_processed).count();
        let decided = approved + rejected;
        let approval_rate = if decided == 0 {
            0.0
        } else {
            approved as f64 / decided as f64
        };
        Ok(ReviewStats {
            total,
            approved,
            rejected,
            awaiting_decision,
            ai_processed,
            approval_rate,
        })
    }
}

impl std::fmt::Debug for AdjudicationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjudicationEngine")
            .field("review_timeout", &self.review_timeout)
            .finish_non_exhaustive()
    }
}

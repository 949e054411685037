//! Ledger manager: enrollment and settlement debits
//!
//! Two critical sections keep the ledger consistent without cross-collection
//! transactions:
//!
//! - `subscribe` runs under a manager-wide gate so two concurrent enrollments
//!   for the same (member, payer) pair cannot both pass the duplicate check.
//! - `reserve_and_debit` runs under a per-subscription lock, and orders its
//!   writes so the only fallible step (the payer pool draw) happens before
//!   anything else changes. A payer failure therefore leaves the ledger
//!   exactly as it was; once the payer draw succeeds the subscription and
//!   member updates cannot fail. Status changes (`cancel`, the expiry sweep)
//!   take the same per-subscription lock, so a subscription can never stop
//!   being active between the payer draw and the subscription update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use core_kernel::{
    choose_from, AuthId, Currency, IdGenerator, MemberId, Money, PayerId, Randomness,
    SubscriptionId,
};
use domain_party::{Member, Payer};
use infra_store::{Collection, KeyedLocks};

use crate::error::LedgerError;
use crate::subscription::InsuranceSubscription;

/// Attempts before giving up on finding an unused subscription id
const MAX_ID_ATTEMPTS: usize = 8;

/// Outcome of a settled debit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebitReceipt {
    /// What was actually drawn, after clamping to the remaining balance
    pub debited: Money,
    /// Subscription balance after the debit
    pub remaining_balance: Money,
    /// Payer pool balance after the draw
    pub payer_balance_left: Money,
}

/// Enrollment and settlement over the subscription ledger
pub struct LedgerManager {
    members: Collection<Member>,
    payers: Collection<Payer>,
    subscriptions: Collection<InsuranceSubscription>,
    debit_locks: KeyedLocks<SubscriptionId>,
    subscribe_gate: Mutex<()>,
    ids: IdGenerator,
    rng: Arc<dyn Randomness>,
}

impl LedgerManager {
    pub fn new(
        members: Collection<Member>,
        payers: Collection<Payer>,
        subscriptions: Collection<InsuranceSubscription>,
        ids: IdGenerator,
        rng: Arc<dyn Randomness>,
    ) -> Self {
        Self {
            members,
            payers,
            subscriptions,
            debit_locks: KeyedLocks::new(),
            subscribe_gate: Mutex::new(()),
            ids,
            rng,
        }
    }

    /// Enrolls a member with a payer
    ///
    /// Picks the deductible and copay uniformly at random from the payer's
    /// offered tiers, opens the subscription with the full unit price as its
    /// balance, and links the member record to the new plan. At most one
    /// active subscription may exist per (member, payer) pair.
    pub async fn subscribe(
        &self,
        member_id: &MemberId,
        payer_id: &PayerId,
    ) -> Result<InsuranceSubscription, LedgerError> {
        let _gate = self.subscribe_gate.lock().await;

        let member = self.members.get(member_id).await?;
        let payer = self.payers.get(payer_id).await?;

        let existing = self
            .subscriptions
            .find(|s| s.member_id == *member_id && s.payer_id == *payer_id && s.is_active())
            .await?;
        if !existing.is_empty() {
            return Err(LedgerError::AlreadySubscribed {
                member_id: member_id.clone(),
                payer_id: payer_id.clone(),
            });
        }

        let currency = payer.unit_price.currency();
        let deductible = pick_tier(self.rng.as_ref(), &payer.deductible_tiers, currency);
        let copay = pick_tier(self.rng.as_ref(), &payer.copay_tiers, currency);
        let now = Utc::now();

        let subscription = self
            .open_with_retry(&member, &payer, deductible, copay, now)
            .await?;

        self.members
            .update(member_id, |m| {
                m.link_plan(
                    subscription.subscription_id.clone(),
                    subscription.validity_date,
                );
                Ok::<_, LedgerError>(())
            })
            .await?;

        tracing::info!(
            subscription_id = %subscription.subscription_id,
            member_id = %member_id,
            payer_id = %payer_id,
            deductible = %deductible,
            copay = %copay,
            "opened subscription"
        );
        Ok(subscription)
    }

    async fn open_with_retry(
        &self,
        member: &Member,
        payer: &Payer,
        deductible: Money,
        copay: Money,
        now: DateTime<Utc>,
    ) -> Result<InsuranceSubscription, LedgerError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = InsuranceSubscription::open(
                self.ids.subscription_id(),
                member.member_id.clone(),
                payer.payer_id.clone(),
                member.name.clone(),
                payer.name.clone(),
                payer.unit_price,
                deductible,
                copay,
                payer.coverage_types.clone(),
                now,
            );
            match self.subscriptions.insert(candidate.clone()).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.is_duplicate() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::IdSpaceExhausted)
    }

    /// Settles an approved authorization against a subscription
    ///
    /// The requested amount is clamped to the subscription's remaining
    /// balance, then drawn from the payer pool, applied to the subscription,
    /// and recorded on the member, all under the per-subscription lock.
    /// Errors out before any write on an inactive or drained subscription,
    /// and on a payer pool that cannot cover the clamped amount.
    pub async fn reserve_and_debit(
        &self,
        subscription_id: &SubscriptionId,
        auth_id: &AuthId,
        amount: Money,
    ) -> Result<DebitReceipt, LedgerError> {
        let _lock = self.debit_locks.acquire(subscription_id).await;

        let subscription = self.subscriptions.get(subscription_id).await?;
        if !subscription.is_active() {
            return Err(LedgerError::SubscriptionNotActive(subscription_id.clone()));
        }
        if !subscription.remaining_balance.is_positive() {
            return Err(LedgerError::InsufficientBalance(subscription_id.clone()));
        }
        let debited = amount.clamped_to(&subscription.remaining_balance)?;

        // The only fallible write; nothing else has changed yet.
        let payer_balance_left = self
            .payers
            .update(&subscription.payer_id, |p| {
                p.record_payment(auth_id, debited).map_err(LedgerError::from)
            })
            .await?;

        // Infallible under the per-subscription lock: the preconditions were
        // checked above, and debits, cancellation, and the expiry sweep all
        // serialize on this lock, so the status cannot have changed.
        let remaining_balance = self
            .subscriptions
            .update(subscription_id, |s| s.apply_debit(auth_id.clone(), debited))
            .await?;

        self.members
            .update(&subscription.member_id, |m| {
                m.record_settlement(auth_id.clone(), debited);
                Ok::<_, LedgerError>(())
            })
            .await?;

        tracing::info!(
            subscription_id = %subscription_id,
            auth_id = %auth_id,
            requested = %amount,
            debited = %debited,
            remaining_balance = %remaining_balance,
            "settled debit"
        );
        Ok(DebitReceipt {
            debited,
            remaining_balance,
            payer_balance_left,
        })
    }

    /// Cancels an active subscription
    ///
    /// Serialized against debits on the same subscription, so a cancellation
    /// can never land in the middle of a settlement.
    pub async fn cancel(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<InsuranceSubscription, LedgerError> {
        let _lock = self.debit_locks.acquire(subscription_id).await;
        let cancelled = self
            .subscriptions
            .update(subscription_id, |s| {
                if !s.is_active() {
                    return Err(LedgerError::SubscriptionNotActive(
                        s.subscription_id.clone(),
                    ));
                }
                s.cancel();
                Ok(s.clone())
            })
            .await?;
        tracing::info!(subscription_id = %subscription_id, "cancelled subscription");
        Ok(cancelled)
    }

    /// Marks active subscriptions whose validity date has passed as expired
    ///
    /// There is no background scheduler; callers invoke the sweep. Returns
    /// how many subscriptions were expired.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let lapsed = self
            .subscriptions
            .find(|s| s.is_active() && s.has_lapsed(now))
            .await?;
        let mut expired = 0;
        for sub in lapsed {
            // The debit lock keeps the status flip from interleaving with an
            // in-flight settlement; re-check under it, a cancel may have won
            let _lock = self.debit_locks.acquire(&sub.subscription_id).await;
            let did = self
                .subscriptions
                .update(&sub.subscription_id, |s| {
                    if s.is_active() && s.has_lapsed(now) {
                        s.expire();
                        Ok::<_, LedgerError>(true)
                    } else {
                        Ok(false)
                    }
                })
                .await?;
            if did {
                tracing::info!(subscription_id = %sub.subscription_id, "expired lapsed subscription");
                expired += 1;
            }
        }
        Ok(expired)
    }

    pub async fn subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<InsuranceSubscription, LedgerError> {
        Ok(self.subscriptions.get(subscription_id).await?)
    }

    pub async fn member_subscriptions(
        &self,
        member_id: &MemberId,
    ) -> Result<Vec<InsuranceSubscription>, LedgerError> {
        Ok(self
            .subscriptions
            .find(|s| s.member_id == *member_id)
            .await?)
    }

    pub async fn payer_subscriptions(
        &self,
        payer_id: &PayerId,
    ) -> Result<Vec<InsuranceSubscription>, LedgerError> {
        Ok(self.subscriptions.find(|s| s.payer_id == *payer_id).await?)
    }

    /// Sum of remaining balances across a payer's active subscriptions
    ///
    /// This is what the payer could still be asked to fund if every open
    /// subscription drew down fully.
    pub async fn payer_exposure(&self, payer_id: &PayerId) -> Result<Money, LedgerError> {
        let payer = self.payers.get(payer_id).await?;
        let mut total = Money::zero(payer.unit_price.currency());
        for sub in self
            .subscriptions
            .find(|s| s.payer_id == *payer_id && s.is_active())
            .await?
        {
            total = total.checked_add(&sub.remaining_balance)?;
        }
        Ok(total)
    }
}

fn pick_tier(rng: &dyn Randomness, tiers: &[Money], currency: Currency) -> Money {
    choose_from(rng, tiers)
        .copied()
        .unwrap_or_else(|| Money::zero(currency))
}

impl std::fmt::Debug for LedgerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerManager").finish_non_exhaustive()
    }
}

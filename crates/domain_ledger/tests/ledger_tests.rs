//! Integration tests for enrollment and settlement

use std::sync::Arc;

use chrono::{Duration, Utc};
use core_kernel::{AuthId, Currency, IdGenerator, Money, SeededRandomness};
use domain_ledger::{LedgerError, LedgerManager, SubscriptionStatus};
use domain_party::{Member, Payer};
use infra_store::Collection;
use rust_decimal_macros::dec;

struct Fixture {
    ledger: Arc<LedgerManager>,
    members: Collection<Member>,
    payers: Collection<Payer>,
}

fn usd(amount: i64) -> Money {
    Money::from_units(amount, Currency::USD)
}

async fn fixture(payer_limit: i64, unit_price: i64) -> Fixture {
    let members: Collection<Member> = Collection::open();
    let payers: Collection<Payer> = Collection::open();
    let subscriptions = Collection::open();

    let member = Member::new(
        core_kernel::MemberId::from_number(1),
        "Asha Rao",
        "asha@example.com",
    );
    members.insert(member).await.unwrap();

    let mut payer = Payer::new(
        core_kernel::PayerId::from_number(1),
        "Acme Health",
        "claims@acme.example",
        usd(unit_price),
        usd(payer_limit),
    );
    payer.deductible_tiers = vec![usd(500), usd(1_000)];
    payer.copay_tiers = vec![usd(20), usd(40)];
    payer.coverage_types = vec!["surgical".into()];
    payers.insert(payer).await.unwrap();

    let rng = Arc::new(SeededRandomness::new(9));
    let ledger = LedgerManager::new(
        members.clone(),
        payers.clone(),
        subscriptions,
        IdGenerator::new(rng.clone()),
        rng,
    );
    Fixture {
        ledger: Arc::new(ledger),
        members,
        payers,
    }
}

fn member_id() -> core_kernel::MemberId {
    core_kernel::MemberId::from_number(1)
}

fn payer_id() -> core_kernel::PayerId {
    core_kernel::PayerId::from_number(1)
}

#[tokio::test]
async fn subscribe_opens_full_balance_for_one_year() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();

    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.remaining_balance, usd(5_000));
    assert!(sub.amount_reimbursed.is_zero());
    assert!(sub.accounts_balance());
    let days = (sub.validity_date - sub.subscription_date).num_days();
    assert_eq!(days, 365);

    // Tier selection comes from the payer's offered lists
    let payer = fx.payers.get(&payer_id()).await.unwrap();
    assert!(payer.deductible_tiers.contains(&sub.deductible));
    assert!(payer.copay_tiers.contains(&sub.copay));

    // Member record now points at the plan
    let member = fx.members.get(&member_id()).await.unwrap();
    assert_eq!(member.current_plan, Some(sub.subscription_id));
}

#[tokio::test]
async fn second_active_subscription_is_rejected() {
    let fx = fixture(100_000, 5_000).await;
    fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
    let err = fx
        .ledger
        .subscribe(&member_id(), &payer_id())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadySubscribed { .. }));
}

#[tokio::test]
async fn resubscribe_after_cancellation_is_allowed() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
    let cancelled = fx.ledger.cancel(&sub.subscription_id).await.unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert!(fx.ledger.subscribe(&member_id(), &payer_id()).await.is_ok());
}

#[tokio::test]
async fn cancel_is_not_repeatable() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
    fx.ledger.cancel(&sub.subscription_id).await.unwrap();
    let err = fx.ledger.cancel(&sub.subscription_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::SubscriptionNotActive(_)));
}

#[tokio::test]
async fn debit_is_clamped_to_remaining_balance() {
    // Remaining 3000, requested 3500: exactly 3000 settles and the
    // subscription ends at zero.
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();

    fx.ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(1), usd(2_000))
        .await
        .unwrap();

    let receipt = fx
        .ledger
        .reserve_and_debit(
            &sub.subscription_id,
            &AuthId::from_number(2),
            Money::new(dec!(3500), Currency::USD),
        )
        .await
        .unwrap();

    assert_eq!(receipt.debited, usd(3_000));
    assert!(receipt.remaining_balance.is_zero());

    let after = fx.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert_eq!(after.amount_reimbursed, usd(5_000));
    assert!(after.accounts_balance());

    // Payer paid out what actually settled, not what was requested
    let payer = fx.payers.get(&payer_id()).await.unwrap();
    assert_eq!(payer.total_amount_paid, usd(5_000));
    assert!(payer.accounts_balance());
}

#[tokio::test]
async fn debit_on_drained_subscription_fails() {
    let fx = fixture(100_000, 1_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
    fx.ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(1), usd(1_000))
        .await
        .unwrap();

    let err = fx
        .ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(2), usd(1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance(_)));
}

#[tokio::test]
async fn payer_pool_failure_leaves_everything_unchanged() {
    // Pool smaller than the unit price: the clamped debit exceeds it.
    let fx = fixture(1_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();

    let err = fx
        .ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(1), usd(2_000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PayerLimitExceeded { .. }));

    let after = fx.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert_eq!(after.remaining_balance, usd(5_000));
    assert!(after.claims_history.is_empty());
    let member = fx.members.get(&member_id()).await.unwrap();
    assert!(member.amount_reimbursed.is_zero());
}

#[tokio::test]
async fn concurrent_debits_never_overdraw() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10u64 {
        let ledger = Arc::clone(&fx.ledger);
        let sub_id = sub.subscription_id.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .reserve_and_debit(&sub_id, &AuthId::from_number(i), usd(1_000))
                .await
        }));
    }
    let mut settled = Money::zero(Currency::USD);
    for h in handles {
        if let Ok(receipt) = h.await.unwrap() {
            settled = settled.checked_add(&receipt.debited).unwrap();
        }
    }
    // Ten requests of 1000 against a 5000 balance settle exactly 5000 total
    assert_eq!(settled, usd(5_000));

    let after = fx.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert!(after.remaining_balance.is_zero());
    assert!(after.accounts_balance());
    let payer = fx.payers.get(&payer_id()).await.unwrap();
    assert!(payer.accounts_balance());
}

#[tokio::test]
async fn expire_lapsed_sweeps_only_past_validity() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();

    // Nothing lapses today
    assert_eq!(fx.ledger.expire_lapsed(Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + Duration::days(400);
    assert_eq!(fx.ledger.expire_lapsed(later).await.unwrap(), 1);
    let after = fx.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert_eq!(after.status, SubscriptionStatus::Expired);

    // Expired subscriptions refuse debits
    let err = fx
        .ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(1), usd(100))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SubscriptionNotActive(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expiry_sweep_never_splits_a_debit() {
    // A debit racing the sweep either settles everywhere or nowhere: the
    // payer pool must never record a draw the subscription did not.
    for _ in 0..100 {
        let fx = fixture(100_000, 5_000).await;
        let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
        let lapsed_at = Utc::now() + Duration::days(400);

        let debit = {
            let ledger = Arc::clone(&fx.ledger);
            let sub_id = sub.subscription_id.clone();
            tokio::spawn(async move {
                ledger
                    .reserve_and_debit(&sub_id, &AuthId::from_number(1), usd(500))
                    .await
            })
        };
        let sweep = {
            let ledger = Arc::clone(&fx.ledger);
            tokio::spawn(async move { ledger.expire_lapsed(lapsed_at).await })
        };

        let (debit, sweep) = tokio::join!(debit, sweep);
        if let Err(e) = debit.unwrap() {
            assert!(matches!(e, LedgerError::SubscriptionNotActive(_)));
        }
        sweep.unwrap().unwrap();

        let after = fx.ledger.subscription(&sub.subscription_id).await.unwrap();
        let payer = fx.payers.get(&payer_id()).await.unwrap();
        assert_eq!(
            payer.total_amount_paid, after.amount_reimbursed,
            "payer paid {} but subscription settled {}",
            payer.total_amount_paid, after.amount_reimbursed
        );
        assert!(after.accounts_balance());
        assert!(payer.accounts_balance());
    }
}

mod properties {
    use super::usd;
    use chrono::Utc;
    use core_kernel::{AuthId, Currency, MemberId, Money, PayerId, SubscriptionId};
    use domain_ledger::InsuranceSubscription;
    use proptest::prelude::*;

    fn open_sub(unit_price: i64) -> InsuranceSubscription {
        InsuranceSubscription::open(
            SubscriptionId::from_number(1),
            MemberId::from_number(1),
            PayerId::from_number(1),
            "Asha Rao".into(),
            "Acme Health".into(),
            usd(unit_price),
            usd(500),
            usd(20),
            vec![],
            Utc::now(),
        )
    }

    proptest! {
        // Any sequence of clamped debits keeps the two sides of the account
        // summing to the unit price and the balance non-negative.
        #[test]
        fn clamped_debits_preserve_accounting(
            amounts in proptest::collection::vec(1i64..4_000, 1..20),
        ) {
            let mut sub = open_sub(5_000);
            let mut settled = Money::zero(Currency::USD);
            for (i, amt) in amounts.iter().enumerate() {
                if !sub.remaining_balance.is_positive() {
                    break;
                }
                let clamped = usd(*amt).clamped_to(&sub.remaining_balance).unwrap();
                sub.apply_debit(AuthId::from_number(i as u64), clamped).unwrap();
                settled = settled.checked_add(&clamped).unwrap();
                prop_assert!(sub.accounts_balance());
                prop_assert!(!sub.remaining_balance.is_negative());
            }
            prop_assert_eq!(sub.amount_reimbursed, settled);
        }
    }
}

#[tokio::test]
async fn payer_exposure_tracks_open_balances() {
    let fx = fixture(100_000, 5_000).await;
    let sub = fx.ledger.subscribe(&member_id(), &payer_id()).await.unwrap();
    assert_eq!(fx.ledger.payer_exposure(&payer_id()).await.unwrap(), usd(5_000));

    fx.ledger
        .reserve_and_debit(&sub.subscription_id, &AuthId::from_number(1), usd(2_000))
        .await
        .unwrap();
    assert_eq!(fx.ledger.payer_exposure(&payer_id()).await.unwrap(), usd(3_000));
}

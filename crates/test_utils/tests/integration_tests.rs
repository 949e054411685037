//! End-to-end scenarios across the ledger and the adjudication engine

use core_kernel::AuthId;
use decision_assist::{ChatContext, DispositionStatus, ScriptedAssist, CHAT_FALLBACK};
use domain_authorization::{Actor, AuthStatus, Decision, RequestSource, Urgency};
use domain_ledger::LedgerError;
use test_utils::{
    assert_payer_accounts, assert_subscription_accounts, AuthIntakeBuilder, Harness,
    MoneyFixtures, PendingIntakeBuilder,
};

#[tokio::test]
async fn direct_request_approved_and_settled() {
    let h = Harness::approving(1);
    let (member, provider, payer) = h.standard_parties().await;
    let sub = h
        .ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();

    let request = h
        .engine
        .submit_direct(
            AuthIntakeBuilder::new(
                member.member_id.clone(),
                provider.provider_id.clone(),
                payer.payer_id.clone(),
                sub.subscription_id.clone(),
            )
            .amount(MoneyFixtures::usd(1_200))
            .build(),
        )
        .await
        .unwrap();
    assert_eq!(request.status, AuthStatus::AutoReviewed);

    let decided = h
        .engine
        .decide(
            &request.auth_id,
            &Actor::Payer(payer.payer_id.clone()),
            Decision::Approve,
            Some("meets criteria".into()),
        )
        .await
        .unwrap();
    assert_eq!(decided.status, AuthStatus::Approved);

    // Every account closed the loop
    let sub_after = h.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert_eq!(sub_after.amount_reimbursed, MoneyFixtures::usd(1_200));
    assert_subscription_accounts(&sub_after);

    let payer_after = h.payers.get(&payer.payer_id).await.unwrap();
    assert_eq!(payer_after.total_amount_paid, MoneyFixtures::usd(1_200));
    assert_payer_accounts(&payer_after);

    let member_after = h.members.get(&member.member_id).await.unwrap();
    assert_eq!(member_after.amount_reimbursed, MoneyFixtures::usd(1_200));
    assert!(member_after.claim_history.contains(&request.auth_id));

    let stats = h.engine.review_stats(None).await.unwrap();
    assert_eq!(stats.approved, 1);
    assert!((stats.approval_rate - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn member_pending_flow_reaches_settlement() {
    let h = Harness::approving(2);
    let (member, provider, payer) = h.standard_parties().await;
    h.ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();

    let pending = h
        .engine
        .submit_pending(
            PendingIntakeBuilder::new(
                member.member_id.clone(),
                provider.provider_id.clone(),
                payer.payer_id.clone(),
            )
            .member_notes("worsening symptoms")
            .build(),
        )
        .await
        .unwrap();

    let worklist = h
        .engine
        .pending_for_provider(&provider.provider_id)
        .await
        .unwrap();
    assert_eq!(worklist.len(), 1);

    let auth = h
        .engine
        .provider_approve_pending(
            &pending.request_id,
            &provider.provider_id,
            Some("exam confirms need".into()),
            MoneyFixtures::usd(2_500),
        )
        .await
        .unwrap();
    assert_eq!(auth.source, RequestSource::ProviderApproved);
    assert_eq!(auth.status, AuthStatus::AutoReviewed);

    let decided = h
        .engine
        .decide(
            &auth.auth_id,
            &Actor::Payer(payer.payer_id.clone()),
            Decision::Approve,
            None,
        )
        .await
        .unwrap();
    assert_eq!(decided.status, AuthStatus::Approved);

    let member_after = h.members.get(&member.member_id).await.unwrap();
    assert_eq!(member_after.amount_reimbursed, MoneyFixtures::usd(2_500));
}

#[tokio::test]
async fn emergency_request_requires_human_approval() {
    let h = Harness::approving(3);
    let (member, provider, payer) = h.standard_parties().await;
    let sub = h
        .ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();

    let request = h
        .engine
        .submit_direct(
            AuthIntakeBuilder::new(
                member.member_id.clone(),
                provider.provider_id.clone(),
                payer.payer_id.clone(),
                sub.subscription_id.clone(),
            )
            .urgency(Urgency::Emergency)
            .build(),
        )
        .await
        .unwrap();

    // The advisory service said approve; the override still routes to a human
    assert_eq!(request.status, AuthStatus::PendingManualReview);
    assert_eq!(request.ai_decision, Some(DispositionStatus::Approved));

    // And a human can still approve it
    let decided = h
        .engine
        .decide(
            &request.auth_id,
            &Actor::Admin("oncall-reviewer".into()),
            Decision::Approve,
            Some("emergency confirmed by phone".into()),
        )
        .await
        .unwrap();
    assert_eq!(decided.status, AuthStatus::Approved);
}

#[tokio::test]
async fn degraded_assist_never_blocks_the_flow() {
    // Empty scripted queue: every review errors, every text op fails
    let h = Harness::new(4);
    h.scripted.fail_text_operations();
    let (member, provider, payer) = h.standard_parties().await;
    let sub = h
        .ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();

    let request = h
        .engine
        .submit_direct(
            AuthIntakeBuilder::new(
                member.member_id.clone(),
                provider.provider_id.clone(),
                payer.payer_id.clone(),
                sub.subscription_id.clone(),
            )
            .build(),
        )
        .await
        .unwrap();
    assert_eq!(request.status, AuthStatus::PendingManualReview);
    assert!(!request.ai_processed);

    // Text conveniences degrade instead of erroring
    let assist = h.engine.assist();
    assert_eq!(assist.format_text("raw note").await, "raw note");
    assert_eq!(assist.autocomplete("card").await, "");
    assert_eq!(
        assist.chat("is this covered?", &ChatContext::default()).await,
        CHAT_FALLBACK
    );

    // The request still reaches a decision
    let decided = h
        .engine
        .decide(
            &request.auth_id,
            &Actor::Payer(payer.payer_id.clone()),
            Decision::Reject,
            Some("insufficient documentation".into()),
        )
        .await
        .unwrap();
    assert_eq!(decided.status, AuthStatus::Rejected);
    let payer_after = h.payers.get(&payer.payer_id).await.unwrap();
    assert!(payer_after.pending_cases.is_empty());
    assert_payer_accounts(&payer_after);
}

#[tokio::test]
async fn oversized_approval_settles_only_the_remaining_balance() {
    let h = Harness::approving(5);
    let (member, provider, payer) = h.standard_parties().await;
    let sub = h
        .ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();

    // Draw the balance down to 3000
    h.ledger
        .reserve_and_debit(
            &sub.subscription_id,
            &AuthId::from_number(900),
            MoneyFixtures::usd(2_000),
        )
        .await
        .unwrap();

    // Request 3500 against the remaining 3000
    let request = h
        .engine
        .submit_direct(
            AuthIntakeBuilder::new(
                member.member_id.clone(),
                provider.provider_id.clone(),
                payer.payer_id.clone(),
                sub.subscription_id.clone(),
            )
            .amount(MoneyFixtures::usd(3_500))
            .build(),
        )
        .await
        .unwrap();
    h.engine
        .decide(
            &request.auth_id,
            &Actor::Payer(payer.payer_id.clone()),
            Decision::Approve,
            None,
        )
        .await
        .unwrap();

    let sub_after = h.ledger.subscription(&sub.subscription_id).await.unwrap();
    assert!(sub_after.remaining_balance.is_zero());
    assert_eq!(sub_after.amount_reimbursed, MoneyFixtures::usd(5_000));
    assert_subscription_accounts(&sub_after);

    // The payer funded 5000 total, not 5500
    let payer_after = h.payers.get(&payer.payer_id).await.unwrap();
    assert_eq!(payer_after.total_amount_paid, MoneyFixtures::usd(5_000));
    assert_payer_accounts(&payer_after);
}

#[tokio::test]
async fn duplicate_enrollment_is_rejected_end_to_end() {
    let h = Harness::approving(6);
    let (member, _provider, payer) = h.standard_parties().await;
    h.ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap();
    let err = h
        .ledger
        .subscribe(&member.member_id, &payer.payer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadySubscribed { .. }));
}

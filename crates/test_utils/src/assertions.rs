//! Invariant assertions for domain types

use domain_ledger::InsuranceSubscription;
use domain_party::Payer;

/// Asserts the subscription accounting invariant:
/// `remaining_balance + amount_reimbursed == unit_price`, balance >= 0
pub fn assert_subscription_accounts(subscription: &InsuranceSubscription) {
    assert!(
        subscription.accounts_balance(),
        "subscription {} accounts out of balance: unit_price={} reimbursed={} remaining={}",
        subscription.subscription_id,
        subscription.unit_price,
        subscription.amount_reimbursed,
        subscription.remaining_balance,
    );
}

/// Asserts the payer pool invariant:
/// `balance_left + total_amount_paid == limit`
pub fn assert_payer_accounts(payer: &Payer) {
    assert!(
        payer.accounts_balance(),
        "payer {} pool out of balance: limit={} paid={} left={}",
        payer.payer_id,
        payer.limit,
        payer.total_amount_paid,
        payer.balance_left,
    );
}

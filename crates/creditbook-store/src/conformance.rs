//! Behaviour every `Store` backend must share.

use creditbook_core::{Plan, TransactionType, UserId};

use crate::error::StoreError;
use crate::write::LedgerWrite;
use crate::Store;

fn open(store: &dyn Store, credits: i64) -> UserId {
    let user_id = UserId::generate();
    store
        .create_account(&LedgerWrite::credit(
            user_id,
            TransactionType::MonthlyAllocation,
            credits,
            "Signup allocation",
        ))
        .unwrap();
    user_id
}

pub fn run_all(store: &dyn Store) {
    create_account_records_opening_transaction(store);
    create_account_twice_fails(store);
    apply_to_missing_account_fails(store);
    apply_keeps_balance_and_log_in_step(store);
    insufficient_debit_changes_nothing(store);
    reference_is_applied_once(store);
    reference_reused_by_other_write_conflicts(store);
    replay_with_other_amount_conflicts(store);
    checks_run_account_then_reference_then_floor(store);
    references_are_scoped_per_user(store);
    plan_switches_with_write(store);
    list_is_newest_first_and_paginates(store);
}

fn create_account_records_opening_transaction(store: &dyn Store) {
    let user_id = open(store, 100);

    let account = store.get_account(&user_id).unwrap().unwrap();
    assert_eq!(account.credits, 100);
    assert_eq!(account.plan, Plan::Free);

    let history = store.list_transactions_by_user(&user_id, 10, 0).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_type, TransactionType::MonthlyAllocation);
    assert_eq!(history[0].amount, 100);
    assert_eq!(
        store.get_transaction(&history[0].id).unwrap().unwrap(),
        history[0]
    );
}

fn create_account_twice_fails(store: &dyn Store) {
    let user_id = open(store, 100);
    let again = store.create_account(&LedgerWrite::credit(
        user_id,
        TransactionType::MonthlyAllocation,
        100,
        "Signup allocation",
    ));

    assert!(matches!(again, Err(StoreError::AlreadyExists { .. })));
    assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 100);
}

fn apply_to_missing_account_fails(store: &dyn Store) {
    let write = LedgerWrite::credit(UserId::generate(), TransactionType::Bonus, 5, "bonus");
    assert!(matches!(
        store.apply(&write),
        Err(StoreError::NotFound { entity: "account", .. })
    ));
}

fn apply_keeps_balance_and_log_in_step(store: &dyn Store) {
    let user_id = open(store, 100);

    store
        .apply(&LedgerWrite::credit(user_id, TransactionType::Purchase, 500, "medium"))
        .unwrap();
    let applied = store
        .apply(&LedgerWrite::debit(user_id, TransactionType::Used, 5, "image"))
        .unwrap();

    assert_eq!(applied.account.credits, 595);
    assert_eq!(applied.transaction.balance_after, 595);

    let history = store.list_transactions_by_user(&user_id, 100, 0).unwrap();
    let sum: i64 = history.iter().map(|tx| tx.amount).sum();
    assert_eq!(sum, applied.account.credits);
    assert_eq!(history.len(), 3);
}

fn insufficient_debit_changes_nothing(store: &dyn Store) {
    let user_id = open(store, 10);

    let result = store.apply(&LedgerWrite::debit(user_id, TransactionType::Spent, 50, "test"));

    assert!(matches!(
        result,
        Err(StoreError::InsufficientCredits {
            balance: 10,
            required: 50
        })
    ));
    assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 10);
    assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 1);
}

fn reference_is_applied_once(store: &dyn Store) {
    let user_id = open(store, 0);
    let write = LedgerWrite::credit(user_id, TransactionType::Purchase, 100, "small")
        .with_reference(Some("pay_123".into()));

    let first = store.apply(&write).unwrap();
    let second = store.apply(&write).unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(second.transaction.id, first.transaction.id);
    assert_eq!(second.account.credits, 100);
    assert_eq!(
        store
            .find_by_reference(&user_id, "pay_123")
            .unwrap()
            .unwrap()
            .id,
        first.transaction.id
    );
    assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 2);
}

fn reference_reused_by_other_write_conflicts(store: &dyn Store) {
    let user_id = open(store, 100);
    store
        .apply(
            &LedgerWrite::debit(user_id, TransactionType::Spent, 30, "render")
                .with_reference(Some("job_1".into())),
        )
        .unwrap();

    let refund = store.apply(
        &LedgerWrite::credit(user_id, TransactionType::Refund, 30, "render failed")
            .with_reference(Some("job_1".into())),
    );

    assert!(matches!(
        refund,
        Err(StoreError::ReferenceConflict { reference_id, .. }) if reference_id == "job_1"
    ));
    assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 70);
    assert_eq!(store.list_transactions_by_user(&user_id, 10, 0).unwrap().len(), 2);
}

fn replay_with_other_amount_conflicts(store: &dyn Store) {
    let user_id = open(store, 0);
    store
        .apply(
            &LedgerWrite::credit(user_id, TransactionType::Purchase, 100, "small")
                .with_reference(Some("pay_9".into())),
        )
        .unwrap();

    let larger = store.apply(
        &LedgerWrite::credit(user_id, TransactionType::Purchase, 500, "medium")
            .with_reference(Some("pay_9".into())),
    );

    assert!(matches!(larger, Err(StoreError::ReferenceConflict { .. })));
    assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 100);
}

fn checks_run_account_then_reference_then_floor(store: &dyn Store) {
    // A missing account wins over any reference.
    let missing = LedgerWrite::credit(UserId::generate(), TransactionType::Bonus, 5, "bonus")
        .with_reference(Some("signup".into()));
    assert!(matches!(
        store.apply(&missing),
        Err(StoreError::NotFound { entity: "account", .. })
    ));

    let user_id = open(store, 100);
    let deduct = LedgerWrite::debit(user_id, TransactionType::Spent, 80, "render")
        .with_reference(Some("job_2".into()));
    store.apply(&deduct).unwrap();

    // The balance (20) no longer covers 80, but the reference is checked first.
    let replay = store.apply(&deduct).unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.account.credits, 20);

    let conflicting = LedgerWrite::debit(user_id, TransactionType::Spent, 500, "render")
        .with_reference(Some("job_2".into()));
    assert!(matches!(
        store.apply(&conflicting),
        Err(StoreError::ReferenceConflict { .. })
    ));
}

fn references_are_scoped_per_user(store: &dyn Store) {
    let a = open(store, 0);
    let b = open(store, 0);

    for user_id in [a, b] {
        let applied = store
            .apply(
                &LedgerWrite::credit(user_id, TransactionType::Purchase, 100, "small")
                    .with_reference(Some("shared".into())),
            )
            .unwrap();
        assert!(!applied.replayed);
    }
    assert!(store.find_by_reference(&a, "missing").unwrap().is_none());
}

fn plan_switches_with_write(store: &dyn Store) {
    let user_id = open(store, 1100);
    let applied = store
        .apply(
            &LedgerWrite::credit(
                user_id,
                TransactionType::SubscriptionUpgrade,
                2000,
                "Upgrade to business",
            )
            .with_plan(Plan::Business),
        )
        .unwrap();

    assert_eq!(applied.account.credits, 3100);
    let account = store.get_account(&user_id).unwrap().unwrap();
    assert_eq!(account.plan, Plan::Business);
    assert_eq!(account.credits, 3100);
}

fn list_is_newest_first_and_paginates(store: &dyn Store) {
    let user_id = open(store, 0);
    for n in 1..=3 {
        // Distinct ULID timestamps.
        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .apply(&LedgerWrite::credit(
                user_id,
                TransactionType::Bonus,
                n,
                format!("bonus {n}"),
            ))
            .unwrap();
    }

    let all = store.list_transactions_by_user(&user_id, 10, 0).unwrap();
    assert_eq!(all[0].description, "bonus 3");
    assert_eq!(all[3].description, "Signup allocation");

    let page = store.list_transactions_by_user(&user_id, 1, 1).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].description, "bonus 2");
}

/// Scenario: +100 and -50 racing on a balance of 200 always end at 250.
pub fn concurrent_writes_do_not_lose_updates<S: Store>(store: &S) {
    let user_id = open(store, 200);

    std::thread::scope(|scope| {
        let credit = scope.spawn(|| {
            store
                .apply(&LedgerWrite::credit(user_id, TransactionType::Purchase, 100, "purchase"))
                .unwrap();
        });
        let debit = scope.spawn(|| {
            store
                .apply(&LedgerWrite::debit(user_id, TransactionType::Used, 50, "video"))
                .unwrap();
        });
        credit.join().unwrap();
        debit.join().unwrap();
    });
    assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 250);

    // Many small writers on one balance.
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..25 {
                    store
                        .apply(&LedgerWrite::credit(user_id, TransactionType::Bonus, 2, "tick"))
                        .unwrap();
                    store
                        .apply(&LedgerWrite::debit(user_id, TransactionType::Used, 1, "tock"))
                        .unwrap();
                }
            });
        }
    });

    let account = store.get_account(&user_id).unwrap().unwrap();
    assert_eq!(account.credits, 250 + 8 * 25);
    let history = store.list_transactions_by_user(&user_id, usize::MAX, 0).unwrap();
    assert_eq!(history.iter().map(|tx| tx.amount).sum::<i64>(), account.credits);
}

//! End-to-end properties of the fee account ledger: derived totals always
//! match the payment log, replays are absorbed, and concurrent recording
//! loses no updates.

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use shulepay_backend::ledger::{FeeStatus, FeeStructure, LedgerStore, PaymentMethod};
use shulepay_backend::services::{PaymentRecorder, PushRegistry};

fn engine() -> (Arc<LedgerStore>, PaymentRecorder) {
    let ledger = Arc::new(LedgerStore::new());
    let recorder = PaymentRecorder::new(ledger.clone(), Arc::new(PushRegistry::new()));
    (ledger, recorder)
}

#[test]
fn partial_then_full_payment_walks_unpaid_partial_paid() {
    let (ledger, recorder) = engine();
    ledger.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
    assert_eq!(ledger.account("STU-1").status, FeeStatus::Unpaid);

    recorder
        .record_payment("STU-1", dec!(4000), PaymentMethod::Cash, "A1", "bursar")
        .expect("first payment should record");
    let account = ledger.account("STU-1");
    assert_eq!(account.total_paid, dec!(4000));
    assert_eq!(account.balance, dec!(6000));
    assert_eq!(account.status, FeeStatus::Partial);

    recorder
        .record_payment("STU-1", dec!(6000), PaymentMethod::BankTransfer, "A2", "bursar")
        .expect("second payment should record");
    let account = ledger.account("STU-1");
    assert_eq!(account.total_paid, dec!(10000));
    assert_eq!(account.balance, dec!(0));
    assert_eq!(account.status, FeeStatus::Paid);
}

#[test]
fn replaying_a_settled_reference_changes_nothing() {
    let (ledger, recorder) = engine();
    ledger.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
    recorder
        .record_payment("STU-1", dec!(4000), PaymentMethod::Cash, "A1", "bursar")
        .expect("should record");
    recorder
        .record_payment("STU-1", dec!(6000), PaymentMethod::Cash, "A2", "bursar")
        .expect("should record");

    let replay = recorder
        .record_payment("STU-1", dec!(6000), PaymentMethod::Cash, "A2", "bursar")
        .expect("replay should be absorbed");
    assert!(replay.duplicate);

    let account = ledger.account("STU-1");
    assert_eq!(account.total_paid, dec!(10000));
    assert_eq!(account.status, FeeStatus::Paid);
    assert_eq!(ledger.payment_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_payments_for_one_student_lose_no_updates() {
    let (ledger, recorder) = engine();
    let recorder = Arc::new(recorder);
    ledger.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(100000)));

    let n: u32 = 50;
    let tasks: Vec<_> = (0..n)
        .map(|i| {
            let recorder = recorder.clone();
            tokio::task::spawn_blocking(move || {
                recorder.record_payment(
                    "STU-1",
                    Decimal::from(i + 1),
                    PaymentMethod::MobileMoney,
                    &format!("REF-{}", i),
                    "load-test",
                )
            })
        })
        .collect();
    for result in join_all(tasks).await {
        result
            .expect("task should not panic")
            .expect("payment should record");
    }

    let expected: Decimal = (1..=n).map(Decimal::from).sum();
    let account = ledger.account("STU-1");
    assert_eq!(account.total_paid, expected);
    assert_eq!(ledger.payment_count(), n as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_replays_of_one_reference_insert_once() {
    let (ledger, recorder) = engine();
    let recorder = Arc::new(recorder);

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let recorder = recorder.clone();
            tokio::task::spawn_blocking(move || {
                recorder.record_payment(
                    "STU-1",
                    dec!(250),
                    PaymentMethod::MobileMoney,
                    "SAME-REF",
                    "load-test",
                )
            })
        })
        .collect();
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic").expect("should not error"))
        .collect();

    let inserts = outcomes.iter().filter(|o| !o.duplicate).count();
    assert_eq!(inserts, 1);
    assert_eq!(ledger.payment_count(), 1);
    assert_eq!(ledger.account("STU-1").total_paid, dec!(250));
}

#[test]
fn summary_rolls_up_expected_collected_outstanding_and_pending() {
    let (ledger, recorder) = engine();
    ledger.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
    ledger.assign_fee("STU-2", &FeeStructure::new("CS101", dec!(5000)));
    recorder
        .record_payment("STU-1", dec!(10000), PaymentMethod::Cash, "S1", "bursar")
        .expect("should record");

    let summary = ledger.summary();
    assert_eq!(summary.total_expected, dec!(15000));
    assert_eq!(summary.total_collected, dec!(10000));
    assert_eq!(summary.total_outstanding, dec!(5000));
    assert_eq!(summary.pending_accounts, 1);
}

//! In-process ledger storage.
//!
//! Payments form an append-only log indexed by transaction reference; the
//! per-student account rows are a derived aggregate recomputed on every
//! insert. One lock guards the whole state, so a payment insert and the
//! recompute that follows are a single atomic step and concurrent inserts
//! for the same student cannot read stale totals. The lock is never held
//! across an await.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

use crate::ledger::types::{FeeStatus, FeeStructure, Payment, StudentFeeAccount};

/// Result of an insert attempt keyed by transaction reference.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// New payment appended, account recomputed.
    Inserted(Payment),
    /// A payment with the same reference already exists; nothing changed.
    Duplicate(Payment),
}

impl InsertOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            InsertOutcome::Inserted(p) | InsertOutcome::Duplicate(p) => p,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, InsertOutcome::Duplicate(_))
    }
}

#[derive(Default)]
struct LedgerState {
    payments: Vec<Payment>,
    payments_by_ref: HashMap<String, usize>,
    // student -> course -> current charge. A newer FeeStructure for the
    // same course replaces the older one's contribution to total_due.
    charges: HashMap<String, HashMap<String, Decimal>>,
    accounts: HashMap<String, StudentFeeAccount>,
}

pub struct LedgerStore {
    state: RwLock<LedgerState>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Applies a fee structure to a student's account, superseding any
    /// earlier structure for the same course, and recomputes the row.
    pub fn assign_fee(&self, student_id: &str, fee: &FeeStructure) {
        let mut state = self.state.write().expect("ledger state lock poisoned");
        state
            .charges
            .entry(student_id.to_string())
            .or_default()
            .insert(fee.course.clone(), fee.amount);
        Self::recompute_locked(&mut state, student_id);
        info!(
            student_id = %student_id,
            course = %fee.course,
            amount = %fee.amount,
            "fee structure assigned"
        );
    }

    /// Idempotent append. Returns the existing payment unchanged when the
    /// transaction reference has been seen before; otherwise appends and
    /// recomputes the student's account before returning.
    pub fn insert_payment(&self, payment: Payment) -> InsertOutcome {
        let mut state = self.state.write().expect("ledger state lock poisoned");
        if let Some(&idx) = state.payments_by_ref.get(&payment.transaction_ref) {
            let existing = state.payments[idx].clone();
            debug!(
                transaction_ref = %payment.transaction_ref,
                student_id = %existing.student_id,
                "duplicate transaction reference, returning existing payment"
            );
            return InsertOutcome::Duplicate(existing);
        }

        let student_id = payment.student_id.clone();
        let idx = state.payments.len();
        state
            .payments_by_ref
            .insert(payment.transaction_ref.clone(), idx);
        state.payments.push(payment.clone());
        Self::recompute_locked(&mut state, &student_id);
        InsertOutcome::Inserted(payment)
    }

    /// Current derived state; a zero-valued account for unknown students.
    pub fn account(&self, student_id: &str) -> StudentFeeAccount {
        let state = self.state.read().expect("ledger state lock poisoned");
        state
            .accounts
            .get(student_id)
            .cloned()
            .unwrap_or_else(|| StudentFeeAccount::empty(student_id))
    }

    pub fn accounts(&self) -> Vec<StudentFeeAccount> {
        let state = self.state.read().expect("ledger state lock poisoned");
        let mut rows: Vec<_> = state.accounts.values().cloned().collect();
        rows.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        rows
    }

    /// Audit view of the append-only log for one student.
    pub fn payments_for(&self, student_id: &str) -> Vec<Payment> {
        let state = self.state.read().expect("ledger state lock poisoned");
        state
            .payments
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect()
    }

    pub fn payment_count(&self) -> usize {
        let state = self.state.read().expect("ledger state lock poisoned");
        state.payments.len()
    }

    // Sole writer of total_paid/balance/status. total_paid is always the
    // sum over the payment log, never an increment, so the derived row
    // cannot drift from the log.
    fn recompute_locked(state: &mut LedgerState, student_id: &str) {
        let total_due: Decimal = state
            .charges
            .get(student_id)
            .map(|courses| courses.values().copied().sum())
            .unwrap_or(Decimal::ZERO);
        let total_paid: Decimal = state
            .payments
            .iter()
            .filter(|p| p.student_id == student_id)
            .map(|p| p.amount)
            .sum();
        let balance = (total_due - total_paid).max(Decimal::ZERO);
        let status = FeeStatus::derive(total_paid, total_due);

        state.accounts.insert(
            student_id.to_string(),
            StudentFeeAccount {
                student_id: student_id.to_string(),
                total_due,
                total_paid,
                balance,
                status,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::PaymentMethod;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn payment(student: &str, amount: Decimal, reference: &str) -> Payment {
        Payment {
            student_id: student.to_string(),
            amount,
            method: PaymentMethod::Cash,
            transaction_ref: reference.to_string(),
            recorded_by: "bursar".to_string(),
            payment_date: Utc::now(),
        }
    }

    #[test]
    fn partial_payment_leaves_partial_status() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
        store.insert_payment(payment("STU-1", dec!(4000), "A1"));

        let account = store.account("STU-1");
        assert_eq!(account.total_paid, dec!(4000));
        assert_eq!(account.balance, dec!(6000));
        assert_eq!(account.status, FeeStatus::Partial);
    }

    #[test]
    fn full_payment_settles_the_account() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
        store.insert_payment(payment("STU-1", dec!(4000), "A1"));
        store.insert_payment(payment("STU-1", dec!(6000), "A2"));

        let account = store.account("STU-1");
        assert_eq!(account.total_paid, dec!(10000));
        assert_eq!(account.balance, dec!(0));
        assert_eq!(account.status, FeeStatus::Paid);
    }

    #[test]
    fn duplicate_reference_is_a_no_op() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
        store.insert_payment(payment("STU-1", dec!(4000), "A1"));

        // Replay with the same reference and a different amount.
        let outcome = store.insert_payment(payment("STU-1", dec!(9999), "A1"));
        assert!(outcome.is_duplicate());
        assert_eq!(outcome.payment().amount, dec!(4000));
        assert_eq!(store.payment_count(), 1);
        assert_eq!(store.account("STU-1").total_paid, dec!(4000));
    }

    #[test]
    fn unknown_student_reads_as_zero_valued_account() {
        let store = LedgerStore::new();
        let account = store.account("STU-404");
        assert_eq!(account.total_due, dec!(0));
        assert_eq!(account.total_paid, dec!(0));
    }

    #[test]
    fn payment_before_fee_assignment_creates_the_account() {
        let store = LedgerStore::new();
        store.insert_payment(payment("STU-2", dec!(500), "B1"));
        let account = store.account("STU-2");
        assert_eq!(account.total_paid, dec!(500));
        assert_eq!(account.status, FeeStatus::Paid);

        store.assign_fee("STU-2", &FeeStructure::new("CS101", dec!(2000)));
        let account = store.account("STU-2");
        assert_eq!(account.balance, dec!(1500));
        assert_eq!(account.status, FeeStatus::Partial);
    }

    #[test]
    fn newer_fee_structure_supersedes_the_old_one() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(12000)));
        assert_eq!(store.account("STU-1").total_due, dec!(12000));

        store.assign_fee("STU-1", &FeeStructure::new("MA200", dec!(3000)));
        assert_eq!(store.account("STU-1").total_due, dec!(15000));
    }

    #[test]
    fn overpayment_floors_balance_at_zero() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(5000)));
        store.insert_payment(payment("STU-1", dec!(7000), "C1"));

        let account = store.account("STU-1");
        assert_eq!(account.balance, dec!(0));
        assert_eq!(account.total_paid, dec!(7000));
        assert_eq!(account.status, FeeStatus::Paid);
    }

    #[test]
    fn total_paid_always_matches_the_payment_log() {
        let store = LedgerStore::new();
        store.assign_fee("STU-1", &FeeStructure::new("CS101", dec!(10000)));
        for (i, amount) in [dec!(100), dec!(250.50), dec!(1000)].iter().enumerate() {
            store.insert_payment(payment("STU-1", *amount, &format!("R{}", i)));
        }
        let logged: Decimal = store.payments_for("STU-1").iter().map(|p| p.amount).sum();
        assert_eq!(store.account("STU-1").total_paid, logged);
        assert_eq!(logged, dec!(1350.50));
    }
}

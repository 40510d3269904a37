//! Payment recording and callback reconciliation.
//!
//! Manual entries and provider-confirmed pushes share one code path:
//! everything funnels through `record_payment`, whose idempotent-insert
//! semantics make replayed provider callbacks safe.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{FeeError, FeeResult};
use crate::ledger::{LedgerStore, Payment, PaymentMethod, StudentFeeAccount};
use crate::provider::phone::validate_transaction_ref;
use crate::provider::types::StkCallback;
use crate::services::push_payment::{provider_amount, PushOutcome, PushRegistry};

/// Actor recorded against payments that arrive via the provider webhook.
const CALLBACK_ACTOR: &str = "provider-callback";

#[derive(Debug, Clone)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub account: StudentFeeAccount,
    /// True when the transaction reference had been seen before and the
    /// call was absorbed as a no-op.
    pub duplicate: bool,
}

/// Result of reconciling one provider callback.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Recorded(RecordedPayment),
    PushFailed {
        checkout_id: String,
        reason: String,
    },
    /// Callback referenced a checkout id we never initiated. Acknowledged
    /// to stop provider retries, flagged for manual review.
    UnknownCheckout {
        checkout_id: String,
    },
}

pub struct PaymentRecorder {
    ledger: Arc<LedgerStore>,
    pushes: Arc<PushRegistry>,
}

impl PaymentRecorder {
    pub fn new(ledger: Arc<LedgerStore>, pushes: Arc<PushRegistry>) -> Self {
        Self { ledger, pushes }
    }

    /// Records a confirmed payment. Inserting and recomputing the account
    /// happen before this returns, so the returned account snapshot is
    /// already consistent with the new payment.
    pub fn record_payment(
        &self,
        student_id: &str,
        amount: Decimal,
        method: PaymentMethod,
        transaction_ref: &str,
        recorded_by: &str,
    ) -> FeeResult<RecordedPayment> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(FeeError::invalid_input(
                "student_id",
                "student id must not be empty",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(FeeError::invalid_input(
                "amount",
                format!("amount must be greater than zero, got {}", amount),
            ));
        }
        let transaction_ref = validate_transaction_ref(transaction_ref)?;

        let outcome = self.ledger.insert_payment(Payment {
            student_id: student_id.to_string(),
            amount,
            method,
            transaction_ref: transaction_ref.clone(),
            recorded_by: recorded_by.to_string(),
            payment_date: Utc::now(),
        });

        let duplicate = outcome.is_duplicate();
        let payment = outcome.payment().clone();
        // Duplicates are an audit event, not an error.
        if duplicate {
            info!(
                transaction_ref = %transaction_ref,
                student_id = %payment.student_id,
                "duplicate payment absorbed as no-op"
            );
        } else {
            info!(
                transaction_ref = %transaction_ref,
                student_id = %student_id,
                amount = %amount,
                method = %method,
                "payment recorded"
            );
        }

        let account = self.ledger.account(&payment.student_id);
        Ok(RecordedPayment {
            payment,
            account,
            duplicate,
        })
    }

    /// Maps a provider callback onto the pending push it confirms or
    /// fails, then records through the same path as manual entry. The
    /// transaction reference is the provider receipt, falling back to the
    /// checkout id, so redelivered callbacks cannot double-post.
    pub fn reconcile_callback(&self, callback: &StkCallback) -> FeeResult<ReconcileOutcome> {
        let checkout_id = callback.checkout_request_id.clone();
        let push = match self.pushes.get(&checkout_id) {
            Some(push) => push,
            None => {
                warn!(
                    checkout_id = %checkout_id,
                    result_code = callback.result_code,
                    "callback for unknown checkout id, flagging for manual review"
                );
                return Ok(ReconcileOutcome::UnknownCheckout { checkout_id });
            }
        };

        if !callback.is_success() {
            let reason = callback
                .result_desc
                .clone()
                .unwrap_or_else(|| format!("provider result code {}", callback.result_code));
            self.pushes.set_outcome(&checkout_id, PushOutcome::Failed);
            info!(
                checkout_id = %checkout_id,
                student_ref = %push.student_ref,
                reason = %reason,
                "push payment failed"
            );
            return Ok(ReconcileOutcome::PushFailed {
                checkout_id,
                reason,
            });
        }

        // Without Amount metadata, fall back to the whole-unit value the
        // provider was asked to charge, not the fractional ledger amount.
        let amount = callback.amount().unwrap_or_else(|| {
            provider_amount(push.amount)
                .map(Decimal::from)
                .unwrap_or(push.amount)
        });
        let transaction_ref = callback
            .receipt_number()
            .unwrap_or_else(|| checkout_id.clone());
        let recorded = self.record_payment(
            &push.student_ref,
            amount,
            PaymentMethod::MobileMoney,
            &transaction_ref,
            CALLBACK_ACTOR,
        )?;
        self.pushes.set_outcome(&checkout_id, PushOutcome::Confirmed);
        Ok(ReconcileOutcome::Recorded(recorded))
    }
}

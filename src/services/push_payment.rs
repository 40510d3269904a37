//! Push-payment initiation and the in-flight request registry.
//!
//! A push request is the bridge between "prompt sent" and "payment
//! recorded". The registry keeps every initiated push keyed by the
//! provider's checkout id so a later callback, however late or repeated,
//! can be mapped back to the student it was raised for.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{FeeError, FeeResult};
use crate::provider::phone::validate_msisdn;
use crate::provider::CollectionProvider;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Pending,
    Confirmed,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushPaymentRequest {
    pub id: Uuid,
    pub phone: String,
    pub amount: Decimal,
    pub student_ref: String,
    pub checkout_id: String,
    pub outcome: PushOutcome,
    pub initiated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_message: Option<String>,
}

/// Whole-unit amount submitted to the provider for a given ledger amount.
/// None when the amount does not round to a positive unit.
pub fn provider_amount(amount: Decimal) -> Option<u64> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .filter(|v| *v > 0)
}

/// In-memory map of initiated pushes by checkout id. Resolved entries
/// stay around for a retention window so redelivered callbacks still
/// match, then get evicted by the periodic sweep.
#[derive(Default)]
pub struct PushRegistry {
    inner: RwLock<HashMap<String, PushPaymentRequest>>,
}

impl PushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request: PushPaymentRequest) {
        let mut inner = self.inner.write().expect("push registry lock poisoned");
        inner.insert(request.checkout_id.clone(), request);
    }

    pub fn get(&self, checkout_id: &str) -> Option<PushPaymentRequest> {
        let inner = self.inner.read().expect("push registry lock poisoned");
        inner.get(checkout_id).cloned()
    }

    pub fn set_outcome(&self, checkout_id: &str, outcome: PushOutcome) -> Option<PushPaymentRequest> {
        let mut inner = self.inner.write().expect("push registry lock poisoned");
        let entry = inner.get_mut(checkout_id)?;
        entry.outcome = outcome;
        if outcome != PushOutcome::Pending {
            entry.resolved_at = Some(Utc::now());
        }
        Some(entry.clone())
    }

    /// Marks pending pushes older than `max_age` as timed out and returns
    /// them. A late callback still reconciles a timed-out push: the
    /// marking is advisory, like caller-side cancellation.
    pub fn expire_pending(&self, max_age: ChronoDuration) -> Vec<PushPaymentRequest> {
        let cutoff = Utc::now() - max_age;
        let mut inner = self.inner.write().expect("push registry lock poisoned");
        let mut expired = Vec::new();
        for entry in inner.values_mut() {
            if entry.outcome == PushOutcome::Pending && entry.initiated_at < cutoff {
                entry.outcome = PushOutcome::TimedOut;
                entry.resolved_at = Some(Utc::now());
                expired.push(entry.clone());
            }
        }
        expired
    }

    /// Drops resolved entries older than `retention`, measured from the
    /// moment their outcome was set. Pending entries are never evicted,
    /// and a resolved entry survives long enough for redelivered or late
    /// callbacks to still find it. Returns the number removed.
    pub fn evict_resolved(&self, retention: ChronoDuration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut inner = self.inner.write().expect("push registry lock poisoned");
        let before = inner.len();
        inner.retain(|_, entry| match entry.outcome {
            PushOutcome::Pending => true,
            _ => entry.resolved_at.map_or(true, |at| at >= cutoff),
        });
        before - inner.len()
    }
}

pub struct PushPaymentService {
    provider: Arc<dyn CollectionProvider>,
    registry: Arc<PushRegistry>,
}

impl PushPaymentService {
    pub fn new(provider: Arc<dyn CollectionProvider>, registry: Arc<PushRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Initiates a provider push prompt. No ledger state is touched here;
    /// only the reconciliation of a later callback records money.
    pub async fn initiate(
        &self,
        phone: &str,
        amount: Decimal,
        student_ref: &str,
    ) -> FeeResult<PushPaymentRequest> {
        if amount <= Decimal::ZERO {
            return Err(FeeError::invalid_input(
                "amount",
                format!("amount must be greater than zero, got {}", amount),
            ));
        }
        let student_ref = student_ref.trim();
        if student_ref.is_empty() {
            return Err(FeeError::invalid_input(
                "student_ref",
                "student reference must not be empty",
            ));
        }
        let canonical_phone = validate_msisdn(phone)?;

        // Provider wants whole currency units; round half away from zero.
        let rounded = provider_amount(amount).ok_or_else(|| {
            FeeError::invalid_input(
                "amount",
                format!("amount {} does not round to a positive whole unit", amount),
            )
        })?;

        let ack = self
            .provider
            .request_push(&canonical_phone, rounded, student_ref)
            .await
            .map_err(|e| {
                warn!(
                    student_ref = %student_ref,
                    error = %e,
                    "push payment initiation failed"
                );
                FeeError::from(e)
            })?;

        let request = PushPaymentRequest {
            id: Uuid::new_v4(),
            phone: canonical_phone,
            amount,
            student_ref: student_ref.to_string(),
            checkout_id: ack.checkout_id,
            outcome: PushOutcome::Pending,
            initiated_at: Utc::now(),
            resolved_at: None,
            customer_message: ack.customer_message,
        };
        self.registry.register(request.clone());
        info!(
            checkout_id = %request.checkout_id,
            student_ref = %request.student_ref,
            "push payment pending provider callback"
        );
        Ok(request)
    }
}

//! HTTP surface: admin endpoints, provider webhook and router assembly.

pub mod payments;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};
use http::HeaderName;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::health;
use crate::ledger::LedgerStore;
use crate::services::{PaymentRecorder, PushPaymentService};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub recorder: Arc<PaymentRecorder>,
    pub push_service: Arc<PushPaymentService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/payments", post(payments::record_payment))
        .route("/api/payments/push", post(payments::initiate_push))
        .route("/api/fees", post(payments::assign_fee))
        .route("/api/accounts", get(payments::list_accounts))
        .route("/api/accounts/{student_id}", get(payments::get_account))
        .route("/api/summary", get(payments::get_summary))
        .route("/webhooks/daraja", post(webhooks::handle_callback))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    HeaderName::from_static("x-request-id"),
                    MakeRequestUuid,
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

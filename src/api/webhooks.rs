//! Provider callback endpoint.
//!
//! The provider retries undelivered callbacks, so once a payload parses
//! we always acknowledge with 200: reconciliation problems are logged and
//! flagged for review instead of triggering endless redelivery.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::provider::types::StkCallbackEnvelope;
use crate::services::ReconcileOutcome;

fn ack() -> impl IntoResponse {
    Json(serde_json::json!({"ResultCode": 0, "ResultDesc": "Accepted"}))
}

/// POST /webhooks/daraja
pub async fn handle_callback(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let envelope: StkCallbackEnvelope = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "malformed provider callback payload");
            return (StatusCode::BAD_REQUEST, "invalid callback payload").into_response();
        }
    };
    let callback = envelope.body.stk_callback;
    info!(
        checkout_id = %callback.checkout_request_id,
        result_code = callback.result_code,
        "provider callback received"
    );

    match state.recorder.reconcile_callback(&callback) {
        Ok(ReconcileOutcome::Recorded(recorded)) => {
            info!(
                transaction_ref = %recorded.payment.transaction_ref,
                student_id = %recorded.payment.student_id,
                duplicate = recorded.duplicate,
                "callback reconciled"
            );
        }
        Ok(ReconcileOutcome::PushFailed { checkout_id, reason }) => {
            info!(checkout_id = %checkout_id, reason = %reason, "push reported failed");
        }
        Ok(ReconcileOutcome::UnknownCheckout { checkout_id }) => {
            warn!(checkout_id = %checkout_id, "unmatched callback held for manual review");
        }
        Err(e) => {
            // Acknowledge anyway; the discrepancy is in the logs.
            error!(error = %e, "callback reconciliation failed");
        }
    }
    ack().into_response()
}

//! Admin-facing fee endpoints: payment recording, fee assignment and
//! account/summary queries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::AppState;
use crate::error::FeeError;
use crate::ledger::{FeeStructure, Payment, PaymentMethod, StudentFeeAccount};

#[derive(Debug, Deserialize)]
pub struct RecordPaymentBody {
    pub student_id: String,
    pub amount: Decimal,
    pub method: String,
    pub transaction_ref: String,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub payment: Payment,
    pub account: StudentFeeAccount,
    pub duplicate: bool,
}

/// POST /api/payments
pub async fn record_payment(
    State(state): State<AppState>,
    Json(body): Json<RecordPaymentBody>,
) -> Result<impl IntoResponse, FeeError> {
    let method: PaymentMethod = body.method.parse()?;
    let recorded_by = body.recorded_by.as_deref().unwrap_or("admin-api");
    let recorded = state.recorder.record_payment(
        &body.student_id,
        body.amount,
        method,
        &body.transaction_ref,
        recorded_by,
    )?;

    let status = if recorded.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(RecordPaymentResponse {
            payment: recorded.payment,
            account: recorded.account,
            duplicate: recorded.duplicate,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct InitiatePushBody {
    pub phone: String,
    pub amount: Decimal,
    pub student_ref: String,
}

/// POST /api/payments/push
pub async fn initiate_push(
    State(state): State<AppState>,
    Json(body): Json<InitiatePushBody>,
) -> Result<impl IntoResponse, FeeError> {
    let request = state
        .push_service
        .initiate(&body.phone, body.amount, &body.student_ref)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub struct AssignFeeBody {
    pub student_id: String,
    pub course: String,
    pub amount: Decimal,
}

/// POST /api/fees
pub async fn assign_fee(
    State(state): State<AppState>,
    Json(body): Json<AssignFeeBody>,
) -> Result<impl IntoResponse, FeeError> {
    let student_id = body.student_id.trim();
    if student_id.is_empty() {
        return Err(FeeError::invalid_input(
            "student_id",
            "student id must not be empty",
        ));
    }
    if body.course.trim().is_empty() {
        return Err(FeeError::invalid_input(
            "course",
            "course must not be empty",
        ));
    }
    if body.amount <= Decimal::ZERO {
        return Err(FeeError::invalid_input(
            "amount",
            format!("amount must be greater than zero, got {}", body.amount),
        ));
    }

    let fee = FeeStructure::new(body.course.trim(), body.amount);
    state.ledger.assign_fee(student_id, &fee);
    Ok((StatusCode::CREATED, Json(state.ledger.account(student_id))))
}

/// GET /api/accounts/{student_id}
pub async fn get_account(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    debug!(student_id = %student_id, "account lookup");
    Json(state.ledger.account(&student_id))
}

/// GET /api/accounts
pub async fn list_accounts(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.accounts())
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.summary())
}

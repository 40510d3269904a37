use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FeeError;

/// Expected charge for a course/cohort. Immutable once created; a new
/// structure for the same course supersedes the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: Uuid,
    pub course: String,
    pub amount: Decimal,
    pub effective_from: DateTime<Utc>,
}

impl FeeStructure {
    pub fn new(course: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            course: course.into(),
            amount,
            effective_from: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    BankTransfer,
    Cash,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = FeeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mobile_money" | "mpesa" | "m-pesa" => Ok(PaymentMethod::MobileMoney),
            "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "cash" => Ok(PaymentMethod::Cash),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            _ => Err(FeeError::InvalidInput {
                field: Some("method".to_string()),
                message: format!("unsupported payment method: {}", value),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    Unpaid,
    Partial,
    Paid,
}

impl FeeStatus {
    /// Pure function of (total_paid, total_due). Overpayment collapses to
    /// Paid; excess is not modelled as credit.
    pub fn derive(total_paid: Decimal, total_due: Decimal) -> Self {
        if total_paid >= total_due {
            FeeStatus::Paid
        } else if total_paid > Decimal::ZERO {
            FeeStatus::Partial
        } else {
            FeeStatus::Unpaid
        }
    }
}

/// Append-only payment record. The `transaction_ref` is the idempotency key:
/// unique across all payments, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub student_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_ref: String,
    pub recorded_by: String,
    pub payment_date: DateTime<Utc>,
}

/// Derived per-student summary row. `total_paid`, `balance` and `status`
/// are written only by the ledger recompute, never by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentFeeAccount {
    pub student_id: String,
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub status: FeeStatus,
}

impl StudentFeeAccount {
    /// Zero-valued account for students the ledger has never seen. Read
    /// paths return this instead of erroring so "new student" is never a
    /// special case.
    pub fn empty(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            total_due: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            balance: Decimal::ZERO,
            status: FeeStatus::Paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_is_a_pure_function_of_paid_vs_due() {
        assert_eq!(FeeStatus::derive(dec!(0), dec!(10000)), FeeStatus::Unpaid);
        assert_eq!(FeeStatus::derive(dec!(4000), dec!(10000)), FeeStatus::Partial);
        assert_eq!(FeeStatus::derive(dec!(10000), dec!(10000)), FeeStatus::Paid);
        assert_eq!(FeeStatus::derive(dec!(12000), dec!(10000)), FeeStatus::Paid);
    }

    #[test]
    fn zero_due_zero_paid_counts_as_paid() {
        assert_eq!(FeeStatus::derive(dec!(0), dec!(0)), FeeStatus::Paid);
    }

    #[test]
    fn payment_method_parses_common_aliases() {
        assert_eq!(
            "m-pesa".parse::<PaymentMethod>().expect("should parse"),
            PaymentMethod::MobileMoney
        );
        assert_eq!(
            "Bank_Transfer".parse::<PaymentMethod>().expect("should parse"),
            PaymentMethod::BankTransfer
        );
        assert!("crypto".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn empty_account_is_zero_valued() {
        let account = StudentFeeAccount::empty("STU-1");
        assert_eq!(account.total_due, Decimal::ZERO);
        assert_eq!(account.total_paid, Decimal::ZERO);
        assert_eq!(account.status, FeeStatus::Paid);
    }
}

//! Msisdn and transaction-reference utilities.

use crate::error::{FeeError, FeeResult};

const COUNTRY_CODE: &str = "254";

/// Normalizes a phone number to canonical digits-only international form.
///
/// Total and deterministic: it never fails. Numbers the provider's
/// numbering plan still rejects surface later as a provider-side error,
/// since this engine cannot authoritatively validate every plan.
///
/// `0712345678`, `254712345678` and `+254712345678` all normalize to
/// `254712345678`; any other prefix is assumed domestic and gets the
/// country code prepended.
pub fn normalize_msisdn(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        return format!("{}{}", COUNTRY_CODE, rest);
    }
    if digits.starts_with(COUNTRY_CODE) {
        return digits;
    }
    format!("{}{}", COUNTRY_CODE, digits)
}

/// Rejects phone inputs with no usable digits before they reach the
/// provider. Normalization itself stays total; this is the local
/// precondition check for initiate().
pub fn validate_msisdn(raw: &str) -> FeeResult<String> {
    let has_digits = raw.chars().any(|c| c.is_ascii_digit());
    if !has_digits {
        return Err(FeeError::invalid_input(
            "phone",
            format!("'{}' contains no digits", raw),
        ));
    }
    let canonical = normalize_msisdn(raw);
    if canonical.len() < 10 {
        return Err(FeeError::invalid_input(
            "phone",
            format!("'{}' is too short to be a mobile number", raw),
        ));
    }
    Ok(canonical)
}

/// The idempotency key for payments. Non-empty after trimming, bounded
/// length, and limited to characters that survive being logged and sent
/// to the provider as an account reference.
pub fn validate_transaction_ref(raw: &str) -> FeeResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FeeError::invalid_input(
            "transaction_ref",
            "transaction reference must not be empty",
        ));
    }
    if trimmed.len() > 64 {
        return Err(FeeError::invalid_input(
            "transaction_ref",
            "transaction reference must be at most 64 characters",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(FeeError::invalid_input(
            "transaction_ref",
            "transaction reference may only contain letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(trimmed.to_string())
}

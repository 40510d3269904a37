//! Provider-documented wire shapes for the token exchange, the STK push
//! submission and the asynchronous result callback.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response of the client-credentials token exchange. The provider
/// reports `expires_in` as a string of seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: String,
}

impl TokenResponse {
    pub fn expires_in_secs(&self) -> Option<u64> {
        self.expires_in.trim().parse::<u64>().ok()
    }
}

/// STK push submission body. Field names follow the provider's API.
#[derive(Debug, Clone, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: u64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

/// Accepted-push acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushAck {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: Option<String>,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: Option<String>,
}

/// Error body the provider returns on rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(rename = "requestId", default)]
    pub request_id: Option<String>,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

/// Asynchronous result callback envelope: `Body.stkCallback`.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    fn item(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// Confirmed amount from the metadata items, if present.
    pub fn amount(&self) -> Option<Decimal> {
        let value = self.item("Amount")?;
        if let Some(n) = value.as_u64() {
            return Some(Decimal::from(n));
        }
        if let Some(f) = value.as_f64() {
            return Decimal::try_from(f).ok();
        }
        value.as_str().and_then(|s| s.parse().ok())
    }

    /// Provider-side transaction id (the receipt number).
    pub fn receipt_number(&self) -> Option<String> {
        self.item("MpesaReceiptNumber")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    pub fn payer_phone(&self) -> Option<String> {
        self.item("PhoneNumber").map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

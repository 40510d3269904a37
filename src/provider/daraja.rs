//! STK push client for the Daraja-style mobile-money API.
//!
//! Initiating a push never touches the ledger: the provider's answer here
//! only says whether the prompt was accepted for delivery. Money is
//! recorded solely when the asynchronous callback is reconciled.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tracing::{info, warn};

use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::http::{AuthScheme, ProviderHttpClient};
use crate::provider::token::TokenManager;
use crate::provider::types::{ProviderErrorBody, StkPushAck, StkPushRequest};

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Provider acknowledgement of an accepted push.
#[derive(Debug, Clone)]
pub struct PushAck {
    pub checkout_id: String,
    pub merchant_request_id: String,
    pub customer_message: Option<String>,
}

/// Seam between the push-payment service and the concrete provider, so
/// the initiation flow is testable with fakes.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Asks the provider to prompt `phone` for `amount` (integer minor
    /// units), tagging the charge with the student's account reference.
    async fn request_push(
        &self,
        phone: &str,
        amount: u64,
        account_reference: &str,
    ) -> ProviderResult<PushAck>;
}

#[derive(Debug, Clone)]
pub struct DarajaConfig {
    pub base_url: String,
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
}

pub struct DarajaClient {
    http: ProviderHttpClient,
    tokens: Arc<TokenManager>,
    config: DarajaConfig,
    push_url: String,
}

impl DarajaClient {
    pub fn new(http: ProviderHttpClient, tokens: Arc<TokenManager>, config: DarajaConfig) -> Self {
        let push_url = format!(
            "{}/mpesa/stkpush/v1/processrequest",
            config.base_url.trim_end_matches('/')
        );
        Self {
            http,
            tokens,
            config,
            push_url,
        }
    }

    /// base64(shortcode + passkey + timestamp), with the timestamp in the
    /// provider's `%Y%m%d%H%M%S` form.
    fn derive_password(shortcode: &str, passkey: &str, at: DateTime<Utc>) -> (String, String) {
        let timestamp = at.format("%Y%m%d%H%M%S").to_string();
        let password = BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp));
        (password, timestamp)
    }

    fn build_request(&self, phone: &str, amount: u64, account_reference: &str) -> StkPushRequest {
        let (password, timestamp) =
            Self::derive_password(&self.config.shortcode, &self.config.passkey, Utc::now());
        StkPushRequest {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount,
            party_a: phone.to_string(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone.to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: "Fee payment".to_string(),
        }
    }

    /// Maps a non-2xx push response to a rejection carrying the
    /// provider's own message, not a generic failure.
    fn classify_rejection(status: StatusCode, body: &str) -> ProviderError {
        let parsed: Option<ProviderErrorBody> = serde_json::from_str(body).ok();
        let (message, code) = match parsed {
            Some(err) => (
                err.error_message
                    .unwrap_or_else(|| format!("provider returned HTTP {}", status.as_u16())),
                err.error_code,
            ),
            None => (
                format!("provider returned HTTP {}", status.as_u16()),
                Some(status.as_u16().to_string()),
            ),
        };
        ProviderError::Rejected { message, code }
    }

    async fn submit(&self, token: &str, payload: &serde_json::Value) -> ProviderResult<(StatusCode, String)> {
        self.http
            .request(
                Method::POST,
                &self.push_url,
                &AuthScheme::Bearer(token.to_string()),
                Some(payload),
            )
            .await
    }
}

#[async_trait]
impl CollectionProvider for DarajaClient {
    async fn request_push(
        &self,
        phone: &str,
        amount: u64,
        account_reference: &str,
    ) -> ProviderResult<PushAck> {
        let request = self.build_request(phone, amount, account_reference);
        let payload = serde_json::to_value(&request).map_err(|e| ProviderError::InvalidResponse {
            message: format!("failed to serialize push request: {}", e),
        })?;

        let token = self.tokens.token().await?;
        let (mut status, mut body) = self.submit(&token, &payload).await?;

        // A rejected token means our cache outlived the provider's view of
        // it. Refresh once and resubmit; anything after that is a failure.
        if status == StatusCode::UNAUTHORIZED {
            warn!("push submission rejected with 401, refreshing provider token");
            self.tokens.invalidate().await;
            let token = self.tokens.token().await?;
            (status, body) = self.submit(&token, &payload).await?;
        }

        if !status.is_success() {
            return Err(Self::classify_rejection(status, &body));
        }

        let ack: StkPushAck =
            serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                message: format!("invalid push response: {}", e),
            })?;
        if ack.response_code.trim() != "0" {
            return Err(ProviderError::Rejected {
                message: ack
                    .response_description
                    .unwrap_or_else(|| "push request not accepted".to_string()),
                code: Some(ack.response_code),
            });
        }

        info!(
            checkout_id = %ack.checkout_request_id,
            account_reference = %account_reference,
            amount = amount,
            "push payment accepted by provider"
        );
        Ok(PushAck {
            checkout_id: ack.checkout_request_id,
            merchant_request_id: ack.merchant_request_id,
            customer_message: ack.customer_message,
        })
    }
}

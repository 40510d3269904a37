//! Thin reqwest wrapper for provider calls.
//!
//! Classifies transport failures only: a timeout becomes `UnknownState`
//! (the provider may still process the request), other transport errors
//! become `Network`. Status-code handling stays with the caller, which
//! knows the provider's error body shape.

use reqwest::{Client, Method, StatusCode};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::provider::error::{ProviderError, ProviderResult};

#[derive(Clone)]
pub enum AuthScheme {
    Basic { username: String, password: String },
    Bearer(String),
}

#[derive(Clone)]
pub struct ProviderHttpClient {
    client: Client,
    timeout: Duration,
}

impl ProviderHttpClient {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one request and returns the raw status and body text.
    /// Never retries: push submissions must not be replayed blindly, and
    /// token-exchange backoff is the caller's responsibility.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        auth: &AuthScheme,
        body: Option<&JsonValue>,
    ) -> ProviderResult<(StatusCode, String)> {
        let mut request = self.client.request(method, url);
        request = match auth {
            AuthScheme::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthScheme::Bearer(token) => request.bearer_auth(token),
        };
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::UnknownState {
                    message: format!(
                        "provider request timed out after {}s",
                        self.timeout.as_secs()
                    ),
                }
            } else {
                ProviderError::Network {
                    message: format!("provider request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ProviderError::Network {
            message: format!("failed to read provider response: {}", e),
        })?;
        Ok((status, text))
    }
}

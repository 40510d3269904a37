//! Cached bearer credential for the provider API.
//!
//! The cache is a `tokio::sync::Mutex` held across the exchange, which
//! gives single-flight refresh for free: concurrent callers that find the
//! token expired queue on the lock and the first one through refreshes for
//! everyone. The token value never leaves this module except as the
//! opaque string handed to the push client.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Method;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::http::{AuthScheme, ProviderHttpClient};
use crate::provider::types::TokenResponse;

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct TokenManager {
    http: ProviderHttpClient,
    token_url: String,
    consumer_key: String,
    consumer_secret: String,
    safety_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(
        http: ProviderHttpClient,
        base_url: &str,
        consumer_key: String,
        consumer_secret: String,
        safety_margin: Duration,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                base_url.trim_end_matches('/')
            ),
            consumer_key,
            consumer_secret,
            safety_margin,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, exchanging credentials only when the
    /// cached one is missing or past its safety-margin-adjusted expiry.
    pub async fn token(&self) -> ProviderResult<String> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.is_valid_at(Utc::now()) {
                return Ok(cached.value.clone());
            }
            debug!("cached provider token expired, refreshing");
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    /// Drops the cached token. Used after the provider rejects it (401 on
    /// a push submission) so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        let mut guard = self.cached.lock().await;
        if guard.take().is_some() {
            warn!("provider token invalidated before expiry");
        }
    }

    async fn exchange(&self) -> ProviderResult<CachedToken> {
        let auth = AuthScheme::Basic {
            username: self.consumer_key.clone(),
            password: self.consumer_secret.clone(),
        };
        // Any failure here, transport included, is an auth failure: no
        // token was obtained and nothing is cached.
        let (status, body) = self
            .http
            .request(Method::GET, &self.token_url, &auth, None)
            .await
            .map_err(|e| ProviderError::AuthFailed {
                message: format!("token exchange failed: {}", e),
            })?;

        if !status.is_success() {
            return Err(ProviderError::AuthFailed {
                message: format!("token endpoint returned HTTP {}", status.as_u16()),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::AuthFailed {
                message: format!("invalid token response: {}", e),
            })?;
        let lifetime = parsed
            .expires_in_secs()
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let usable = lifetime.saturating_sub(self.safety_margin.as_secs());
        let expires_at = Utc::now() + ChronoDuration::seconds(usable as i64);
        info!(lifetime_secs = lifetime, "provider token refreshed");

        Ok(CachedToken {
            value: parsed.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_validity_is_strict_on_expiry() {
        let now = Utc::now();
        let token = CachedToken {
            value: "abc".to_string(),
            expires_at: now + ChronoDuration::seconds(10),
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + ChronoDuration::seconds(10)));
        assert!(!token.is_valid_at(now + ChronoDuration::seconds(60)));
    }

    #[tokio::test]
    async fn invalidate_clears_the_cache() {
        let http = ProviderHttpClient::new(Duration::from_secs(1)).expect("client should build");
        let manager = TokenManager::new(
            http,
            "https://sandbox.example.com",
            "key".to_string(),
            "secret".to_string(),
            Duration::from_secs(30),
        );
        {
            let mut guard = manager.cached.lock().await;
            *guard = Some(CachedToken {
                value: "stale".to_string(),
                expires_at: Utc::now() + ChronoDuration::seconds(600),
            });
        }
        manager.invalidate().await;
        assert!(manager.cached.lock().await.is_none());
    }

    #[tokio::test]
    async fn valid_cached_token_is_returned_without_exchange() {
        let http = ProviderHttpClient::new(Duration::from_secs(1)).expect("client should build");
        let manager = TokenManager::new(
            http,
            "https://sandbox.example.com",
            "key".to_string(),
            "secret".to_string(),
            Duration::from_secs(30),
        );
        {
            let mut guard = manager.cached.lock().await;
            *guard = Some(CachedToken {
                value: "cached-token".to_string(),
                expires_at: Utc::now() + ChronoDuration::seconds(600),
            });
        }
        // The base URL is unreachable, so this only succeeds if the cache
        // short-circuits the exchange.
        let token = manager.token().await.expect("cached token should be used");
        assert_eq!(token, "cached-token");
    }
}

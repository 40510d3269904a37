use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures talking to the mobile-money provider.
///
/// `UnknownState` is deliberately distinct from `Rejected`: a timed-out
/// push may still be processed by the provider, so callers must wait for
/// the callback instead of assuming failure.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Token exchange failed: {message}")]
    AuthFailed { message: String },

    #[error("Provider rejected request: {message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    #[error("Provider state unknown: {message}")]
    UnknownState { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid provider response: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::AuthFailed { .. } => true,
            ProviderError::Rejected { .. } => false,
            ProviderError::UnknownState { .. } => true,
            ProviderError::Network { .. } => true,
            ProviderError::InvalidResponse { .. } => false,
        }
    }
}

impl From<ProviderError> for crate::error::FeeError {
    fn from(err: ProviderError) -> Self {
        use crate::error::FeeError;
        match err {
            ProviderError::AuthFailed { message } => FeeError::ProviderAuth { message },
            ProviderError::Rejected { message, code } => FeeError::ProviderRejected { message, code },
            ProviderError::UnknownState { message } | ProviderError::Network { message } => {
                FeeError::ProviderUnknownState { message }
            }
            ProviderError::InvalidResponse { message } => FeeError::ProviderUnknownState { message },
        }
    }
}

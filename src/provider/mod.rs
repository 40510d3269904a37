//! Outbound integration with the mobile-money provider.

pub mod daraja;
pub mod error;
pub mod http;
pub mod phone;
pub mod token;
pub mod types;

pub use daraja::{CollectionProvider, DarajaClient, DarajaConfig, PushAck};
pub use error::{ProviderError, ProviderResult};
pub use token::TokenManager;

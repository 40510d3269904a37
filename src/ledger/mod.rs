//! Fee account ledger: the data-owning core of the engine.

pub mod analytics;
pub mod store;
pub mod types;

pub use analytics::CollectionSummary;
pub use store::{InsertOutcome, LedgerStore};
pub use types::{FeeStatus, FeeStructure, Payment, PaymentMethod, StudentFeeAccount};

//! Fee ledger and mobile-money payment reconciliation engine.
//!
//! Tracks per-student amounts due and paid, derives balances and
//! statuses from an append-only payment log, and coordinates the
//! asynchronous STK push flow: token acquisition, push initiation and
//! callback reconciliation.

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod ledger;
pub mod logging;
pub mod provider;
pub mod services;

//! Collection-wide rollup for reporting. Read-only: computed by scanning
//! the account rows at call time, so it is always consistent with the
//! ledger and there is no cache to invalidate.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::store::LedgerStore;
use crate::ledger::types::{FeeStatus, StudentFeeAccount};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionSummary {
    pub total_expected: Decimal,
    pub total_collected: Decimal,
    pub total_outstanding: Decimal,
    pub pending_accounts: u64,
}

pub fn summarize(accounts: &[StudentFeeAccount]) -> CollectionSummary {
    let mut summary = CollectionSummary {
        total_expected: Decimal::ZERO,
        total_collected: Decimal::ZERO,
        total_outstanding: Decimal::ZERO,
        pending_accounts: 0,
    };
    for account in accounts {
        summary.total_expected += account.total_due;
        summary.total_collected += account.total_paid;
        summary.total_outstanding += account.balance.max(Decimal::ZERO);
        if account.status != FeeStatus::Paid {
            summary.pending_accounts += 1;
        }
    }
    summary
}

impl LedgerStore {
    pub fn summary(&self) -> CollectionSummary {
        summarize(&self.accounts())
    }
}

mod conversation;
mod lead_ledger;
mod memory;

pub use conversation::SqlHistoryStore;
pub use lead_ledger::SqlLeadLedger;
pub use memory::{InMemoryHistoryStore, InMemoryLeadLedger};

use leadline_core::StoreError;

pub(crate) fn store_error(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

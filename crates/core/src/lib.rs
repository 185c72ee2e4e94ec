//! Core types and contracts for the leadline relay.
//!
//! This crate holds everything the channel, storage, backend, and CRM crates
//! share:
//! - **Domain model** (`domain`) - conversation turns, identity keys, leads
//! - **Configuration** (`config`) - layered TOML/env/override loading
//! - **Sentinel protocol** (`sentinel`) - the in-band lead marker contract
//! - **Window building** (`window`) - bounded recent-history projections
//! - **Boundary traits** (`traits`) - injected store/backend/CRM contracts
//!
//! The boundary traits exist so the message handler can be exercised end to
//! end with in-memory doubles; production wiring happens in the server
//! bootstrap.

pub mod config;
pub mod domain;
pub mod errors;
pub mod sentinel;
pub mod traits;
pub mod window;

pub use domain::conversation::{ChannelKind, ConversationKey, Role, Turn};
pub use domain::lead::{CustomerInfo, ExtractedLead};
pub use errors::EventError;
pub use sentinel::strip_sentinel;
pub use traits::{
    AnswerBackend, BackendError, BackendQuery, BackendReply, HistoryStore, LeadForwardOutcome,
    LeadLedger, LeadSink, LeadSinkError, StoreError,
};
pub use window::{ConversationWindow, WindowBuilder};

//! CRM lead forwarding.
//!
//! Two layers: [`CrmClient`] is the raw record-creation call against the
//! CRM's v4 leads endpoint, and [`LeadForwarder`] wraps it with the
//! idempotency ledger so one captured lead produces at most one CRM record
//! per conversation.

pub mod client;
pub mod forwarder;

pub use client::{CrmClient, CrmClientError, HttpCrmClient, NoopCrmClient};
pub use forwarder::{format_lead_record, LeadForwarder};

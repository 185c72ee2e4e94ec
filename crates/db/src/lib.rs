//! SQLite persistence for leadline.
//!
//! Conversation history is an append-only turn log rather than a single
//! overwritten document: concurrent events for the same conversation
//! interleave their appends instead of losing each other's turns, and a
//! uniqueness constraint on the transport event id makes appends idempotent
//! under at-least-once delivery.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryHistoryStore, InMemoryLeadLedger, SqlHistoryStore, SqlLeadLedger,
};

//! HTTP client for the question-answering backend.
//!
//! The backend is a stateless request/response service: one JSON POST with
//! the query, the bounded conversation window, and the company name; one
//! JSON reply with free text and an optional structured side channel. Any
//! transport-level failure surfaces as `BackendError::Unavailable` - never
//! a silent empty result. Retry policy, if any, belongs to the caller.

pub mod client;

pub use client::HttpAnswerBackend;

use thiserror::Error;

use crate::traits::{BackendError, LeadSinkError, StoreError};

/// Per-event failure taxonomy for the answer cycle.
///
/// Only two variants carry a user-visible reply; lead forwarding and store
/// failures must never change what the end user sees.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("no usable text on inbound event")]
    NoUsableText,
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("lead forwarding failed: {0}")]
    LeadForwardFailed(String),
    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EventError {
    /// Fixed reply sent instead of an answer, when one is warranted.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::NoUsableText => Some(
                "Sorry, I can only read text messages. Please send your question as text.",
            ),
            Self::BackendUnavailable(_) => Some(
                "I'm still working on your answer, give me a moment and ask again shortly.",
            ),
            Self::LeadForwardFailed(_) | Self::StoreUnavailable(_) => None,
        }
    }

    /// Fallback for errors that escape the handler entirely.
    pub fn generic_failure_message() -> &'static str {
        "Something went wrong on my side. Please try again in a bit."
    }
}

impl From<StoreError> for EventError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(detail) => Self::StoreUnavailable(detail),
        }
    }
}

impl From<BackendError> for EventError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unavailable(detail) => Self::BackendUnavailable(detail),
        }
    }
}

impl From<LeadSinkError> for EventError {
    fn from(value: LeadSinkError) -> Self {
        match value {
            LeadSinkError::Forward(detail) => Self::LeadForwardFailed(detail),
        }
    }
}

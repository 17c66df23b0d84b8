//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConversationError`: An inbound activity cannot be tied to a conversation
//! - `TurnError`: One relay turn failed somewhere between request and reply
//! - `FeedbackError`: A feedback record could not be stored

use std::fmt;

/// Errors from deriving conversation identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A field needed to identify the conversation is missing.
    MissingField { field: &'static str },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "activity is missing {field}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

/// Errors from a single relay turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The request could not be built from the activity.
    InvalidActivity { reason: String },
    /// The support API call failed.
    Upstream { reason: String },
    /// The reply could not be delivered.
    Delivery { reason: String },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidActivity { reason } => write!(f, "invalid activity: {reason}"),
            Self::Upstream { reason } => write!(f, "relay failed: {reason}"),
            Self::Delivery { reason } => write!(f, "reply delivery failed: {reason}"),
        }
    }
}

impl std::error::Error for TurnError {}

/// Errors from feedback storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// The sink refused or lost the record.
    StoreFailed { reason: String },
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { reason } => write!(f, "feedback storage failed: {reason}"),
        }
    }
}

impl std::error::Error for FeedbackError {}

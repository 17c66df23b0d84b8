//! Error types for the channel crate.

use std::fmt;

/// Errors from delivering a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The inbound activity lacks a field needed to address the reply.
    MissingField { field: &'static str },
    /// The service URL is not a usable base URL.
    InvalidServiceUrl { reason: String },
    /// No token could be obtained for the platform.
    Credential { reason: String },
    /// The platform could not be reached.
    RequestFailed { reason: String },
    /// The platform rejected the reply.
    Rejected { status: u16, body: String },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "cannot address reply: activity has no {field}")
            }
            Self::InvalidServiceUrl { reason } => {
                write!(f, "invalid service url: {reason}")
            }
            Self::Credential { reason } => {
                write!(f, "could not authenticate to platform: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "reply delivery failed: {reason}")
            }
            Self::Rejected { status, body } => {
                write!(f, "platform rejected reply with HTTP {status}: {body}")
            }
        }
    }
}

impl std::error::Error for SendError {}

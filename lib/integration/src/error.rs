//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CredentialError`: Errors from token acquisition
//! - `UpstreamError`: Errors from the support API round trip

use std::fmt;

/// Errors from token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No client id is configured, so no managed identity can be resolved.
    MissingClientId,
    /// The requested scopes cannot be served by this provider.
    Unsupported { reason: String },
    /// The token endpoint could not be reached or rejected the request.
    RequestFailed { reason: String },
    /// The token endpoint answered with something that is not a token.
    InvalidResponse { reason: String },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClientId => {
                write!(f, "no client id configured for managed identity")
            }
            Self::Unsupported { reason } => {
                write!(f, "unsupported token request: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "token request failed: {reason}")
            }
            Self::InvalidResponse { reason } => {
                write!(f, "invalid token response: {reason}")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

/// Errors from the support API relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The request never produced a response.
    Network { reason: String },
    /// The configured timeout elapsed before a response arrived.
    Timeout,
    /// The service answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body was missing or not the expected JSON shape.
    MalformedBody { reason: String },
    /// A bearer token for the call could not be obtained.
    Credential { reason: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "support API unreachable: {reason}"),
            Self::Timeout => write!(f, "support API request timed out"),
            Self::Status { status, body } => {
                write!(f, "support API returned HTTP {status}: {body}")
            }
            Self::MalformedBody { reason } => {
                write!(f, "malformed support API response: {reason}")
            }
            Self::Credential { reason } => {
                write!(f, "could not authenticate to support API: {reason}")
            }
        }
    }
}

impl std::error::Error for UpstreamError {}

//! Outbound integrations for deskbridge.
//!
//! This crate provides:
//!
//! - **Credential providers**: Bearer tokens for authenticated outbound calls
//! - **Relay client**: The request/response round trip to the support API

pub mod credential;
pub mod error;
pub mod relay;

pub use credential::{
    AccessToken, CredentialProvider, ManagedIdentityCredential, StaticCredential,
};
pub use error::{CredentialError, UpstreamError};
pub use relay::{HttpRelayClient, RelayClient, RelayConfig, RelayRequest, RelayResponse};

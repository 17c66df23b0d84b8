//! Bearer token acquisition for outbound authenticated calls.
//!
//! Token issuance itself is opaque to the relay: callers ask a
//! [`CredentialProvider`] for a token covering some scopes and attach it.
//! Tokens are never written to logs.

use crate::error::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rootcause::Report;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default instance metadata token endpoint.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";

/// Supplies bearer tokens on demand.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a bearer token valid for `scopes`, optionally within a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if no identity can be resolved or the token
    /// endpoint fails.
    async fn get_token(
        &self,
        scopes: &[&str],
        tenant_id: Option<&str>,
    ) -> Result<String, Report<CredentialError>>;
}

/// An access token with its expiry.
#[derive(Clone)]
pub struct AccessToken {
    /// The raw bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Returns true if the token expires within five minutes.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A provider that always hands out the same token.
#[derive(Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    /// Creates a provider returning `token` for every request.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _tenant_id: Option<&str>,
    ) -> Result<String, Report<CredentialError>> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    resource: String,
    tenant_id: Option<String>,
}

/// Token response from the instance metadata endpoint.
#[derive(Deserialize)]
struct ImdsTokenResponse {
    access_token: String,
    expires_on: ExpiresOn,
}

/// IMDS reports `expires_on` as a string of epoch seconds; some emulators
/// send a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresOn {
    Text(String),
    Number(i64),
}

impl ExpiresOn {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = match self {
            Self::Text(s) => s.trim().parse().ok()?,
            Self::Number(n) => *n,
        };
        DateTime::from_timestamp(secs, 0)
    }
}

/// User-assigned managed identity credential.
///
/// Tokens are cached per resource and tenant until they are within five
/// minutes of expiry.
pub struct ManagedIdentityCredential {
    client_id: Option<String>,
    endpoint: String,
    http: reqwest::Client,
    cache: Mutex<HashMap<CacheKey, AccessToken>>,
}

impl ManagedIdentityCredential {
    /// Creates a credential for the given client id using the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(client_id: Option<String>) -> Result<Self, Report<CredentialError>> {
        Self::with_endpoint(client_id, DEFAULT_IDENTITY_ENDPOINT)
    }

    /// Creates a credential that talks to a specific token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn with_endpoint(
        client_id: Option<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, Report<CredentialError>> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()
            .map_err(|e| CredentialError::RequestFailed {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client_id: client_id.filter(|id| !id.trim().is_empty()),
            endpoint: endpoint.into(),
            http,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Maps scopes onto the single resource the metadata endpoint accepts.
    fn resource_for(scopes: &[&str]) -> Result<String, CredentialError> {
        match scopes {
            [scope] => Ok(scope
                .strip_suffix("/.default")
                .unwrap_or(scope)
                .to_string()),
            [] => Err(CredentialError::Unsupported {
                reason: "at least one scope is required".to_string(),
            }),
            _ => Err(CredentialError::Unsupported {
                reason: format!("expected a single scope, got {}", scopes.len()),
            }),
        }
    }

    async fn fetch(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<AccessToken, Report<CredentialError>> {
        let response = self
            .http
            .get(&self.endpoint)
            .header("Metadata", "true")
            .query(&[
                ("api-version", IMDS_API_VERSION),
                ("resource", resource),
                ("client_id", client_id),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::RequestFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::RequestFailed {
                reason: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let parsed: ImdsTokenResponse =
            response
                .json()
                .await
                .map_err(|e| CredentialError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        let expires_at =
            parsed
                .expires_on
                .to_datetime()
                .ok_or_else(|| CredentialError::InvalidResponse {
                    reason: "unreadable expires_on".to_string(),
                })?;

        Ok(AccessToken {
            token: parsed.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl CredentialProvider for ManagedIdentityCredential {
    async fn get_token(
        &self,
        scopes: &[&str],
        tenant_id: Option<&str>,
    ) -> Result<String, Report<CredentialError>> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(CredentialError::MissingClientId)?;
        let resource = Self::resource_for(scopes)?;
        let key = CacheKey {
            resource: resource.clone(),
            tenant_id: tenant_id.map(str::to_string),
        };

        if let Some(cached) = self.cache.lock().await.get(&key)
            && !cached.needs_refresh()
        {
            return Ok(cached.token.clone());
        }

        debug!(resource = %resource, tenant_id = ?tenant_id, "fetching managed identity token");
        let token = self.fetch(client_id, &resource).await?;
        let raw = token.token.clone();
        self.cache.lock().await.insert(key, token);
        Ok(raw)
    }
}

//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use a double underscore, e.g. `RELAY__BASE_URL`.

use deskbridge_channel::DEFAULT_CONNECTOR_SCOPE;
use deskbridge_conversation::IdentityPolicy;
use deskbridge_integration::RelayConfig;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// App type that switches reply authentication to managed identity.
const MANAGED_IDENTITY_APP_TYPE: &str = "UserAssignedMsi";

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Path of the instructions file read at startup.
    #[serde(default = "default_instructions_path")]
    pub instructions_path: PathBuf,

    /// Support API settings.
    pub relay: RelaySettings,

    /// Platform connector settings.
    #[serde(default)]
    pub bot: BotConfig,
}

/// Support API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Base URL of the support API.
    pub base_url: String,

    /// Request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Scope of the bearer token sent to the support API, if any.
    #[serde(default)]
    pub token_scope: Option<String>,

    /// How identity fields of relay requests are filled.
    #[serde(default)]
    pub identity_policy: IdentityPolicy,
}

impl RelaySettings {
    /// Returns the relay client configuration.
    #[must_use]
    pub fn client_config(&self) -> RelayConfig {
        RelayConfig {
            base_url: self.base_url.clone(),
            timeout_seconds: self.timeout_seconds,
            token_scope: self.token_scope.clone(),
        }
    }
}

/// Platform connector settings.
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    /// Deployment app type; `UserAssignedMsi` enables managed identity.
    #[serde(default)]
    pub app_type: Option<String>,

    /// Client id of the user-assigned managed identity.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Scope of tokens presented to the connector.
    #[serde(default = "default_connector_scope")]
    pub scope: String,

    /// Overrides the managed identity token endpoint.
    #[serde(default)]
    pub identity_endpoint: Option<String>,

    /// Fixed connector token, used when managed identity is off.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl BotConfig {
    /// Returns true when replies authenticate through managed identity.
    #[must_use]
    pub fn uses_managed_identity(&self) -> bool {
        self.app_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(MANAGED_IDENTITY_APP_TYPE))
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("app_type", &self.app_type)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            app_type: None,
            client_id: None,
            scope: default_connector_scope(),
            identity_endpoint: None,
            access_token: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3978))
}

fn default_instructions_path() -> PathBuf {
    PathBuf::from("instructions.txt")
}

fn default_connector_scope() -> String {
    DEFAULT_CONNECTOR_SCOPE.to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

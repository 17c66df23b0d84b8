//! Relay client for the external support API.
//!
//! One relay is one `POST <base>/support` round trip. The client never
//! retries; retry policy, if any, belongs to the caller.

use crate::credential::CredentialProvider;
use crate::error::UpstreamError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Request body sent to the support API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// The user's message text.
    pub user_request: String,
    /// The user's email, or empty.
    pub user_email: String,
    /// Server-side thread to resume, or empty for a new one.
    pub thread_id: String,
}

impl RelayRequest {
    /// Creates a request with empty identity fields.
    #[must_use]
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            user_email: String::new(),
            thread_id: String::new(),
        }
    }

    /// Sets the user email.
    #[must_use]
    pub fn with_user_email(mut self, user_email: impl Into<String>) -> Self {
        self.user_email = user_email.into();
        self
    }

    /// Sets the thread id to resume.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }
}

/// Response body returned by the support API.
///
/// Extra fields the service sends (tool usage, run status) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    /// Server-side thread the reply belongs to.
    #[serde(default)]
    pub thread_id: String,
    /// The generated reply text.
    pub response: String,
}

/// Performs relay round trips.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Sends one request and returns the parsed response.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or a
    /// missing/malformed body.
    async fn relay(&self, request: &RelayRequest) -> Result<RelayResponse, Report<UpstreamError>>;
}

/// Configuration for the HTTP relay client.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the support API; `/support` is appended.
    pub base_url: String,
    /// Request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Scope to request a bearer token for. Unset means no auth header.
    #[serde(default)]
    pub token_scope: Option<String>,
}

impl RelayConfig {
    /// Creates a configuration with no timeout and no authentication.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: None,
            token_scope: None,
        }
    }

    /// Returns the full support endpoint URL.
    #[must_use]
    pub fn support_url(&self) -> String {
        format!("{}/support", self.base_url.trim_end_matches('/'))
    }
}

/// `reqwest`-backed relay client.
pub struct HttpRelayClient {
    http: reqwest::Client,
    support_url: String,
    token_scope: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl HttpRelayClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &RelayConfig) -> Result<Self, Report<UpstreamError>> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| UpstreamError::Network {
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            support_url: config.support_url(),
            token_scope: config.token_scope.clone(),
            credentials: None,
        })
    }

    /// Attaches a credential provider used when a token scope is configured.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    async fn bearer_token(&self) -> Result<Option<String>, Report<UpstreamError>> {
        let (Some(scope), Some(credentials)) = (&self.token_scope, &self.credentials) else {
            return Ok(None);
        };
        let token = credentials
            .get_token(&[scope.as_str()], None)
            .await
            .map_err(|report| UpstreamError::Credential {
                reason: report.to_string(),
            })?;
        Ok(Some(token))
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    #[instrument(skip_all, fields(url = %self.support_url))]
    async fn relay(&self, request: &RelayRequest) -> Result<RelayResponse, Report<UpstreamError>> {
        let mut builder = self.http.post(&self.support_url).json(request);
        if let Some(token) = self.bearer_token().await? {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "support API request failed");
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Network {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::MalformedBody {
                    reason: e.to_string(),
                }
            }
        })?;
        let parsed: RelayResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::MalformedBody {
                reason: e.to_string(),
            })?;

        debug!(thread_id = %parsed.thread_id, "support API replied");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;
    use crate::test_support::serve;
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    async fn echo_support(
        headers: HeaderMap,
        Json(request): Json<RelayRequest>,
    ) -> Json<serde_json::Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        Json(serde_json::json!({
            "thread_id": "t1",
            "response": format!("echo: {}", request.user_request),
            "auth": auth,
            "run_status": "completed",
        }))
    }

    #[test]
    fn support_url_trims_trailing_slash() {
        let config = RelayConfig::new("http://desk.local/");
        assert_eq!(config.support_url(), "http://desk.local/support");
    }

    #[test]
    fn request_serializes_all_fields() {
        let request = RelayRequest::new("hello");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_request": "hello", "user_email": "", "thread_id": ""})
        );
    }

    #[test]
    fn response_ignores_extra_fields() {
        let parsed: RelayResponse = serde_json::from_str(
            r#"{"thread_id":"t9","response":"ok","tools_used":{"policy_guard":true}}"#,
        )
        .unwrap();
        assert_eq!(parsed.thread_id, "t9");
        assert_eq!(parsed.response, "ok");
    }

    #[tokio::test]
    async fn relays_request_and_parses_response() {
        let base = serve(Router::new().route("/support", post(echo_support))).await;
        let client = HttpRelayClient::new(&RelayConfig::new(base)).unwrap();

        let response = client.relay(&RelayRequest::new("hello")).await.unwrap();

        assert_eq!(response.thread_id, "t1");
        assert_eq!(response.response, "echo: hello");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/support",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "orchestrator down") }),
        );
        let base = serve(app).await;
        let client = HttpRelayClient::new(&RelayConfig::new(base)).unwrap();

        let err = client.relay(&RelayRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn missing_response_field_is_malformed() {
        let app = Router::new().route(
            "/support",
            post(|| async { Json(serde_json::json!({"thread_id": "t1"})) }),
        );
        let base = serve(app).await;
        let client = HttpRelayClient::new(&RelayConfig::new(base)).unwrap();

        let err = client.relay(&RelayRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let app = Router::new().route(
            "/support",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(app).await;
        let mut config = RelayConfig::new(base);
        config.timeout_seconds = Some(1);
        let client = HttpRelayClient::new(&config).unwrap();

        let err = client.relay(&RelayRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let client = HttpRelayClient::new(&RelayConfig::new("http://127.0.0.1:1")).unwrap();
        let err = client.relay(&RelayRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[tokio::test]
    async fn no_auth_header_without_scope() {
        let app = Router::new().route(
            "/support",
            post(|headers: HeaderMap| async move {
                let has_auth = headers.contains_key("authorization");
                Json(serde_json::json!({"thread_id": "", "response": has_auth.to_string()}))
            }),
        );
        let base = serve(app).await;
        let client = HttpRelayClient::new(&RelayConfig::new(base))
            .unwrap()
            .with_credentials(Arc::new(StaticCredential::new("tok")));

        let response = client.relay(&RelayRequest::new("hi")).await.unwrap();
        assert_eq!(response.response, "false");
    }

    #[tokio::test]
    async fn bearer_token_attached_when_scope_configured() {
        let app = Router::new().route(
            "/support",
            post(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(serde_json::json!({"thread_id": "", "response": auth}))
            }),
        );
        let base = serve(app).await;
        let mut config = RelayConfig::new(base);
        config.token_scope = Some("api://support/.default".to_string());
        let client = HttpRelayClient::new(&config)
            .unwrap()
            .with_credentials(Arc::new(StaticCredential::new("tok")));

        let response = client.relay(&RelayRequest::new("hi")).await.unwrap();
        assert_eq!(response.response, "Bearer tok");
    }
}

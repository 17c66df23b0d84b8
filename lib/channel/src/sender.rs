//! Reply delivery back to the originating conversation.

use crate::activity::{Activity, ReplyActivity};
use crate::error::SendError;
use async_trait::async_trait;
use deskbridge_integration::CredentialProvider;
use rootcause::Report;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

/// Default scope for tokens presented to the platform connector.
pub const DEFAULT_CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Sends replies into a conversation.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Sends `reply` into the conversation `inbound` came from.
    ///
    /// Returns the platform id of the created activity when the platform
    /// reports one.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be addressed or delivered.
    async fn send(
        &self,
        inbound: &Activity,
        reply: ReplyActivity,
    ) -> Result<Option<String>, Report<SendError>>;
}

#[derive(Deserialize)]
struct ResourceResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Posts replies to the platform connector REST API.
pub struct ConnectorReplySender {
    http: reqwest::Client,
    credentials: Option<Arc<dyn CredentialProvider>>,
    scope: String,
}

impl ConnectorReplySender {
    /// Creates a sender authenticating with `credentials` for `scope`.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>, scope: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: Some(credentials),
            scope: scope.into(),
        }
    }

    /// Creates a sender that posts without an `Authorization` header.
    ///
    /// Only local emulators accept unauthenticated replies.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: None,
            scope: String::new(),
        }
    }

    /// Builds `{serviceUrl}/v3/conversations/{id}/activities[/{replyToId}]`.
    fn activities_url(inbound: &Activity) -> Result<reqwest::Url, SendError> {
        let service_url = inbound
            .service_url
            .as_deref()
            .ok_or(SendError::MissingField {
                field: "serviceUrl",
            })?;
        let conversation_id = inbound
            .conversation_id()
            .ok_or(SendError::MissingField {
                field: "conversation.id",
            })?;

        let mut url =
            reqwest::Url::parse(service_url).map_err(|e| SendError::InvalidServiceUrl {
                reason: e.to_string(),
            })?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| SendError::InvalidServiceUrl {
                    reason: format!("{service_url} cannot be a base"),
                })?;
            segments
                .pop_if_empty()
                .extend(["v3", "conversations", conversation_id, "activities"]);
            if let Some(activity_id) = inbound.id.as_deref() {
                segments.push(activity_id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ReplySender for ConnectorReplySender {
    #[instrument(skip_all, fields(conversation_id = ?inbound.conversation_id()))]
    async fn send(
        &self,
        inbound: &Activity,
        reply: ReplyActivity,
    ) -> Result<Option<String>, Report<SendError>> {
        let url = Self::activities_url(inbound)?;
        let reply = reply.addressed_to(inbound);
        let mut request = self.http.post(url).json(&reply);

        if let Some(credentials) = &self.credentials {
            let token = credentials
                .get_token(&[self.scope.as_str()], inbound.tenant_id())
                .await
                .map_err(|report| SendError::Credential {
                    reason: report.to_string(),
                })?;
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let created = response
            .json::<ResourceResponse>()
            .await
            .ok()
            .and_then(|r| r.id);
        debug!(activity_id = ?created, "reply delivered");
        Ok(created)
    }
}

/// A sender that records replies in memory instead of delivering them.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentReply>>,
    fail: bool,
}

/// A reply captured by [`RecordingSender`].
#[derive(Debug, Clone)]
pub struct SentReply {
    /// Conversation the reply was sent into.
    pub conversation_id: Option<String>,
    /// The reply itself.
    pub reply: ReplyActivity,
}

impl RecordingSender {
    /// Creates a sender that accepts every reply.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sender that records each reply and then reports failure.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns everything sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentReply> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the text of everything sent so far, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.reply.text).collect()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send(
        &self,
        inbound: &Activity,
        reply: ReplyActivity,
    ) -> Result<Option<String>, Report<SendError>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentReply {
                conversation_id: inbound.conversation_id().map(str::to_string),
                reply,
            });
        if self.fail {
            return Err(SendError::RequestFailed {
                reason: "recording sender configured to fail".to_string(),
            }
            .into());
        }
        Ok(None)
    }
}

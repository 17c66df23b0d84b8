//! Per-event conversation handling.
//!
//! Each inbound message is processed on its own:
//! 1. Derive the conversation key from the activity
//! 2. Build a relay request from the message text
//! 3. Relay it to the support API
//! 4. Send the reply, then record the exchange in history
//!
//! Any failure in steps 1-4 sends the fixed fallback messages instead and
//! leaves history untouched. Nothing is retried.

use crate::error::TurnError;
use crate::history::HistoryStore;
use crate::key::ConversationKey;
use crate::message::Message;
use deskbridge_channel::{Activity, ReplyActivity, ReplySender};
use deskbridge_integration::{RelayClient, RelayRequest};
use rootcause::Report;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Messages sent, in order, when a turn fails.
pub const FALLBACK_MESSAGES: [&str; 2] = [
    "The agent encountered an error or bug.",
    "To continue to run this agent, please fix the agent source code.",
];

/// Email sent under [`IdentityPolicy::Forward`] when the sender has no id.
const UNKNOWN_EMAIL: &str = "unknown@example.com";

/// How identity fields of the relay request are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Send empty `user_email` and `thread_id`; never remember the returned thread.
    #[default]
    Blank,
    /// Send the sender id as `user_email` and resume the last returned thread.
    Forward,
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The reply was delivered and the exchange recorded.
    Replied {
        /// Platform id of the delivered reply, when reported.
        activity_id: Option<String>,
        /// Thread the support API answered on.
        thread_id: String,
    },
    /// The turn failed and the fallback messages were sent.
    Failed,
}

/// Relays inbound messages to the support API and replies with the result.
pub struct ConversationHandler {
    history: Arc<HistoryStore>,
    relay: Arc<dyn RelayClient>,
    sender: Arc<dyn ReplySender>,
    identity_policy: IdentityPolicy,
}

impl ConversationHandler {
    /// Creates a handler using the [`IdentityPolicy::Blank`] policy.
    #[must_use]
    pub fn new(
        history: Arc<HistoryStore>,
        relay: Arc<dyn RelayClient>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            history,
            relay,
            sender,
            identity_policy: IdentityPolicy::default(),
        }
    }

    /// Sets how identity fields of relay requests are filled.
    #[must_use]
    pub fn with_identity_policy(mut self, identity_policy: IdentityPolicy) -> Self {
        self.identity_policy = identity_policy;
        self
    }

    /// Returns how identity fields of relay requests are filled.
    #[must_use]
    pub fn identity_policy(&self) -> IdentityPolicy {
        self.identity_policy
    }

    /// Returns the history store this handler writes to.
    #[must_use]
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Handles one inbound message activity.
    ///
    /// Never fails: errors are logged and answered with [`FALLBACK_MESSAGES`].
    #[instrument(
        skip_all,
        fields(conversation_id = ?activity.conversation_id(), from_id = ?activity.from_id())
    )]
    pub async fn handle(&self, activity: &Activity) -> EventOutcome {
        match self.process_turn(activity).await {
            Ok(outcome) => outcome,
            Err(report) => {
                error!(error = %report, "message relay failed");
                self.send_fallback(activity).await;
                EventOutcome::Failed
            }
        }
    }

    async fn process_turn(&self, activity: &Activity) -> Result<EventOutcome, Report<TurnError>> {
        let key = ConversationKey::from_activity(activity).map_err(|e| {
            TurnError::InvalidActivity {
                reason: e.to_string(),
            }
        })?;
        let text = activity
            .text
            .as_deref()
            .ok_or_else(|| TurnError::InvalidActivity {
                reason: "activity is missing text".to_string(),
            })?;

        let prior = self.history.get(&key);
        debug!(conversation_key = %key, prior_messages = prior.len(), "relaying message");

        let request = self.build_request(&key, text);
        let response = self
            .relay
            .relay(&request)
            .await
            .map_err(|report| TurnError::Upstream {
                reason: report.to_string(),
            })?;

        let reply = ReplyActivity::text(response.response.clone())
            .add_ai_generated()
            .add_feedback();
        let activity_id = self
            .sender
            .send(activity, reply)
            .await
            .map_err(|report| TurnError::Delivery {
                reason: report.to_string(),
            })?;

        self.history.append_exchange(
            &key,
            Message::user(text),
            Message::assistant(response.response),
        );
        if self.identity_policy == IdentityPolicy::Forward && !response.thread_id.is_empty() {
            self.history.set_upstream_thread(&key, response.thread_id.clone());
        }

        info!(
            conversation_key = %key,
            thread_id = %response.thread_id,
            "replied to message"
        );
        Ok(EventOutcome::Replied {
            activity_id,
            thread_id: response.thread_id,
        })
    }

    fn build_request(&self, key: &ConversationKey, text: &str) -> RelayRequest {
        let request = RelayRequest::new(text);
        match self.identity_policy {
            IdentityPolicy::Blank => request,
            IdentityPolicy::Forward => {
                let email = if key.participant_id().is_empty() {
                    UNKNOWN_EMAIL
                } else {
                    key.participant_id()
                };
                request
                    .with_user_email(email)
                    .with_thread_id(self.history.upstream_thread(key).unwrap_or_default())
            }
        }
    }

    async fn send_fallback(&self, activity: &Activity) {
        for text in FALLBACK_MESSAGES {
            if let Err(report) = self.sender.send(activity, ReplyActivity::text(text)).await {
                warn!(error = %report, "failed to deliver fallback message");
            }
        }
    }
}

//! Feedback on delivered replies.
//!
//! Feedback is recorded as received. It never reads or writes conversation
//! history and never calls the support API.

use crate::error::FeedbackError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deskbridge_channel::Activity;
use deskbridge_core::{FeedbackId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, instrument, warn};

/// One feedback submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique identifier.
    pub id: FeedbackId,
    /// Platform id of the reply the feedback is about.
    pub reply_to: Option<String>,
    /// Conversation the feedback came from.
    pub conversation_id: Option<String>,
    /// Who submitted it.
    pub user_id: Option<String>,
    /// The invoke `value` exactly as the platform sent it.
    pub raw_value: JsonValue,
    /// The `actionValue` part of the invoke value, or the whole value without one.
    pub payload: JsonValue,
    /// When it was received.
    pub received_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Builds a record from a feedback activity.
    #[must_use]
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: FeedbackId::new(),
            reply_to: activity.reply_to_id.clone(),
            conversation_id: activity.conversation_id().map(str::to_string),
            user_id: activity.from_id().map(str::to_string),
            raw_value: activity.value.clone().unwrap_or(JsonValue::Null),
            payload: activity
                .feedback_payload()
                .cloned()
                .unwrap_or(JsonValue::Null),
            received_at: Utc::now(),
        }
    }
}

/// Destination for feedback records.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Stores one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be stored.
    async fn record(&self, record: FeedbackRecord) -> Result<(), FeedbackError>;
}

/// Keeps feedback records in memory.
#[derive(Debug, Default)]
pub struct InMemoryFeedbackSink {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<FeedbackRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FeedbackSink for InMemoryFeedbackSink {
    async fn record(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

/// Logs feedback submissions and forwards them to an optional sink.
#[derive(Default)]
pub struct FeedbackHandler {
    sink: Option<Arc<dyn FeedbackSink>>,
}

impl FeedbackHandler {
    /// Creates a handler that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forwards every record to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn FeedbackSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns true when records are forwarded to a sink.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Handles one feedback activity.
    ///
    /// Sink failures are logged and otherwise ignored.
    #[instrument(skip_all, fields(conversation_id = ?activity.conversation_id()))]
    pub async fn handle(&self, activity: &Activity) -> FeedbackRecord {
        let record = FeedbackRecord::from_activity(activity);
        info!(
            feedback_id = %record.id,
            reply_to = ?record.reply_to,
            raw_value = %record.raw_value,
            "feedback received"
        );

        if let Some(sink) = &self.sink
            && let Err(report) = sink.record(record.clone()).await
        {
            warn!(feedback_id = %record.id, error = %report, "failed to store feedback");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbridge_channel::ActivityType;
    use serde_json::json;

    struct FailingSink;

    #[async_trait]
    impl FeedbackSink for FailingSink {
        async fn record(&self, _record: FeedbackRecord) -> Result<(), FeedbackError> {
            Err(FeedbackError::StoreFailed {
                reason: "disk full".to_string(),
            }
            .into())
        }
    }

    fn feedback_activity(value: JsonValue) -> Activity {
        let mut activity = Activity::message("c1", "u1", "");
        activity.activity_type = ActivityType::Invoke;
        activity.text = None;
        activity.name = Some("message/submitAction".to_string());
        activity.reply_to_id = Some("reply-1".to_string());
        activity.value = Some(value);
        activity
    }

    #[tokio::test]
    async fn records_payload_as_received() {
        let sink = Arc::new(InMemoryFeedbackSink::new());
        let handler = FeedbackHandler::new().with_sink(sink.clone());
        let activity = feedback_activity(json!({
            "actionName": "feedback",
            "actionValue": { "reaction": "like", "feedback": "{\"feedbackText\":\"great\"}" }
        }));

        let record = handler.handle(&activity).await;

        assert_eq!(
            record.payload,
            json!({ "reaction": "like", "feedback": "{\"feedbackText\":\"great\"}" })
        );
        assert_eq!(record.reply_to.as_deref(), Some("reply-1"));
        assert_eq!(record.conversation_id.as_deref(), Some("c1"));
        assert_eq!(record.user_id.as_deref(), Some("u1"));

        assert_eq!(record.raw_value, activity.value.clone().unwrap());

        let stored = sink.records();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
    }

    #[tokio::test]
    async fn payload_without_action_value_is_kept_whole() {
        let handler = FeedbackHandler::new();
        let value = json!({ "actionName": "feedback", "rating": 3 });

        let record = handler.handle(&feedback_activity(value.clone())).await;

        assert_eq!(record.payload, value);
        assert_eq!(record.raw_value, value);
    }

    #[tokio::test]
    async fn raw_value_keeps_sibling_fields() {
        let value = json!({
            "actionName": "feedback",
            "actionValue": { "reaction": "dislike" },
            "source": "thumbs"
        });

        let record = FeedbackHandler::new()
            .handle(&feedback_activity(value.clone()))
            .await;

        assert_eq!(record.raw_value, value);
        assert_eq!(record.payload, json!({ "reaction": "dislike" }));
    }

    #[test]
    fn handler_without_sink_only_logs() {
        assert!(!FeedbackHandler::new().has_sink());
        assert!(
            FeedbackHandler::new()
                .with_sink(Arc::new(InMemoryFeedbackSink::new()))
                .has_sink()
        );
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let handler = FeedbackHandler::new().with_sink(Arc::new(FailingSink));

        let record = handler
            .handle(&feedback_activity(json!({ "actionName": "feedback" })))
            .await;

        assert_eq!(record.user_id.as_deref(), Some("u1"));
    }
}

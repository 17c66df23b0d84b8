//! Activity payloads exchanged with the messaging platform.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! platform payload is ignored on the way in.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Invoke name the platform uses for message action submissions.
pub const SUBMIT_ACTION_INVOKE: &str = "message/submitAction";

/// The kind of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    /// A chat message.
    Message,
    /// A synchronous invoke (card actions, feedback submissions).
    Invoke,
    /// Membership or conversation metadata changed.
    ConversationUpdate,
    /// Anything else the platform sends.
    #[serde(other)]
    Other,
}

/// A user or bot on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    /// Platform id of the account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Directory object id, when the platform provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    /// Platform id of the conversation.
    pub id: String,
    /// Tenant the conversation lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// An inbound activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity kind.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Platform id of this activity.
    #[serde(default)]
    pub id: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
    /// Sender.
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    /// Receiving bot.
    #[serde(default)]
    pub recipient: Option<ChannelAccount>,
    /// Conversation.
    #[serde(default)]
    pub conversation: Option<ConversationAccount>,
    /// Base URL replies must be posted to.
    #[serde(default)]
    pub service_url: Option<String>,
    /// Channel name (e.g. "msteams").
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Invoke name.
    #[serde(default)]
    pub name: Option<String>,
    /// Invoke or card payload.
    #[serde(default)]
    pub value: Option<JsonValue>,
    /// Activity this one replies to.
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

impl Activity {
    /// Creates a message activity.
    #[must_use]
    pub fn message(
        conversation_id: impl Into<String>,
        from_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            activity_type: ActivityType::Message,
            id: None,
            text: Some(text.into()),
            from: Some(ChannelAccount {
                id: Some(from_id.into()),
                name: None,
                aad_object_id: None,
            }),
            recipient: None,
            conversation: Some(ConversationAccount {
                id: conversation_id.into(),
                tenant_id: None,
            }),
            service_url: None,
            channel_id: None,
            name: None,
            value: None,
            reply_to_id: None,
        }
    }

    /// Returns the conversation id, if present.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    /// Returns the sender id, if present.
    #[must_use]
    pub fn from_id(&self) -> Option<&str> {
        self.from.as_ref().and_then(|f| f.id.as_deref())
    }

    /// Returns the tenant id, if present.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .and_then(|c| c.tenant_id.as_deref())
    }

    /// Returns true if this is a feedback submission on an earlier reply.
    #[must_use]
    pub fn is_feedback(&self) -> bool {
        self.activity_type == ActivityType::Invoke
            && self.name.as_deref() == Some(SUBMIT_ACTION_INVOKE)
            && self
                .value
                .as_ref()
                .and_then(|v| v.get("actionName"))
                .and_then(JsonValue::as_str)
                == Some("feedback")
    }

    /// Returns the feedback payload of a feedback submission.
    ///
    /// Falls back to the whole `value` when it has no `actionValue`.
    #[must_use]
    pub fn feedback_payload(&self) -> Option<&JsonValue> {
        let value = self.value.as_ref()?;
        Some(value.get("actionValue").unwrap_or(value))
    }
}

/// An outbound message activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyActivity {
    #[serde(rename = "type")]
    activity_type: ActivityType,
    /// Reply text.
    pub text: String,
    /// Activity being replied to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// The bot sending the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    /// The user receiving the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    /// Target conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    /// Schema.org entities attached to the message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<JsonValue>,
    /// Channel-specific data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<JsonValue>,
}

impl ReplyActivity {
    /// Creates a plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::Message,
            text: text.into(),
            reply_to_id: None,
            from: None,
            recipient: None,
            conversation: None,
            entities: Vec::new(),
            channel_data: None,
        }
    }

    /// Marks the reply as AI-generated content.
    #[must_use]
    pub fn add_ai_generated(mut self) -> Self {
        if !self.is_ai_generated() {
            self.entities.push(serde_json::json!({
                "type": "https://schema.org/Message",
                "@type": "Message",
                "@context": "https://schema.org",
                "@id": "",
                "additionalType": ["AIGeneratedContent"],
            }));
        }
        self
    }

    /// Enables the feedback buttons on the reply.
    #[must_use]
    pub fn add_feedback(mut self) -> Self {
        let mut data = self
            .channel_data
            .take()
            .unwrap_or_else(|| serde_json::json!({}));
        if let Some(map) = data.as_object_mut() {
            map.insert("feedbackLoopEnabled".to_string(), JsonValue::Bool(true));
        }
        self.channel_data = Some(data);
        self
    }

    /// Addresses the reply to the sender of `inbound`.
    #[must_use]
    pub fn addressed_to(mut self, inbound: &Activity) -> Self {
        self.reply_to_id = inbound.id.clone();
        self.from = inbound.recipient.clone();
        self.recipient = inbound.from.clone();
        self.conversation = inbound.conversation.clone();
        self
    }

    /// Returns true if the reply carries the AI-generated marker.
    #[must_use]
    pub fn is_ai_generated(&self) -> bool {
        self.entities.iter().any(|entity| {
            entity
                .get("additionalType")
                .and_then(JsonValue::as_array)
                .is_some_and(|types| types.iter().any(|t| t == "AIGeneratedContent"))
        })
    }

    /// Returns true if feedback collection is enabled.
    #[must_use]
    pub fn is_feedback_enabled(&self) -> bool {
        self.channel_data
            .as_ref()
            .and_then(|d| d.get("feedbackLoopEnabled"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_message() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "type": "message",
            "id": "1700000000000",
            "text": "hello",
            "from": {"id": "29:abc", "name": "Ana", "aadObjectId": "oid-1"},
            "recipient": {"id": "28:bot"},
            "conversation": {"id": "a:conv", "tenantId": "tenant-1"},
            "serviceUrl": "https://smba.trafficmanager.net/emea/",
            "channelId": "msteams",
            "locale": "es-ES"
        }))
        .unwrap();

        assert_eq!(activity.activity_type, ActivityType::Message);
        assert_eq!(activity.conversation_id(), Some("a:conv"));
        assert_eq!(activity.from_id(), Some("29:abc"));
        assert_eq!(activity.tenant_id(), Some("tenant-1"));
        assert_eq!(activity.text.as_deref(), Some("hello"));
    }

    #[test]
    fn sender_without_id_still_parses() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "type": "message",
            "text": "hello",
            "from": {"name": "x"},
            "conversation": {"id": "c1"}
        }))
        .unwrap();

        assert!(activity.from.is_some());
        assert_eq!(activity.from_id(), None);
    }

    #[test]
    fn unknown_activity_type_is_other() {
        let activity: Activity =
            serde_json::from_value(serde_json::json!({"type": "typing"})).unwrap();
        assert_eq!(activity.activity_type, ActivityType::Other);
    }

    #[test]
    fn recognises_feedback_invoke() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "type": "invoke",
            "name": "message/submitAction",
            "replyToId": "reply-1",
            "value": {
                "actionName": "feedback",
                "actionValue": {"reaction": "like", "feedback": "{\"feedbackText\":\"great\"}"}
            }
        }))
        .unwrap();

        assert!(activity.is_feedback());
        assert_eq!(
            activity.feedback_payload().unwrap()["reaction"],
            serde_json::json!("like")
        );
    }

    #[test]
    fn other_invokes_are_not_feedback() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "type": "invoke",
            "name": "adaptiveCard/action",
            "value": {"actionName": "feedback"}
        }))
        .unwrap();
        assert!(!activity.is_feedback());
    }

    #[test]
    fn reply_tags() {
        let reply = ReplyActivity::text("hi there").add_ai_generated().add_feedback();

        assert!(reply.is_ai_generated());
        assert!(reply.is_feedback_enabled());

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["channelData"]["feedbackLoopEnabled"], true);
        assert_eq!(json["entities"][0]["additionalType"][0], "AIGeneratedContent");
    }

    #[test]
    fn ai_marker_added_once() {
        let reply = ReplyActivity::text("x").add_ai_generated().add_ai_generated();
        assert_eq!(reply.entities.len(), 1);
    }

    #[test]
    fn plain_reply_has_no_tags() {
        let reply = ReplyActivity::text("The agent encountered an error or bug.");
        assert!(!reply.is_ai_generated());
        assert!(!reply.is_feedback_enabled());

        let json = serde_json::to_value(&reply).unwrap();
        assert!(json.get("entities").is_none());
        assert!(json.get("channelData").is_none());
    }

    #[test]
    fn addressed_reply_swaps_parties() {
        let mut inbound = Activity::message("c1", "u1", "hello");
        inbound.id = Some("act-1".to_string());
        inbound.recipient = Some(ChannelAccount {
            id: Some("bot".to_string()),
            name: None,
            aad_object_id: None,
        });

        let reply = ReplyActivity::text("hi").addressed_to(&inbound);

        assert_eq!(reply.reply_to_id.as_deref(), Some("act-1"));
        assert_eq!(reply.from.unwrap().id.as_deref(), Some("bot"));
        assert_eq!(reply.recipient.unwrap().id.as_deref(), Some("u1"));
        assert_eq!(reply.conversation.unwrap().id, "c1");
    }
}

//! Conversation identity.

use crate::error::ConversationError;
use deskbridge_channel::Activity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one chat thread between one participant and the bot within
/// one platform conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    conversation_id: String,
    participant_id: String,
}

impl ConversationKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            participant_id: participant_id.into(),
        }
    }

    /// Derives the key from an inbound activity's conversation and sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the activity has no conversation id or no sender id.
    pub fn from_activity(activity: &Activity) -> Result<Self, ConversationError> {
        let conversation_id = activity
            .conversation_id()
            .ok_or(ConversationError::MissingField {
                field: "conversation.id",
            })?;
        let participant_id = activity.from_id().ok_or(ConversationError::MissingField {
            field: "from.id",
        })?;
        Ok(Self::new(conversation_id, participant_id))
    }

    /// Returns the platform conversation id.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the participant id.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.conversation_id, self.participant_id)
    }
}

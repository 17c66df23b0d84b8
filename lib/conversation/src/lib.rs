//! Conversation handling for deskbridge.
//!
//! This crate provides:
//!
//! - **History Store**: Per-conversation message history shared across events
//! - **Conversation Handler**: One relay round trip per inbound message
//! - **Feedback Handler**: Best-effort recording of reply feedback

pub mod error;
pub mod feedback;
pub mod handler;
pub mod history;
pub mod key;
pub mod message;

pub use error::{ConversationError, FeedbackError, TurnError};
pub use feedback::{FeedbackHandler, FeedbackRecord, FeedbackSink, InMemoryFeedbackSink};
pub use handler::{ConversationHandler, EventOutcome, FALLBACK_MESSAGES, IdentityPolicy};
pub use history::HistoryStore;
pub use key::ConversationKey;
pub use message::{Message, MessageRole};

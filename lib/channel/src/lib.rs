//! Messaging platform plumbing for deskbridge.
//!
//! This crate provides:
//!
//! - **Activities**: The inbound event payload and the outbound reply shape
//! - **Reply senders**: Delivery of replies back to the originating conversation

pub mod activity;
pub mod error;
pub mod sender;

pub use activity::{Activity, ActivityType, ChannelAccount, ConversationAccount, ReplyActivity};
pub use error::SendError;
pub use sender::{
    ConnectorReplySender, DEFAULT_CONNECTOR_SCOPE, RecordingSender, ReplySender, SentReply,
};

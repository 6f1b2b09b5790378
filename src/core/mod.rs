//! Core chat session components
//!
//! This module contains the conversation state and the send orchestration.

mod chat;
mod memory;

pub use chat::{
    ChatError, ConversationManager, ConversationSummary, PendingReply, SendOutcome,
    SessionOverview, SkipReason,
};
pub use memory::ConversationStore;

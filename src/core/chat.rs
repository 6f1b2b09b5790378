//! Conversation manager
//!
//! The ConversationManager is the authoritative state machine of a chat session. It:
//! 1. Owns the conversation set, the active pointer and the busy flag
//! 2. Appends the user's message and derives the conversation title
//! 3. Sends the filtered history to the completion backend
//! 4. Appends exactly one assistant reply to the conversation the message was sent in
//!
//! Sending is split in two: [`ConversationManager::begin_send`] does the
//! synchronous part under the lock and hands back a [`PendingReply`], whose
//! [`PendingReply::resolve`] awaits the backend. Other operations may run while
//! a reply is pending.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::prompts_builtin;
use crate::conversation::{completion_history, ChatTurn, Conversation, Message};
use crate::providers::CompletionBackend;

use super::memory::ConversationStore;

/// Errors from conversation operations
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

/// Why a send did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("message is empty")]
    EmptyContent,

    #[error("no active conversation")]
    NoActiveConversation,

    #[error("another message is awaiting a reply")]
    Busy,
}

/// What a send ended up doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The backend's text was appended
    Replied { conversation_id: String },
    /// The backend failed; the error reply was appended
    ErrorReplied { conversation_id: String },
    /// The conversation was deleted before the reply arrived
    Discarded { conversation_id: String },
    /// Nothing was appended
    Skipped { reason: SkipReason },
}

/// Listing entry for the sidebar
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            message_count: conversation.messages().len(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// Conversation list, active pointer and busy flag read together
#[derive(Debug, Clone, Serialize)]
pub struct SessionOverview {
    pub active_conversation_id: String,
    pub busy: bool,
    pub conversations: Vec<ConversationSummary>,
}

/// The conversation manager
pub struct ConversationManager {
    store: Arc<Mutex<ConversationStore>>,
    completion: Arc<dyn CompletionBackend>,
}

impl ConversationManager {
    /// Create a manager seeded with the opening conversation
    pub fn new(completion: Arc<dyn CompletionBackend>) -> Self {
        Self {
            store: Arc::new(Mutex::new(ConversationStore::new())),
            completion,
        }
    }

    /// Snapshot of every conversation in display order
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.lock().conversations().to_vec()
    }

    pub fn overview(&self) -> SessionOverview {
        let store = self.store.lock();
        SessionOverview {
            active_conversation_id: store.active_id().to_string(),
            busy: store.is_busy(),
            conversations: store
                .conversations()
                .iter()
                .map(ConversationSummary::from)
                .collect(),
        }
    }

    pub fn active_conversation_id(&self) -> String {
        self.store.lock().active_id().to_string()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.store.lock().active().cloned()
    }

    pub fn active_messages(&self) -> Vec<Message> {
        self.store
            .lock()
            .active()
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.store.lock().get(id).cloned()
    }

    /// Whether a send is awaiting its reply
    pub fn is_busy(&self) -> bool {
        self.store.lock().is_busy()
    }

    /// Create a conversation, prepend it and make it active
    pub fn create_conversation(&self) -> Conversation {
        let conversation = self.store.lock().create().clone();
        info!(conversation_id = %conversation.id, "➕ New conversation");
        conversation
    }

    /// Make `id` the active conversation.
    ///
    /// Unknown ids are rejected and leave the active conversation as it was.
    pub fn select_conversation(&self, id: &str) -> Result<(), ChatError> {
        if !self.store.lock().select(id) {
            warn!(conversation_id = %id, "Cannot select unknown conversation");
            return Err(ChatError::ConversationNotFound(id.to_string()));
        }
        debug!(conversation_id = %id, "Conversation selected");
        Ok(())
    }

    /// Delete `id`, moving the active pointer if needed
    pub fn delete_conversation(&self, id: &str) -> Result<(), ChatError> {
        let mut store = self.store.lock();
        if !store.remove(id) {
            warn!(conversation_id = %id, "Cannot delete unknown conversation");
            return Err(ChatError::ConversationNotFound(id.to_string()));
        }
        info!(
            conversation_id = %id,
            active_id = %store.active_id(),
            remaining = store.len(),
            "🗑️ Conversation deleted"
        );
        Ok(())
    }

    /// Send `content` on the active conversation and wait for the reply.
    ///
    /// The reply is resolved on its own task: dropping this future stops the
    /// wait, not the reply.
    pub async fn send_message(&self, content: &str) -> SendOutcome {
        match self.begin_send(content) {
            Ok(pending) => self.complete_send(pending).await,
            Err(reason) => SendOutcome::Skipped { reason },
        }
    }

    /// Resolve `pending` on a spawned task and wait for its outcome
    pub async fn complete_send(&self, pending: PendingReply) -> SendOutcome {
        let conversation_id = pending.conversation_id.clone();
        match tokio::spawn(pending.resolve()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The handle's drop already appended the error reply
                error!(conversation_id = %conversation_id, error = %e, "Reply task failed");
                if self.store.lock().get(&conversation_id).is_some() {
                    SendOutcome::ErrorReplied { conversation_id }
                } else {
                    SendOutcome::Discarded { conversation_id }
                }
            }
        }
    }

    /// Append the user message, title the conversation and mark the manager busy.
    ///
    /// The returned handle targets the conversation that was active here,
    /// whatever becomes active before it resolves.
    pub fn begin_send(&self, content: &str) -> Result<PendingReply, SkipReason> {
        let content = content.trim();
        if content.is_empty() {
            debug!("Ignoring empty message");
            return Err(SkipReason::EmptyContent);
        }

        let mut store = self.store.lock();
        if store.is_busy() {
            warn!("Ignoring message while a reply is pending");
            return Err(SkipReason::Busy);
        }

        let conversation_id = store.active_id().to_string();
        let Some(conversation) = store.get_mut(&conversation_id) else {
            warn!(conversation_id = %conversation_id, "Active conversation is missing");
            return Err(SkipReason::NoActiveConversation);
        };

        let first_user_message = conversation.user_message_count() == 0;
        let message = Message::user(content);
        let message_id = message.id.clone();
        conversation.push(message);
        debug!(conversation_id = %conversation_id, message_id = %message_id, "📝 User message added");

        if first_user_message && conversation.apply_first_message_title(content) {
            debug!(conversation_id = %conversation_id, title = %conversation.title, "🏷️ Title derived");
        }

        let history = completion_history(conversation.messages());
        store.set_busy(true);
        debug!(turns = history.len(), "⏳ Awaiting reply");

        Ok(PendingReply {
            store: Arc::clone(&self.store),
            completion: Arc::clone(&self.completion),
            conversation_id,
            message_id,
            history,
            resolved: false,
        })
    }
}

/// A sent message awaiting its assistant reply.
///
/// Dropping it clears the busy flag. Dropped unresolved, it appends the error
/// reply first, so the sent message never goes unanswered.
#[must_use = "the reply is only appended once the pending reply is resolved"]
pub struct PendingReply {
    store: Arc<Mutex<ConversationStore>>,
    completion: Arc<dyn CompletionBackend>,
    conversation_id: String,
    message_id: String,
    history: Vec<ChatTurn>,
    resolved: bool,
}

impl PendingReply {
    /// Conversation the reply will be appended to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Id of the user message that was sent
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// History handed to the backend
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Ask the backend and append its reply to the target conversation
    pub async fn resolve(mut self) -> SendOutcome {
        let (content, failed) = match self.completion.generate_response(&self.history).await {
            Ok(content) => (content, false),
            Err(e) => {
                error!(conversation_id = %self.conversation_id, error = %e, "❌ Completion backend failed");
                (prompts_builtin::ERROR_REPLY.to_string(), true)
            }
        };

        self.resolved = true;
        let conversation_id = self.conversation_id.clone();
        let appended = match self.store.lock().get_mut(&conversation_id) {
            Some(conversation) => {
                conversation.push(Message::assistant(content));
                true
            }
            None => false,
        };

        if !appended {
            info!(conversation_id = %conversation_id, "Conversation deleted before reply, discarding");
            SendOutcome::Discarded { conversation_id }
        } else if failed {
            debug!(conversation_id = %conversation_id, "✅ Error reply added");
            SendOutcome::ErrorReplied { conversation_id }
        } else {
            debug!(conversation_id = %conversation_id, "✅ Assistant reply added");
            SendOutcome::Replied { conversation_id }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        let mut store = self.store.lock();
        if !self.resolved {
            if let Some(conversation) = store.get_mut(&self.conversation_id) {
                warn!(conversation_id = %self.conversation_id, "Reply abandoned, appending error reply");
                conversation.push(Message::assistant(prompts_builtin::ERROR_REPLY));
            }
        }
        store.set_busy(false);
        debug!("Busy cleared");
    }
}

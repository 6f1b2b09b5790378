//! Conversation types and state management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::prompts_builtin;

/// Longest title derived from a first user message, in characters
pub const TITLE_MAX_CHARS: usize = 30;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A single message in a conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Assistant)
    }

    fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// Role of a turn sent to the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A `{role, content}` pair as the completion service sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatTurn {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.sender {
                Sender::User => Role::User,
                Sender::Assistant => Role::Assistant,
            },
            content: msg.content.clone(),
        }
    }
}

/// An append-only thread of messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn with_greetings(title: String, greetings: &[&str]) -> Self {
        let now = Utc::now();
        Self {
            id: format!("conv-{}", Uuid::new_v4()),
            title,
            messages: greetings.iter().map(|g| Message::assistant(*g)).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The conversation a fresh session opens with
    pub fn opening() -> Self {
        Self::with_greetings(
            prompts_builtin::OPENING_TITLE.to_string(),
            &[
                prompts_builtin::WELCOME_GREETING,
                prompts_builtin::INTRODUCTION_GREETING,
            ],
        )
    }

    /// A new conversation titled `Percakapan {number}` with the scripted greeting
    pub fn numbered(number: usize) -> Self {
        Self::with_greetings(
            format!("{} {}", prompts_builtin::PLACEHOLDER_TITLE_PREFIX, number),
            &[prompts_builtin::NEW_CONVERSATION_GREETING],
        )
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn user_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count()
    }

    /// Append a message and refresh `updated_at`
    pub fn push(&mut self, message: Message) {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title
            .starts_with(prompts_builtin::PLACEHOLDER_TITLE_PREFIX)
    }

    /// Replace a placeholder title with one derived from `first_user_message`.
    /// Returns whether the title changed.
    pub fn apply_first_message_title(&mut self, first_user_message: &str) -> bool {
        if !self.has_placeholder_title() {
            return false;
        }
        self.title = derive_title(first_user_message);
        true
    }
}

/// First [`TITLE_MAX_CHARS`] characters of `content`, with `...` appended when cut
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let prefix: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{prefix}...")
    } else {
        content.to_string()
    }
}

fn is_seeded_greeting(message: &Message) -> bool {
    message.sender == Sender::Assistant
        && prompts_builtin::SEEDED_GREETING_MARKERS
            .iter()
            .any(|marker| message.content.contains(marker))
}

/// History to send to the completion service: every message in order, minus the
/// scripted greetings the assistant opened the session with
pub fn completion_history(messages: &[Message]) -> Vec<ChatTurn> {
    messages
        .iter()
        .filter(|m| !is_seeded_greeting(m))
        .map(ChatTurn::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_first_message_is_truncated() {
        let content = "Aku merasa cemas akhir-akhir ini dan tidak tahu harus berbuat apa";
        let mut conversation = Conversation::numbered(2);

        assert!(conversation.apply_first_message_title(content));
        assert_eq!(conversation.title, "Aku merasa cemas akhir-akhir i...");
        assert_eq!(
            conversation.title,
            format!("{}...", content.chars().take(30).collect::<String>())
        );
    }

    #[test]
    fn test_short_first_message_is_kept() {
        let mut conversation = Conversation::numbered(1);
        conversation.apply_first_message_title("Halo");
        assert_eq!(conversation.title, "Halo");
    }

    #[test]
    fn test_exactly_thirty_chars_has_no_marker() {
        let content = "a".repeat(30);
        assert_eq!(derive_title(&content), content);
        assert_eq!(derive_title(&"a".repeat(31)), format!("{}...", "a".repeat(30)));
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let content = "é".repeat(40);
        assert_eq!(derive_title(&content), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_custom_title_is_not_clobbered() {
        let mut conversation = Conversation::numbered(1);
        conversation.title = "Rencana minggu ini".to_string();

        assert!(!conversation.apply_first_message_title("Halo"));
        assert_eq!(conversation.title, "Rencana minggu ini");
    }

    #[test]
    fn test_opening_conversation_has_two_greetings() {
        let conversation = Conversation::opening();
        assert_eq!(conversation.title, "Percakapan dengan Oliv");
        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation
            .messages()
            .iter()
            .all(|m| m.sender == Sender::Assistant));
        assert_eq!(conversation.user_message_count(), 0);
    }

    #[test]
    fn test_push_refreshes_updated_at() {
        let mut conversation = Conversation::numbered(1);
        let before = conversation.updated_at;
        let message = Message::user("Halo");
        let sent_at = message.timestamp;

        conversation.push(message);

        assert!(conversation.updated_at >= before);
        assert_eq!(conversation.updated_at, sent_at.max(before));
        assert_eq!(conversation.user_message_count(), 1);
    }

    #[test]
    fn test_history_drops_seeded_greetings() {
        let messages = vec![
            Message::assistant(prompts_builtin::WELCOME_GREETING),
            Message::user("Aku capek"),
            Message::assistant(prompts_builtin::INTRODUCTION_GREETING),
            Message::user("Boleh cerita?"),
            Message::assistant("Tentu, Aima. Aku dengarkan."),
        ];

        let history = completion_history(&messages);

        assert_eq!(
            history,
            vec![
                ChatTurn::user("Aku capek"),
                ChatTurn::user("Boleh cerita?"),
                ChatTurn::assistant("Tentu, Aima. Aku dengarkan."),
            ]
        );
    }

    #[test]
    fn test_user_text_matching_greeting_is_kept() {
        let messages = vec![Message::user("Salam kenal. Aku Oliv juga lho")];
        assert_eq!(completion_history(&messages).len(), 1);
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message::user("Hello");
        let turn = ChatTurn::from(&msg);
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello");

        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
    }
}

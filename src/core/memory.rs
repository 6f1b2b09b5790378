//! In-memory conversation set
//!
//! Holds every conversation of the session in display order together with the
//! active pointer and the busy flag. Nothing here survives a restart.

use tracing::debug;

use crate::conversation::Conversation;

/// Ordered conversations plus the active pointer.
///
/// The active id always names a conversation in the set: every mutating method
/// restores that before returning.
#[derive(Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: String,
    busy: bool,
}

impl ConversationStore {
    /// A store holding the opening conversation, active and idle
    pub fn new() -> Self {
        Self::with_conversation(Conversation::opening())
    }

    fn with_conversation(conversation: Conversation) -> Self {
        Self {
            active_id: conversation.id.clone(),
            conversations: vec![conversation],
            busy: false,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Never true between operations: the last deletion recreates a conversation
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.get(&self.active_id)
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Prepend a fresh numbered conversation and make it active
    pub fn create(&mut self) -> &Conversation {
        let conversation = Conversation::numbered(self.conversations.len() + 1);
        debug!(conversation_id = %conversation.id, title = %conversation.title, "Conversation created");

        self.active_id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        &self.conversations[0]
    }

    /// Make `id` active. Returns false, changing nothing, if it is unknown.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if self.active_id != id {
            self.active_id = id.to_string();
        }
        true
    }

    /// Remove `id`. Returns false, changing nothing, if it is unknown.
    ///
    /// Deleting the active conversation activates the first remaining one, or a
    /// freshly created `Percakapan 1` when the set became empty.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return false;
        };
        self.conversations.remove(index);

        if self.active_id == id {
            match self.conversations.first() {
                Some(next) => {
                    self.active_id = next.id.clone();
                }
                None => {
                    let replacement = Conversation::numbered(1);
                    debug!(conversation_id = %replacement.id, "Replacing last deleted conversation");
                    self.active_id = replacement.id.clone();
                    self.conversations.push(replacement);
                }
            }
        }
        true
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(store: &ConversationStore) -> Vec<String> {
        store.conversations().iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_new_store_has_active_opening_conversation() {
        let store = ConversationStore::new();
        assert_eq!(store.len(), 1);
        assert!(!store.is_busy());
        let active = store.active().unwrap();
        assert_eq!(active.title, "Percakapan dengan Oliv");
    }

    #[test]
    fn test_create_prepends_and_activates() {
        let mut store = ConversationStore::new();
        let opening = store.active_id().to_string();

        let created = store.create().id.clone();

        assert_eq!(ids(&store), vec![created.clone(), opening]);
        assert_eq!(store.active_id(), created);
        let conversation = store.active().unwrap();
        assert_eq!(conversation.title, "Percakapan 2");
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn test_titles_follow_count() {
        let mut store = ConversationStore::new();
        store.create();
        let third = store.create().title.clone();
        assert_eq!(third, "Percakapan 3");
    }

    #[test]
    fn test_select_unknown_changes_nothing() {
        let mut store = ConversationStore::new();
        let active = store.active_id().to_string();

        assert!(!store.select("conv-missing"));
        assert_eq!(store.active_id(), active);
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut store = ConversationStore::new();
        let first = store.active_id().to_string();
        store.create();

        assert!(store.select(&first));
        let once = (store.active_id().to_string(), ids(&store));
        assert!(store.select(&first));
        let twice = (store.active_id().to_string(), ids(&store));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_active_activates_first_remaining() {
        let mut store = ConversationStore::new();
        let c = store.active_id().to_string();
        let b = store.create().id.clone();
        let a = store.create().id.clone();
        assert_eq!(ids(&store), vec![a.clone(), b.clone(), c.clone()]);

        assert!(store.remove(&a));

        assert_eq!(store.active_id(), b);
        assert_eq!(ids(&store), vec![b, c]);
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let mut store = ConversationStore::new();
        let old = store.active_id().to_string();
        let current = store.create().id.clone();

        assert!(store.remove(&old));

        assert_eq!(store.active_id(), current);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_last_recreates() {
        let mut store = ConversationStore::new();
        let only = store.active_id().to_string();

        assert!(store.remove(&only));

        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);
        let replacement = store.active().unwrap();
        assert_ne!(replacement.id, only);
        assert_eq!(replacement.title, "Percakapan 1");
        assert_eq!(store.active_id(), replacement.id);
    }

    #[test]
    fn test_remove_unknown_changes_nothing() {
        let mut store = ConversationStore::new();
        let before = ids(&store);
        assert!(!store.remove("conv-missing"));
        assert_eq!(ids(&store), before);
    }
}

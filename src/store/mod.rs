//! Client-side store replacing ambient query-cache access
//!
//! Three keys, each with a narrow read/write contract:
//!
//! - **session**: written by the guard (lazy populate) and the auth
//!   mutations (refetch / invalidate / clear); read by the gates.
//! - **conversations**: the previous-conversations list, most recent
//!   first; replaced wholesale by list refreshes, grown at the front by
//!   conversation creation (idempotent on id).
//! - **chats**: one `Conversation` per id; the loader fills an absent
//!   entry, sends prepend messages, and the streaming updater overwrites
//!   one placeholder's content by its stable id.
//!
//! Reads hand out clones; writers hold the lock only for the duration of
//! one mutation, so a streaming exchange's chunk updates stay ordered.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::conversation::{Conversation, ConversationSummary, Delivery, Message};
use crate::session::Session;

#[derive(Default)]
struct StoreInner {
    session: Option<Session>,
    conversations: Option<Vec<ConversationSummary>>,
    chats: HashMap<String, Conversation>,
}

#[derive(Default)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached key. Runs after logout.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = StoreInner::default();
    }

    // --- session ---

    pub fn session(&self) -> Option<Session> {
        self.inner.read().unwrap().session.clone()
    }

    pub fn set_session(&self, session: Session) {
        self.inner.write().unwrap().session = Some(session);
    }

    /// Forget the cached session so the next gate check refetches it.
    pub fn invalidate_session(&self) {
        self.inner.write().unwrap().session = None;
    }

    // --- conversation list ---

    pub fn conversations(&self) -> Option<Vec<ConversationSummary>> {
        self.inner.read().unwrap().conversations.clone()
    }

    pub fn set_conversations(&self, conversations: Vec<ConversationSummary>) {
        self.inner.write().unwrap().conversations = Some(conversations);
    }

    /// Insert a freshly created conversation at the front of the list.
    ///
    /// Returns `false` without touching the list when an entry with the
    /// same id is already present; id equality is the only dedup key.
    pub fn insert_conversation_front(&self, summary: ConversationSummary) -> bool {
        let mut inner = self.inner.write().unwrap();
        let list = inner.conversations.get_or_insert_with(Vec::new);
        if list.iter().any(|conv| conv.id == summary.id) {
            return false;
        }
        list.insert(0, summary);
        true
    }

    // --- conversation details ---

    pub fn chat(&self, id: &str) -> Option<Conversation> {
        self.inner.read().unwrap().chats.get(id).cloned()
    }

    pub fn set_chat(&self, conversation: Conversation) {
        let mut inner = self.inner.write().unwrap();
        inner.chats.insert(conversation.id.clone(), conversation);
    }

    /// Prepend a message to a cached conversation (newest first).
    /// A write to an uncached conversation is dropped.
    pub fn prepend_message(&self, chat_id: &str, message: Message) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.chats.get_mut(chat_id) {
            Some(chat) => {
                chat.messages.insert(0, message);
                true
            }
            None => false,
        }
    }

    /// Overwrite one message's content by its stable id.
    pub fn set_message_content(&self, chat_id: &str, message_id: &str, content: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        inner
            .chats
            .get_mut(chat_id)
            .and_then(|chat| chat.messages.iter_mut().find(|msg| msg.id == message_id))
            .map(|msg| msg.content = content.to_string())
            .is_some()
    }

    pub fn set_message_delivery(&self, chat_id: &str, message_id: &str, delivery: Delivery) -> bool {
        let mut inner = self.inner.write().unwrap();
        inner
            .chats
            .get_mut(chat_id)
            .and_then(|chat| chat.messages.iter_mut().find(|msg| msg.id == message_id))
            .map(|msg| msg.delivery = delivery)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_chat(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: "New conversation".to_string(),
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_insert_conversation_front_is_idempotent_on_id() {
        let store = Store::new();
        store.set_conversations(vec![ConversationSummary {
            id: "a".into(),
            title: "First".into(),
        }]);

        let created = ConversationSummary {
            id: "x".into(),
            title: "New conversation".into(),
        };
        assert!(store.insert_conversation_front(created.clone()));
        assert!(!store.insert_conversation_front(created));

        let list = store.conversations().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "x");
        assert_eq!(list.iter().filter(|c| c.id == "x").count(), 1);
    }

    #[test]
    fn test_insert_into_unfetched_list_starts_one() {
        let store = Store::new();
        assert!(store.insert_conversation_front(ConversationSummary {
            id: "x".into(),
            title: "New conversation".into(),
        }));
        assert_eq!(store.conversations().unwrap().len(), 1);
    }

    #[test]
    fn test_send_prepends_user_then_placeholder() {
        let store = Store::new();
        store.set_chat(empty_chat("c1"));

        store.prepend_message("c1", Message::user("question"));
        store.prepend_message("c1", Message::assistant_placeholder());

        let chat = store.chat("c1").unwrap();
        assert_eq!(chat.messages.len(), 2);
        // newest first: placeholder on top of the user turn
        assert!(!chat.messages[0].is_user);
        assert!(chat.messages[0].content.is_empty());
        assert!(chat.messages[1].is_user);
        assert_eq!(chat.messages[1].content, "question");
    }

    #[test]
    fn test_prepend_to_uncached_chat_is_dropped() {
        let store = Store::new();
        assert!(!store.prepend_message("missing", Message::user("hi")));
    }

    #[test]
    fn test_content_overwrite_targets_stable_id() {
        let store = Store::new();
        store.set_chat(empty_chat("c1"));
        let placeholder = Message::assistant_placeholder();
        let id = placeholder.id.clone();
        store.prepend_message("c1", placeholder);
        store.prepend_message("c1", Message::user("later"));

        assert!(store.set_message_content("c1", &id, "Hel"));
        assert!(store.set_message_content("c1", &id, "Hello, world"));

        let chat = store.chat("c1").unwrap();
        let msg = chat.messages.iter().find(|m| m.id == id).unwrap();
        assert_eq!(msg.content, "Hello, world");
        // the other entry is untouched
        assert_eq!(chat.messages[0].content, "later");
    }

    #[test]
    fn test_delivery_transition() {
        let store = Store::new();
        store.set_chat(empty_chat("c1"));
        let msg = Message::user("hi");
        let id = msg.id.clone();
        store.prepend_message("c1", msg);

        assert!(store.set_message_delivery("c1", &id, Delivery::Confirmed));
        let chat = store.chat("c1").unwrap();
        assert_eq!(chat.messages[0].delivery, Delivery::Confirmed);
    }

    #[test]
    fn test_clear_drops_everything() {
        let store = Store::new();
        store.set_session(Session::Anonymous);
        store.set_conversations(Vec::new());
        store.set_chat(empty_chat("c1"));

        store.clear();

        assert!(store.session().is_none());
        assert!(store.conversations().is_none());
        assert!(store.chat("c1").is_none());
    }
}

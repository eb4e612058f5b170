//! Chat orchestration over the API client and the store
//!
//! The ChatService owns every multi-step exchange:
//! 1. auth mutations and their cache effects
//! 2. conversation creation with idempotent list insertion
//! 3. ensure-style loading of the list and of conversation details
//! 4. the streaming answer exchange: optimistic prepends, a producer
//!    task reading the network into a channel, a single updater loop
//!    applying each increment to the store, and the finalize request
//!    that persists the assistant turn

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::api::{ApiClient, ApiError};
use crate::conversation::{Conversation, ConversationSummary, Delivery, Message};
use crate::session::guard;
use crate::store::Store;

/// Title a conversation is born with; the server retitles it from the
/// first real message.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Channel capacity between the network producer and the updater loop.
const STREAM_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Outcome of creating a conversation.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub summary: ConversationSummary,
    /// The list already held this id, so nothing was inserted.
    pub already_listed: bool,
}

pub struct ChatService {
    api: ApiClient,
    store: Arc<Store>,
}

impl ChatService {
    pub fn new(api: ApiClient, store: Arc<Store>) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // --- auth mutations ---

    /// Log in, then refetch the session so the gates see the new identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ChatError> {
        self.api.login(email, password).await?;
        self.store.invalidate_session();
        guard::ensure_session(&self.api, &self.store).await?;
        Ok(())
    }

    /// Sign up; the session cache is invalidated and refetched lazily at
    /// the next gate check.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<(), ChatError> {
        self.api.signup(name, email, password).await?;
        self.store.invalidate_session();
        Ok(())
    }

    /// Log out and drop every cached key.
    pub async fn logout(&self) -> Result<(), ChatError> {
        self.api.logout().await?;
        self.store.clear();
        Ok(())
    }

    // --- conversations ---

    pub async fn refresh_conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        let list = self.api.conversations().await?;
        self.store.set_conversations(list.clone());
        Ok(list)
    }

    /// Cached list, fetched on first need.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        if let Some(list) = self.store.conversations() {
            return Ok(list);
        }
        self.refresh_conversations().await
    }

    /// Create a conversation and insert its summary at the front of the
    /// list unless the id is already present.
    pub async fn create_conversation(&self) -> Result<NewConversation, ChatError> {
        let summary = self
            .api
            .create_conversation(DEFAULT_CONVERSATION_TITLE)
            .await?;
        let inserted = self.store.insert_conversation_front(summary.clone());
        Ok(NewConversation {
            summary,
            already_listed: !inserted,
        })
    }

    /// Cached conversation details, fetched when absent.
    pub async fn open_conversation(&self, id: &str) -> Result<Conversation, ChatError> {
        if let Some(chat) = self.store.chat(id) {
            return Ok(chat);
        }
        let chat = self.api.conversation(id).await?;
        self.store.set_chat(chat.clone());
        Ok(chat)
    }

    // --- the streaming answer exchange ---

    pub async fn send_message(&self, conversation_id: &str, text: &str) -> Result<String, ChatError> {
        self.send_message_with(conversation_id, text, |_| {}).await
    }

    /// Send a user message and stream the assistant's answer into the
    /// store, invoking `on_delta` for every decoded increment.
    ///
    /// The user message and the empty placeholder are prepended before
    /// the request body stream is first polled, so both cache mutations
    /// land before any response byte arrives. Dropping this future
    /// cancels the exchange: the updater stops, the producer exits on
    /// its next send into the closed channel, and the transfer is
    /// aborted without a finalize request.
    pub async fn send_message_with<F>(
        &self,
        conversation_id: &str,
        text: &str,
        mut on_delta: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str),
    {
        let user_message = Message::user(text);
        let user_id = user_message.id.clone();
        self.store.prepend_message(conversation_id, user_message);

        // nothing is sent until the producer polls this
        let stream = self.api.stream_answer(conversation_id, text);

        // the previous-conversations view catches up without being awaited
        let api = self.api.clone();
        let list_store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match api.conversations().await {
                Ok(list) => list_store.set_conversations(list),
                Err(err) => tracing::debug!("conversation list refresh failed: {err}"),
            }
        });

        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id.clone();
        self.store.prepend_message(conversation_id, placeholder);

        let (tx, mut rx) = mpsc::channel::<Result<String, ApiError>>(STREAM_BUFFER);
        tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                if tx.send(item).await.is_err() {
                    // receiver gone: the exchange was abandoned
                    break;
                }
            }
        });

        // single updater: every store write for this exchange happens here
        let mut answer = String::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(piece) => {
                    answer.push_str(&piece);
                    self.store
                        .set_message_content(conversation_id, &placeholder_id, &answer);
                    on_delta(&piece);
                }
                Err(err) => {
                    // no retry: freeze the partial content, mark both turns
                    tracing::error!("answer stream failed: {err}");
                    self.store
                        .set_message_delivery(conversation_id, &placeholder_id, Delivery::Failed);
                    self.store
                        .set_message_delivery(conversation_id, &user_id, Delivery::Failed);
                    return Err(err.into());
                }
            }
        }

        // transport completed (possibly with zero bytes); persist the turn
        if let Err(err) = self.api.confirm_answer(conversation_id, &answer).await {
            self.store
                .set_message_delivery(conversation_id, &placeholder_id, Delivery::Failed);
            self.store
                .set_message_delivery(conversation_id, &user_id, Delivery::Confirmed);
            return Err(err.into());
        }
        self.store
            .set_message_delivery(conversation_id, &placeholder_id, Delivery::Confirmed);
        self.store
            .set_message_delivery(conversation_id, &user_id, Delivery::Confirmed);

        Ok(answer)
    }
}

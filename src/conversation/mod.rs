//! Conversation types shared by the store, the API client, and the UI

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of a locally visible message.
///
/// Optimistic writes enter the store as `Pending` and are reconciled when
/// the server round trip finishes: `Confirmed` once the exchange that
/// carried them completes, `Failed` if the stream errors mid-flight. A
/// `Failed` assistant message keeps whatever content had accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub is_user: bool,
    pub content: String,
    /// Client-side only; messages fetched from the server are `Confirmed`.
    #[serde(default = "Delivery::confirmed", skip_serializing)]
    pub delivery: Delivery,
}

impl Delivery {
    fn confirmed() -> Self {
        Delivery::Confirmed
    }
}

impl Message {
    /// A user turn entering the store optimistically.
    pub fn user(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_user: true,
            content: content.to_string(),
            delivery: Delivery::Pending,
        }
    }

    /// The empty assistant placeholder a streaming exchange writes into.
    /// The id is generated once here and must stay stable across every
    /// chunk update so each overwrite targets the same entry.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_user: false,
            content: String::new(),
            delivery: Delivery::Pending,
        }
    }
}

/// List entry for the previous-conversations view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
}

/// A full conversation as served by `GET conversations/{id}`.
/// `messages` is ordered newest first; sends prepend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

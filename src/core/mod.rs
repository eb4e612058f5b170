//! Core client orchestration
//!
//! The service layer between the terminal UI, the API client, and the
//! store, plus the pre-submit form validation.

mod chat;
pub mod validate;

pub use chat::{ChatError, ChatService, NewConversation, DEFAULT_CONVERSATION_TITLE};

//! HTTP client for the assistant backend
//!
//! Every endpoint lives under `<base>/api`. The session rides in a
//! cookie, so the client keeps a cookie jar; requests are never retried
//! and the streaming request runs without a timeout.

pub mod text;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, ConversationSummary};
use crate::session::Session;

use text::Utf8Decoder;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {detail}")]
    Api { status: StatusCode, detail: String },
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    conversations: Vec<ConversationSummary>,
}

/// Error body the backend sends on failed mutations.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    pub async fn session(&self) -> Result<Session, ApiError> {
        let response = self.client.get(self.url("session")).send().await?;
        Ok(error_for_detail(response).await?.json().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        error_for_detail(response).await?;
        Ok(())
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("signup"))
            .json(&SignupRequest { email, password, name })
            .send()
            .await?;
        error_for_detail(response).await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.client.post(self.url("logout")).send().await?;
        error_for_detail(response).await?;
        Ok(())
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        let response = self.client.get(self.url("conversations")).send().await?;
        let list: ConversationsResponse = error_for_detail(response).await?.json().await?;
        Ok(list.conversations)
    }

    pub async fn create_conversation(&self, title: &str) -> Result<ConversationSummary, ApiError> {
        let response = self
            .client
            .post(self.url("conversations"))
            .json(&CreateConversationRequest { title })
            .send()
            .await?;
        Ok(error_for_detail(response).await?.json().await?)
    }

    pub async fn conversation(&self, id: &str) -> Result<Conversation, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("conversations/{id}")))
            .send()
            .await?;
        Ok(error_for_detail(response).await?.json().await?)
    }

    /// Open the streaming answer request and expose the plain-text body
    /// as decoded chunks. Nothing is sent until the stream is polled;
    /// chunk boundaries inside a multi-byte sequence are healed by the
    /// decoder. Dropping the stream aborts the transfer.
    pub fn stream_answer(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> impl Stream<Item = Result<String, ApiError>> {
        let request = self
            .client
            .post(self.url(&format!("stream-answer/{conversation_id}/messages")))
            .json(&SendMessageRequest { message });

        try_stream! {
            let response = request.send().await?;
            let response = error_for_detail(response).await?;

            let mut body = response.bytes_stream();
            let mut decoder = Utf8Decoder::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                let piece = decoder.decode(&chunk);
                if !piece.is_empty() {
                    yield piece;
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield tail;
            }
        }
    }

    /// Persist the fully accumulated assistant turn server-side.
    pub async fn confirm_answer(&self, conversation_id: &str, message: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("stream-answer/{conversation_id}/ai-message")))
            .json(&SendMessageRequest { message })
            .send()
            .await?;
        error_for_detail(response).await?;
        Ok(())
    }
}

/// Map a non-success response to `ApiError::Api`, preferring the JSON
/// `{detail}` body the backend uses for auth failures.
async fn error_for_detail(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .map(|err| err.detail)
        .unwrap_or(body);

    Err(ApiError::Api { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_anonymous() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/session")
            .with_header("content-type", "application/json")
            .with_body(r#"{"authenticated": false}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let session = api.session().await.unwrap();
        assert_eq!(session, Session::Anonymous);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_detail() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "email": "a@b.com",
                "password": "longenough"
            })))
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Invalid email or password"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let err = api.login("a@b.com", "longenough").await.unwrap_err();
        match err {
            ApiError::Api { status, detail } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(detail, "Invalid email or password");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_conversations_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/conversations")
            .with_header("content-type", "application/json")
            .with_body(r#"{"conversations": [{"id": "c1", "title": "Visa renewal"}]}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let list = api.conversations().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "c1");
    }

    #[tokio::test]
    async fn test_create_conversation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/conversations")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "title": "New conversation"
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "c9", "title": "New conversation"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let summary = api.create_conversation("New conversation").await.unwrap();
        assert_eq!(summary.id, "c9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_answer_collects_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/stream-answer/c1/messages")
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body("Hello, world")
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let stream = api.stream_answer("c1", "hi");
        futures::pin_mut!(stream);

        let mut answer = String::new();
        while let Some(piece) = stream.next().await {
            answer.push_str(&piece.unwrap());
        }
        assert_eq!(answer, "Hello, world");
    }

    #[tokio::test]
    async fn test_stream_answer_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/stream-answer/c1/messages")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let stream = api.stream_answer("c1", "hi");
        futures::pin_mut!(stream);

        let first = stream.next().await.unwrap();
        assert!(matches!(
            first,
            Err(ApiError::Api { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_confirm_answer_posts_full_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/stream-answer/c1/ai-message")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "message": "Hello, world"
            })))
            .with_body("{}")
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        api.confirm_answer("c1", "Hello, world").await.unwrap();
        mock.assert_async().await;
    }
}

//! Route gates over the cached session
//!
//! Two mutually exclusive subtrees: the login/signup surface only admits
//! anonymous visitors, the chat surface only authenticated ones. The
//! session is fetched once on first need and consulted from the store
//! afterwards, so navigation never costs a server round trip.

use crate::api::{ApiClient, ApiError};
use crate::store::Store;

use super::Session;

/// Outcome of a gate check, decided before anything renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    RedirectToLogin,
    RedirectToHome,
}

/// Read the cached session, fetching and populating it when absent.
pub async fn ensure_session(api: &ApiClient, store: &Store) -> Result<Session, ApiError> {
    if let Some(session) = store.session() {
        return Ok(session);
    }
    let session = api.session().await?;
    store.set_session(session.clone());
    Ok(session)
}

/// Gate for the authenticated subtree.
pub async fn require_authenticated(api: &ApiClient, store: &Store) -> Result<Gate, ApiError> {
    if ensure_session(api, store).await?.is_authenticated() {
        Ok(Gate::Proceed)
    } else {
        Ok(Gate::RedirectToLogin)
    }
}

/// Gate for the anonymous-only subtree.
pub async fn require_anonymous(api: &ApiClient, store: &Store) -> Result<Gate, ApiError> {
    if ensure_session(api, store).await?.is_authenticated() {
        Ok(Gate::RedirectToHome)
    } else {
        Ok(Gate::Proceed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::User;

    #[tokio::test]
    async fn test_anonymous_is_redirected_to_login() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/session")
            .with_header("content-type", "application/json")
            .with_body(r#"{"authenticated": false}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let store = Store::new();

        let gate = require_authenticated(&api, &store).await.unwrap();
        assert_eq!(gate, Gate::RedirectToLogin);
        // the anonymous surface admits the same visitor
        let gate = require_anonymous(&api, &store).await.unwrap();
        assert_eq!(gate, Gate::Proceed);
    }

    #[tokio::test]
    async fn test_authenticated_is_bounced_off_login() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/session")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"authenticated": true,
                    "user": {"id": "u1", "name": "Amine", "email": "amine@example.dz"}}"#,
            )
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let store = Store::new();

        assert_eq!(
            require_anonymous(&api, &store).await.unwrap(),
            Gate::RedirectToHome
        );
        assert_eq!(
            require_authenticated(&api, &store).await.unwrap(),
            Gate::Proceed
        );
        assert_eq!(
            store.session().unwrap().user(),
            Some(&User {
                id: "u1".into(),
                name: "Amine".into(),
                email: "amine@example.dz".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_session_is_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/session")
            .with_header("content-type", "application/json")
            .with_body(r#"{"authenticated": false}"#)
            .expect(1)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url());
        let store = Store::new();

        require_authenticated(&api, &store).await.unwrap();
        require_authenticated(&api, &store).await.unwrap();
        require_anonymous(&api, &store).await.unwrap();
        mock.assert_async().await;
    }
}

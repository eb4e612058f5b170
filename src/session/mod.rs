//! Session identity as reported by `GET session`

pub mod guard;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// The boolean-discriminated session union: the server answers either
/// `{"authenticated": false}` or `{"authenticated": true, "user": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SessionWire")]
pub enum Session {
    Anonymous,
    Authenticated(User),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }
}

#[derive(Deserialize)]
struct SessionWire {
    authenticated: bool,
    #[serde(default)]
    user: Option<User>,
}

impl From<SessionWire> for Session {
    fn from(wire: SessionWire) -> Self {
        match (wire.authenticated, wire.user) {
            (true, Some(user)) => Session::Authenticated(user),
            // authenticated without a user payload is treated as anonymous
            _ => Session::Anonymous,
        }
    }
}

//! Access gate in front of the wizard. Account management lives elsewhere;
//! this only answers whether a request carries an active session.

use http::HeaderMap;
use http::header::AUTHORIZATION;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub name: String,
}

pub trait AuthGate: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser>;
}

/// Accepts `Authorization: Bearer <token>` for any configured token.
pub struct TokenGate {
    tokens: Vec<String>,
}

impl TokenGate {
    pub fn new(tokens: Vec<String>) -> Self {
        TokenGate { tokens }
    }
}

impl AuthGate for TokenGate {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .trim();

        let index = self.tokens.iter().position(|known| known == token)?;
        Some(AuthenticatedUser {
            name: format!("token-{}", index + 1),
        })
    }
}

/// Lets every request through; for local use without configured tokens.
pub struct OpenGate;

impl AuthGate for OpenGate {
    fn authenticate(&self, _headers: &HeaderMap) -> Option<AuthenticatedUser> {
        Some(AuthenticatedUser {
            name: "anonymous".to_string(),
        })
    }
}

pub fn gate_for(tokens: Vec<String>) -> Box<dyn AuthGate> {
    if tokens.is_empty() {
        tracing::warn!("AUTH_TOKENS is not set; the wizard API is open to everyone");
        Box::new(OpenGate)
    } else {
        Box::new(TokenGate::new(tokens))
    }
}

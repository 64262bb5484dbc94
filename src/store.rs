//! Keeps the token between the two handshake steps.

use crate::{AuthState, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Temporary credentials, pending user authorization.
    Request,
    /// Long lived token credentials.
    Access,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub kind: TokenKind,
    pub token: Token,
}

impl StoredToken {
    pub fn request(token: Token) -> Self {
        StoredToken {
            kind: TokenKind::Request,
            token,
        }
    }

    pub fn access(token: Token) -> Self {
        StoredToken {
            kind: TokenKind::Access,
            token,
        }
    }
}

impl From<StoredToken> for AuthState {
    fn from(stored: StoredToken) -> Self {
        match stored.kind {
            TokenKind::Request => AuthState::RequestTokenObtained(stored.token),
            TokenKind::Access => AuthState::AccessTokenObtained(stored.token),
        }
    }
}

/// Session storage for the handshake token (e.g. a web session across the
/// authorization redirect).
pub trait TokenStore {
    fn load(&self) -> Option<StoredToken>;

    fn save(&mut self, token: StoredToken);

    fn clear(&mut self);

    /// The handshake state represented by the stored token.
    fn state(&self) -> AuthState {
        self.load()
            .map(AuthState::from)
            .unwrap_or(AuthState::Unauthenticated)
    }
}

/// Process local [`TokenStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Option<StoredToken>);

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> Option<StoredToken> {
        self.0.clone()
    }

    fn save(&mut self, token: StoredToken) {
        self.0 = Some(token);
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}

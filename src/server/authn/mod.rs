mod bearer_token;

pub mod config;
pub mod factory;
pub mod password;
pub mod token;

use std::fmt;

use thiserror::Error;

use super::authz::Role;

pub use bearer_token::BearerTokenAuthenticator;

/// Resolves the caller of a request from its raw `Authorization` header.
pub trait Authenticator: Send + Sync {
    /// Never fails: every problem is reported as [`AuthnResponse::Rejected`]
    /// and treated by callers the same as an anonymous request.
    fn authenticate(&self, header: Option<&[u8]>) -> AuthnResponse;
}

/// Response from an authentication attempt.
#[derive(Debug)]
pub enum AuthnResponse {
    /// The token is valid and its identity still exists
    Ok(Identity),
    /// The request carried no credentials
    Anonymous,
    /// Credentials were present but unusable
    Rejected(AuthnFailure),
}

impl AuthnResponse {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            AuthnResponse::Ok(identity) => Some(identity),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthnFailure {
    #[error("token: {0}")]
    Token(#[from] token::TokenError),

    #[error("identity {0} not found")]
    IdentityNotFound(u64),

    #[error("identity store: {0}")]
    Store(String),
}

/// The caller of a request as seen by handlers. Never carries the credential
/// hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: u64,
    pub identifier: u64,
    pub role: Role,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.role)
    }
}

/// Per-request state built before any `/api` handler runs.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    pub peer: Option<String>,
}

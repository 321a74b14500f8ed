pub mod config;
pub mod factory;
pub mod jwt;

use thiserror::Error;

use crate::types::token::TokenResponse;

/// Why a token could not be issued or was not accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("empty token")]
    Empty,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("sign token: {0}")]
    Sign(String),
}

/// Claims recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub identity_id: u64,
    pub role: String,
    pub iat: u64,
    pub exp: Option<u64>,
}

pub trait TokenGenerator: Send + Sync {
    fn generate_token(
        &self,
        identity_id: u64,
        role: &str,
        now: u64,
    ) -> Result<TokenResponse, TokenError>;
}

pub trait TokenValidator: Send + Sync {
    fn validate_token(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError>;
}

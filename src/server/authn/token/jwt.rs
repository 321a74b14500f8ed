use std::collections::HashSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::token::TokenResponse;

use super::{TokenClaims, TokenError, TokenGenerator, TokenValidator};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    identity_id: u64,
    role: String,
    iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// Issues HS256 tokens. Claims are only signed, anyone holding the token can
/// read them.
pub struct JwtTokenGenerator {
    key: EncodingKey,
    /// Seconds until expiry, 0 means the token never expires.
    expiry: u64,
}

impl JwtTokenGenerator {
    pub fn new(secret: &[u8], expiry: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            expiry,
        }
    }
}

impl TokenGenerator for JwtTokenGenerator {
    fn generate_token(
        &self,
        identity_id: u64,
        role: &str,
        now: u64,
    ) -> Result<TokenResponse, TokenError> {
        let exp = if self.expiry > 0 {
            Some(now + self.expiry)
        } else {
            None
        };
        let claims = Claims {
            identity_id,
            role: role.to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Sign(e.to_string()))?;
        Ok(TokenResponse {
            token,
            role: claims.role,
            identity_id,
        })
    }
}

pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is optional and checked against the caller's clock below
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenValidator for JwtTokenValidator {
    fn validate_token(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        let claims = match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Err(match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed(e.to_string()),
                })
            }
        };

        if let Some(exp) = claims.exp {
            if now >= exp {
                return Err(TokenError::Expired);
            }
        }

        Ok(TokenClaims {
            identity_id: claims.identity_id,
            role: claims.role,
            iat: claims.iat,
            exp: claims.exp,
        })
    }
}

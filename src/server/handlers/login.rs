use std::sync::Arc;

use actix_web::HttpRequest;
use chrono::Local;
use log::{error, info};

use crate::server::authn::password::PasswordVerifier;
use crate::server::authn::token::jwt::JwtTokenGenerator;
use crate::server::authn::token::TokenGenerator;
use crate::server::authz::Role;
use crate::server::db::IdentityStore;
use crate::server::response::Response;
use crate::types::token::LoginRequest;

use super::{peer_addr, Handler};

/// Exchanges `{identifier, password}` for a signed token.
pub struct LoginHandler {
    store: Arc<dyn IdentityStore>,
    verifier: PasswordVerifier,
    token_generator: JwtTokenGenerator,
}

impl LoginHandler {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        verifier: PasswordVerifier,
        token_generator: JwtTokenGenerator,
    ) -> Self {
        Self {
            store,
            verifier,
            token_generator,
        }
    }

    /// Returns `None` when the body carries no usable credentials. A negative
    /// identifier is well-formed but matches no identity, it is returned as
    /// `Some((None, password))`.
    fn parse_body(body: Option<Vec<u8>>) -> Option<(Option<u64>, String)> {
        let body = body?;
        let req: LoginRequest = serde_json::from_slice(&body).ok()?;

        let identifier = match req.identifier {
            Some(number) => match (number.as_u64(), number.as_i64()) {
                (Some(0), _) => return None,
                (Some(identifier), _) => Some(identifier),
                (None, Some(_)) => None,
                // Not an integer
                (None, None) => return None,
            },
            None => return None,
        };
        let password = match req.password {
            Some(password) if !password.is_empty() => password,
            _ => return None,
        };
        Some((identifier, password))
    }
}

impl Handler for LoginHandler {
    fn handle(&self, _path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let (identifier, password) = match Self::parse_body(body) {
            Some(creds) => creds,
            None => return Response::missing_credentials(),
        };

        let lookup = match identifier {
            Some(identifier) => self.store.find_by_identifier(identifier),
            None => Ok(None),
        };
        let record = match lookup {
            Ok(Some(record)) => record,
            // Same response as a wrong password, callers cannot probe
            // identifiers.
            Ok(None) => return Response::invalid_credentials(),
            Err(e) => {
                error!("Failed to get identity for login: {e:#}");
                return Response::error();
            }
        };

        if !self.verifier.check(&password, &record.hash) {
            return Response::invalid_credentials();
        }

        let role = Role::from_name(&record.role);
        let now = Local::now().timestamp() as u64;
        let token = match self.token_generator.generate_token(record.id, role.name(), now) {
            Ok(token) => token,
            Err(e) => {
                error!("Failed to generate token for identity {}: {e}", record.id);
                return Response::error();
            }
        };

        info!(
            "Identity {} logged in as {role}, from {}",
            record.id,
            peer_addr(&req).unwrap_or_default()
        );
        Response::json(token)
    }
}

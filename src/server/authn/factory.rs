use std::sync::Arc;

use log::warn;

use crate::server::db::IdentityStore;

use super::bearer_token::BearerTokenAuthenticator;
use super::config::AuthnConfig;
use super::password::PasswordVerifier;
use super::token::factory::TokenFactory;
use super::token::jwt::JwtTokenValidator;

pub struct AuthnFactory;

impl AuthnFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn build_authenticator(
        &self,
        token_factory: &TokenFactory,
        store: Arc<dyn IdentityStore>,
    ) -> BearerTokenAuthenticator<JwtTokenValidator> {
        let validator = token_factory.build_token_validator();
        BearerTokenAuthenticator::new(validator, store)
    }

    pub fn build_password_verifier(&self, cfg: &AuthnConfig) -> PasswordVerifier {
        if cfg.allow_plaintext_passwords {
            warn!(
                "Plaintext password comparison is enabled, migrate stored credentials to bcrypt and disable allow_plaintext_passwords"
            );
        }
        PasswordVerifier::new(cfg.allow_plaintext_passwords)
    }
}

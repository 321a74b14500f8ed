use std::sync::Arc;

use chrono::Local;
use log::debug;

use crate::server::authz::Role;
use crate::server::db::IdentityStore;

use super::token::{TokenError, TokenValidator};
use super::{Authenticator, AuthnFailure, AuthnResponse, Identity};

/// Resolves `Authorization: Bearer <token>` (or a bare token) to the stored
/// identity the token was issued for.
pub struct BearerTokenAuthenticator<T: TokenValidator> {
    validator: T,
    store: Arc<dyn IdentityStore>,
}

impl<T: TokenValidator> BearerTokenAuthenticator<T> {
    pub fn new(validator: T, store: Arc<dyn IdentityStore>) -> Self {
        Self { validator, store }
    }

    fn authenticate_at(&self, header: Option<&[u8]>, now: u64) -> AuthnResponse {
        let auth = match header.map(std::str::from_utf8) {
            Some(Ok(auth)) => auth.trim(),
            Some(Err(_)) | None => return AuthnResponse::Anonymous,
        };
        if auth.is_empty() {
            return AuthnResponse::Anonymous;
        }

        let token = strip_bearer(auth);
        if token.is_empty() {
            return AuthnResponse::Rejected(AuthnFailure::Token(TokenError::Empty));
        }

        let claims = match self.validator.validate_token(token, now) {
            Ok(claims) => claims,
            Err(e) => return AuthnResponse::Rejected(e.into()),
        };

        let record = match self.store.find_by_id(claims.identity_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return AuthnResponse::Rejected(AuthnFailure::IdentityNotFound(claims.identity_id))
            }
            Err(e) => return AuthnResponse::Rejected(AuthnFailure::Store(format!("{e:#}"))),
        };

        // The stored role wins over the claim, a role change applies to
        // tokens issued before it.
        AuthnResponse::Ok(Identity {
            id: record.id,
            identifier: record.identifier,
            role: Role::from_name(&record.role),
        })
    }
}

impl<T: TokenValidator> Authenticator for BearerTokenAuthenticator<T> {
    fn authenticate(&self, header: Option<&[u8]>) -> AuthnResponse {
        let now = Local::now().timestamp() as u64;
        let resp = self.authenticate_at(header, now);
        if let AuthnResponse::Rejected(ref failure) = resp {
            debug!("Reject request credentials: {failure}");
        }
        resp
    }
}

/// Strips a case-insensitive `Bearer` scheme if present.
fn strip_bearer(auth: &str) -> &str {
    const SCHEME: &str = "bearer";

    let mut iter = auth.splitn(2, char::is_whitespace);
    let first = iter.next().unwrap_or_default();
    if first.eq_ignore_ascii_case(SCHEME) {
        return iter.next().unwrap_or_default().trim();
    }
    auth
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    use crate::server::authn::token::jwt::{JwtTokenGenerator, JwtTokenValidator};
    use crate::server::authn::token::TokenGenerator;
    use crate::server::db::{Database, IdentityRecord};

    use super::*;

    const SECRET: &[u8] = b"bearer-test-secret";
    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        db: Arc<Database>,
        generator: JwtTokenGenerator,
        authn: BearerTokenAuthenticator<JwtTokenValidator>,
    }

    impl Fixture {
        fn new(expiry: u64) -> Self {
            let db = Arc::new(Database::new_test());
            db.with_transaction(|tx| {
                tx.create_identity(&IdentityRecord::new(1001, "Physician", "unused"))?;
                tx.create_identity(&IdentityRecord::new(1002, "nurse", "unused"))?;
                tx.create_identity(&IdentityRecord::new(1003, "janitor", "unused"))?;
                Ok(())
            })
            .unwrap();

            let store: Arc<dyn IdentityStore> = db.clone();
            Self {
                db,
                generator: JwtTokenGenerator::new(SECRET, expiry),
                authn: BearerTokenAuthenticator::new(JwtTokenValidator::new(SECRET), store),
            }
        }

        fn token(&self, id: u64, role: &str) -> String {
            self.generator.generate_token(id, role, NOW).unwrap().token
        }

        fn resolve(&self, header: &str) -> AuthnResponse {
            self.authn.authenticate_at(Some(header.as_bytes()), NOW)
        }
    }

    fn assert_rejected(resp: AuthnResponse) -> AuthnFailure {
        match resp {
            AuthnResponse::Rejected(failure) => failure,
            other => panic!("expect rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_no_credentials() {
        let fx = Fixture::new(0);
        assert!(matches!(
            fx.authn.authenticate_at(None, NOW),
            AuthnResponse::Anonymous
        ));
        assert!(matches!(fx.resolve(""), AuthnResponse::Anonymous));
        assert!(matches!(fx.resolve("   "), AuthnResponse::Anonymous));
        assert!(matches!(
            fx.authn.authenticate_at(Some(&[0xff, 0xfe, 0x41]), NOW),
            AuthnResponse::Anonymous
        ));
    }

    #[test]
    fn test_resolve() {
        let fx = Fixture::new(0);
        let token = fx.token(1, "physician");
        let expect = Identity {
            id: 1,
            identifier: 1001,
            role: Role::Physician,
        };

        for header in [
            format!("Bearer {token}"),
            format!("bearer {token}"),
            format!("BEARER   {token}"),
            format!("  Bearer {token}  "),
            token.clone(),
        ] {
            let identity = fx.resolve(&header).into_identity();
            assert_eq!(identity.as_ref(), Some(&expect), "header: {header}");
        }
    }

    #[test]
    fn test_garbage() {
        let fx = Fixture::new(0);
        for header in ["Bearer", "Bearer ", "Bearer garbage", "garbage", "Basic dXNlcjpwYXNz"] {
            assert_rejected(fx.resolve(header));
        }

        let failure = assert_rejected(fx.resolve("Bearer "));
        assert!(matches!(failure, AuthnFailure::Token(TokenError::Empty)));
    }

    #[test]
    fn test_tampered_signature() {
        let fx = Fixture::new(0);
        let token = fx.token(2, "nurse");
        let (rest, sig) = token.rsplit_once('.').unwrap();
        let sig = URL_SAFE_NO_PAD.decode(sig).unwrap();
        assert_eq!(sig.len(), 32);

        for bit in 0..sig.len() * 8 {
            let mut tampered = sig.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let token = format!("{rest}.{}", URL_SAFE_NO_PAD.encode(&tampered));

            let failure = assert_rejected(fx.resolve(&format!("Bearer {token}")));
            assert!(
                matches!(failure, AuthnFailure::Token(TokenError::InvalidSignature)),
                "bit {bit}: {failure:?}"
            );
        }
    }

    #[test]
    fn test_stored_role_wins() {
        let fx = Fixture::new(0);

        // Token claims administrator, store says nurse
        let token = fx.token(2, "administrator");
        let identity = fx
            .resolve(&format!("Bearer {token}"))
            .into_identity()
            .unwrap();
        assert_eq!(identity.role, Role::Nurse);

        // Unknown stored roles are kept as-is
        let token = fx.token(3, "clerk");
        let identity = fx
            .resolve(&format!("Bearer {token}"))
            .into_identity()
            .unwrap();
        assert_eq!(identity.role, Role::Unknown(String::from("janitor")));
    }

    #[test]
    fn test_deleted_identity() {
        let fx = Fixture::new(0);
        let token = fx.token(2, "nurse");
        assert!(fx.resolve(&token).into_identity().is_some());

        fx.db
            .with_transaction(|tx| tx.delete_identity(2))
            .unwrap();
        let failure = assert_rejected(fx.resolve(&token));
        assert!(matches!(failure, AuthnFailure::IdentityNotFound(2)));

        let token = fx.token(404, "nurse");
        let failure = assert_rejected(fx.resolve(&token));
        assert!(matches!(failure, AuthnFailure::IdentityNotFound(404)));
    }

    #[test]
    fn test_expired() {
        let fx = Fixture::new(60);
        let token = fx.token(1, "physician");
        assert!(fx
            .authn
            .authenticate_at(Some(token.as_bytes()), NOW + 59)
            .into_identity()
            .is_some());

        let failure = assert_rejected(fx.authn.authenticate_at(Some(token.as_bytes()), NOW + 60));
        assert!(matches!(failure, AuthnFailure::Token(TokenError::Expired)));
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("bEaReR\tabc"), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
        assert_eq!(strip_bearer("Bearer"), "");
        assert_eq!(strip_bearer("Bearerabc"), "Bearerabc");
    }
}

use anyhow::{bail, Context, Result};
use log::debug;

const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];

/// How a stored credential is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Bcrypt,
    /// Legacy rows that kept the password itself.
    Plaintext,
}

impl HashScheme {
    pub fn detect(stored: &str) -> Self {
        if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            return HashScheme::Bcrypt;
        }
        HashScheme::Plaintext
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Matched,
    Mismatched,
    /// The value looked like bcrypt but could not be parsed.
    Malformed,
}

/// Checks a login password against the credential stored for an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordVerifier {
    allow_plaintext: bool,
}

impl PasswordVerifier {
    pub fn new(allow_plaintext: bool) -> Self {
        Self { allow_plaintext }
    }

    /// Returns whether `password` matches `stored`. Never fails.
    pub fn check(&self, password: &str, stored: &str) -> bool {
        let scheme = HashScheme::detect(stored);
        match self.verify(password, stored) {
            Verification::Matched => true,
            Verification::Mismatched => false,
            Verification::Malformed => {
                debug!("Stored {scheme:?} credential is malformed");
                self.allow_plaintext && password == stored
            }
        }
    }

    /// Runs the raw comparison without applying the malformed fallback.
    pub fn verify(&self, password: &str, stored: &str) -> Verification {
        match HashScheme::detect(stored) {
            HashScheme::Bcrypt => match bcrypt::verify(password, stored) {
                Ok(true) => Verification::Matched,
                Ok(false) => Verification::Mismatched,
                Err(_) => Verification::Malformed,
            },
            HashScheme::Plaintext => {
                if self.allow_plaintext && password == stored {
                    Verification::Matched
                } else {
                    Verification::Mismatched
                }
            }
        }
    }
}

/// Produces a bcrypt hash suitable for the `identity.hash` column.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    bcrypt::hash(password, cost).context("bcrypt hash password")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_detect() {
        let hash = hash_password("secret", TEST_COST).unwrap();
        assert_eq!(HashScheme::detect(&hash), HashScheme::Bcrypt);

        for stored in ["$2a$10$x", "$2b$", "$2x$04$abc", "$2y$12$abc"] {
            assert_eq!(HashScheme::detect(stored), HashScheme::Bcrypt);
        }
        for stored in ["secret", "", "$2c$10$abc", "2b$10$abc", "$argon2id$v=19"] {
            assert_eq!(HashScheme::detect(stored), HashScheme::Plaintext);
        }
    }

    #[test]
    fn test_bcrypt() {
        let hash = hash_password("correct horse", TEST_COST).unwrap();
        for allow_plaintext in [false, true] {
            let verifier = PasswordVerifier::new(allow_plaintext);
            assert!(verifier.check("correct horse", &hash));
            assert!(!verifier.check("correct horse ", &hash));
            assert!(!verifier.check("", &hash));
            assert_eq!(
                verifier.verify("wrong", &hash),
                Verification::Mismatched
            );

            // The hash itself is not accepted as a password
            assert!(!verifier.check(&hash, &hash));
        }
    }

    #[test]
    fn test_plaintext() {
        let verifier = PasswordVerifier::new(true);
        assert!(verifier.check("legacy", "legacy"));
        assert!(!verifier.check("Legacy", "legacy"));
        assert!(!verifier.check("", "legacy"));

        let verifier = PasswordVerifier::new(false);
        assert!(!verifier.check("legacy", "legacy"));
        assert_eq!(verifier.verify("legacy", "legacy"), Verification::Mismatched);
    }

    #[test]
    fn test_malformed() {
        let stored = "$2b$not-a-real-hash";

        let verifier = PasswordVerifier::new(false);
        assert_eq!(verifier.verify(stored, stored), Verification::Malformed);
        assert!(!verifier.check(stored, stored));
        assert!(!verifier.check("anything", stored));

        let verifier = PasswordVerifier::new(true);
        assert_eq!(verifier.verify(stored, stored), Verification::Malformed);
        assert!(verifier.check(stored, stored));
        assert!(!verifier.check("anything", stored));
    }

    #[test]
    fn test_hash_password() {
        assert!(hash_password("", TEST_COST).is_err());

        let a = hash_password("same", TEST_COST).unwrap();
        let b = hash_password("same", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2b$04$"));
    }
}

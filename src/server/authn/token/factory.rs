use std::{fs, io};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::config::TokenConfig;
use super::jwt::{JwtTokenGenerator, JwtTokenValidator};

const SECRET_LENGTH: usize = 64;

pub struct TokenFactory {
    secret: Vec<u8>,
    expiry: u64,
}

impl TokenFactory {
    pub fn new(cfg: &TokenConfig) -> Result<Self> {
        let secret = if cfg.generate_if_not_exists {
            Self::load_or_generate_secret(&cfg.secret_path)?
        } else {
            cfg.secret.as_bytes().to_vec()
        };

        if secret.is_empty() {
            bail!("token secret cannot be empty");
        }
        if cfg.expiry_secs == 0 {
            info!("Tokens are issued without expiry");
        }

        Ok(Self {
            secret,
            expiry: cfg.expiry_secs,
        })
    }

    fn load_or_generate_secret(path: &str) -> Result<Vec<u8>> {
        match fs::read_to_string(path) {
            Ok(data) => {
                let data = data.trim();
                if data.is_empty() {
                    bail!("token secret file {path} is empty");
                }
                Ok(data.as_bytes().to_vec())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("Token secret not found, generating a new one to {path}");
                let secret = generate_secret();
                fs::write(path, &secret)
                    .with_context(|| format!("write token secret to {path}"))?;
                restrict_permissions(path);
                Ok(secret.into_bytes())
            }
            Err(err) => Err(err).with_context(|| format!("read token secret from {path}")),
        }
    }

    pub fn build_token_generator(&self) -> JwtTokenGenerator {
        JwtTokenGenerator::new(&self.secret, self.expiry)
    }

    pub fn build_token_validator(&self) -> JwtTokenValidator {
        JwtTokenValidator::new(&self.secret)
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(unix)]
fn restrict_permissions(path: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!("Failed to restrict permissions of {path}: {e}");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &str) {}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::{CommonConfig, PathSet};
    use crate::server::authn::token::{TokenGenerator, TokenValidator};

    use super::*;

    #[test]
    fn test_generate_secret() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), SECRET_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_secret_file() {
        let base = PathBuf::from("_test_token_factory");
        let ps = PathSet::new_test(&base);

        let mut cfg = <TokenConfig as CommonConfig>::default();
        cfg.complete(&ps).unwrap();
        assert!(cfg.generate_if_not_exists);

        let factory = TokenFactory::new(&cfg).unwrap();
        let secret = fs::read_to_string(ps.pki_path.join("token_secret")).unwrap();
        assert_eq!(secret.len(), SECRET_LENGTH);

        // Second start reuses the stored secret, old tokens stay valid
        let token = factory
            .build_token_generator()
            .generate_token(1, "clerk", 10)
            .unwrap();
        let factory = TokenFactory::new(&cfg).unwrap();
        let claims = factory
            .build_token_validator()
            .validate_token(&token.token, 10)
            .unwrap();
        assert_eq!(claims.identity_id, 1);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_configured_secret() {
        let base = PathBuf::from("_test_token_factory_configured");
        let ps = PathSet::new_test(&base);

        let mut cfg = <TokenConfig as CommonConfig>::default();
        cfg.secret = String::from("configured-secret");
        cfg.expiry_secs = 30;
        cfg.complete(&ps).unwrap();
        assert!(!cfg.generate_if_not_exists);

        let factory = TokenFactory::new(&cfg).unwrap();
        assert!(!ps.pki_path.join("token_secret").exists());

        let token = factory
            .build_token_generator()
            .generate_token(2, "auditor", 10)
            .unwrap();
        let validator = JwtTokenValidator::new(b"configured-secret");
        let claims = validator.validate_token(&token.token, 10).unwrap();
        assert_eq!(claims.exp, Some(40));

        fs::remove_dir_all(&base).unwrap();
    }
}

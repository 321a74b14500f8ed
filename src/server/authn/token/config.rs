use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

/// Token configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    /// HMAC secret used to sign tokens. Supports env expansion, e.g.
    /// `${MEDGATE_TOKEN_SECRET}`.
    /// Default: read from {config_path}/pki/token_secret, generated there on
    /// first start if missing.
    #[serde(default = "TokenConfig::default_secret")]
    pub secret: String,

    /// Token expiration time in seconds.
    /// Default: 0, tokens never expire.
    #[serde(default = "TokenConfig::default_expiry_secs")]
    pub expiry_secs: u64,

    #[serde(skip)]
    pub secret_path: String,

    #[serde(skip)]
    pub generate_if_not_exists: bool,
}

impl CommonConfig for TokenConfig {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
            expiry_secs: Self::default_expiry_secs(),
            secret_path: String::new(),
            generate_if_not_exists: false,
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.secret = expandenv("secret", &self.secret)?;
        if self.secret.is_empty() {
            self.generate_if_not_exists = true;
            let path = ps.pki_path.join("token_secret");
            self.secret_path = format!("{}", path.display());
        }
        Ok(())
    }
}

impl TokenConfig {
    pub fn default_secret() -> String {
        String::new()
    }

    pub fn default_expiry_secs() -> u64 {
        0
    }
}

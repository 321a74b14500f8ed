use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::token::config::TokenConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthnConfig {
    /// Accept identities whose stored credential is not a bcrypt hash, by
    /// comparing it to the password directly. Only meant for databases that
    /// still hold legacy plaintext credentials.
    #[serde(default = "AuthnConfig::default_allow_plaintext_passwords")]
    pub allow_plaintext_passwords: bool,

    /// Cost used by the CLI when hashing new passwords.
    #[serde(default = "AuthnConfig::default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "TokenConfig::default")]
    pub token: TokenConfig,
}

impl CommonConfig for AuthnConfig {
    fn default() -> Self {
        Self {
            allow_plaintext_passwords: Self::default_allow_plaintext_passwords(),
            bcrypt_cost: Self::default_bcrypt_cost(),
            token: TokenConfig::default(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        if !(Self::MIN_BCRYPT_COST..=Self::MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            bail!(
                "bcrypt_cost must be between {} and {}",
                Self::MIN_BCRYPT_COST,
                Self::MAX_BCRYPT_COST
            );
        }
        self.token.complete(ps).context("token")?;
        Ok(())
    }
}

impl AuthnConfig {
    const MIN_BCRYPT_COST: u32 = 4;
    const MAX_BCRYPT_COST: u32 = 31;

    pub fn default_allow_plaintext_passwords() -> bool {
        false
    }

    pub fn default_bcrypt_cost() -> u32 {
        bcrypt::DEFAULT_COST
    }
}

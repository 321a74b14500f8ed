use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use super::config::AuthzConfig;
use super::{PolicyAuthorizer, PolicyTable};

pub struct AuthzFactory;

impl AuthzFactory {
    pub fn new() -> Self {
        Self
    }

    /// Builds the process-wide policy table. The result is never mutated
    /// afterwards.
    pub fn build_policy_table(&self, cfg: &AuthzConfig) -> Result<Arc<PolicyTable>> {
        let table = cfg.build_table().context("build policy table")?;
        match cfg.roles {
            Some(_) => info!("Using policy table from config, {} roles", table.len()),
            None => info!("Using builtin policy table, {} roles", table.len()),
        }
        if table.is_empty() {
            warn!("Policy table is empty, every protected request will be denied");
        }
        Ok(Arc::new(table))
    }

    pub fn build_authorizer(&self, table: Arc<PolicyTable>) -> PolicyAuthorizer {
        PolicyAuthorizer::new(table)
    }
}
